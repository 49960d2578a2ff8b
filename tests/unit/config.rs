use super::*;

#[test]
fn default_config_is_valid() {
    WorkerConfig::default().validate().unwrap();
}

#[test]
fn framebuffer_smaller_than_window_is_rejected() {
    let cfg = WorkerConfig {
        window_size: Size::new(800, 600),
        framebuffer_size: Size::new(640, 600),
        ..WorkerConfig::default()
    };
    let err = cfg.validate().unwrap_err();
    assert!(matches!(err, BridgeError::Validation(_)));
}

#[test]
fn json_fills_missing_fields_with_defaults() {
    let cfg: WorkerConfig = serde_json::from_str(
        r#"{ "offscreen": true, "api": { "kind": "es3" }, "window_size": { "width": 64, "height": 32 } }"#,
    )
    .unwrap();
    assert!(cfg.offscreen);
    assert_eq!(cfg.api, ApiProfile::Es3);
    assert!(!cfg.api.has_attrib_stack());
    assert_eq!(cfg.framebuffer_size, WorkerConfig::default().framebuffer_size);
    assert_eq!(cfg.min_scale, 0.025);
}

#[test]
fn unknown_fields_are_rejected() {
    let r: Result<WorkerConfig, _> = serde_json::from_str(r#"{ "fullscreen": true }"#);
    assert!(r.is_err());
}

#[test]
fn vaapi_render_node_is_offset_from_128() {
    assert_eq!(VideoOpts::vaapi(1).render_node(), "/dev/dri/renderD129");
    assert_eq!(VideoOpts::default().accel, HwAccel::None);
}
