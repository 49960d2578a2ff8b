use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        BridgeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(BridgeError::context("x").to_string().contains("context error:"));
    assert!(
        BridgeError::init(InitStage::Codec, "x")
            .to_string()
            .contains("codec init error:")
    );
    assert!(BridgeError::interop("x").to_string().contains("interop error:"));
    assert!(BridgeError::video("x").to_string().contains("video error:"));
}

#[test]
fn only_validation_is_recoverable() {
    assert!(!BridgeError::validation("x").is_fatal());
    assert!(BridgeError::interop("x").is_fatal());
    assert!(
        BridgeError::VideoFrameSize {
            expected: Size::new(4, 4),
            actual: Size::new(2, 2),
        }
        .is_fatal()
    );
}

#[test]
fn init_stages_have_distinct_exit_codes() {
    let codes = [
        InitStage::Window,
        InitStage::Display,
        InitStage::Codec,
        InitStage::Compute,
    ]
    .map(|s| BridgeError::init(s, "x").exit_code());
    for (i, a) in codes.iter().enumerate() {
        assert_ne!(*a, 0);
        for b in &codes[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = BridgeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert_eq!(err.exit_code(), 1);
}
