use super::*;

fn view() -> ViewState {
    ViewState::new(Size::new(1920, 1080), Size::new(960, 540), 0.025)
}

#[test]
fn zooming_back_out_returns_exactly_to_identity() {
    let mut v = view();
    v.handle_event(&InputEvent::PointerMoved { x: 123.0, y: 400.0 });
    for _ in 0..7 {
        v.zoom(0.9);
    }
    assert!(v.scale() < 1.0);
    for _ in 0..7 {
        v.zoom(1.0 / 0.9);
    }
    assert_eq!(v.scale(), 1.0);
    assert_eq!(v.viewport(), Rect::new(0.0, 0.0, 1920.0, 1080.0));
}

#[test]
fn overshooting_zoom_out_snaps_to_full_frame() {
    let mut v = view();
    v.zoom(0.5);
    v.zoom(0.5);
    v.zoom(10.0);
    assert_eq!(v.scale(), 1.0);
    assert_eq!(v.viewport(), Rect::new(0.0, 0.0, 1920.0, 1080.0));
}

#[test]
fn zoom_out_at_full_view_is_ignored() {
    let mut v = view();
    assert!(!v.handle_event(&InputEvent::Scroll { dx: 0.0, dy: -1.0 }));
    assert_eq!(v.scale(), 1.0);
}

#[test]
fn zoom_in_is_clamped_to_min_scale() {
    let mut v = view();
    for _ in 0..200 {
        v.zoom(0.5);
    }
    assert_eq!(v.scale(), 0.025);
    let vp = v.viewport();
    assert!((vp.width() - 1920.0 * 0.025).abs() < 1e-9);
    assert!(vp.x0 >= 0.0 && vp.x1 <= 1920.0);
}

#[test]
fn zoom_keeps_point_under_pointer() {
    let mut v = view();
    // Window centre maps to frame centre.
    v.handle_event(&InputEvent::PointerMoved { x: 480.0, y: 270.0 });
    v.zoom(0.5);
    let c = v.viewport().center();
    assert!((c.x - 960.0).abs() < 1e-9);
    assert!((c.y - 540.0).abs() < 1e-9);
}

#[test]
fn zoom_anchor_uses_bottom_left_raster_origin() {
    let mut v = view();
    // Top-left window corner is the top-left of the frame: x = 0, raster y = 1080.
    v.handle_event(&InputEvent::PointerMoved { x: 0.0, y: 0.0 });
    v.zoom(0.5);
    let vp = v.viewport();
    assert_eq!(vp.x0, 0.0);
    assert_eq!(vp.y1, 1080.0);
}

#[test]
fn right_drag_pans_and_clamps() {
    let mut v = view();
    v.handle_event(&InputEvent::PointerMoved { x: 480.0, y: 270.0 });
    v.zoom(0.5);
    let before = v.viewport();

    v.handle_event(&InputEvent::PointerButton {
        button: MouseButton::Right,
        pressed: true,
    });
    assert!(v.is_dragging());
    // Dragging right moves the view left.
    assert!(v.handle_event(&InputEvent::PointerMoved { x: 490.0, y: 270.0 }));
    let after = v.viewport();
    assert!((after.x0 - (before.x0 - 10.0)).abs() < 1e-9);
    assert_eq!(after.y0, before.y0);

    v.handle_event(&InputEvent::PointerMoved { x: 10_000.0, y: 270.0 });
    assert_eq!(v.viewport().x0, 0.0);

    v.handle_event(&InputEvent::PointerButton {
        button: MouseButton::Right,
        pressed: false,
    });
    assert!(!v.handle_event(&InputEvent::PointerMoved { x: 0.0, y: 0.0 }));
}

#[test]
fn left_drag_does_not_pan() {
    let mut v = view();
    v.zoom(0.5);
    v.handle_event(&InputEvent::PointerButton {
        button: MouseButton::Left,
        pressed: true,
    });
    assert!(!v.is_dragging());
}
