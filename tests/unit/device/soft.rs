use super::*;

const RED: ClearColor = ClearColor::new(1.0, 0.0, 0.0, 1.0);
const BLUE: ClearColor = ClearColor::new(0.0, 0.0, 1.0, 1.0);

fn ready(opts: SoftRasterOpts) -> (SoftRaster, FramebufferId, TextureId) {
    let size = opts.surface_size;
    let mut dev = SoftRaster::new(opts).unwrap();
    dev.make_current().unwrap();
    let tex = dev.create_texture(size).unwrap();
    let ds = dev.create_depth_stencil(size).unwrap();
    let fb = dev.create_framebuffer(tex, ds).unwrap();
    dev.bind_framebuffer(Some(fb)).unwrap();
    (dev, fb, tex)
}

fn read(dev: &mut SoftRaster) -> PixelBuffer {
    let mut out = PixelBuffer::empty(PixelFormat::Bgra8);
    dev.read_pixels(&mut out).unwrap();
    out
}

#[test]
fn device_memory_requires_make_current() {
    let mut dev = SoftRaster::new(SoftRasterOpts::headless(Size::new(4, 4))).unwrap();
    let err = dev.create_texture(Size::new(4, 4)).unwrap_err();
    assert!(matches!(err, BridgeError::Context(_)));
}

#[test]
fn device_is_current_only_on_the_thread_that_made_it_current() {
    let (mut dev, _, _) = ready(SoftRasterOpts::headless(Size::new(2, 2)));
    dev.owner = Some(std::thread::spawn(|| std::thread::current().id()).join().unwrap());
    assert!(matches!(dev.clear(RED), Err(BridgeError::Context(_))));
}

#[test]
fn empty_surface_is_a_display_init_error() {
    let err = SoftRaster::new(SoftRasterOpts::headless(Size::zero())).err().unwrap();
    assert_eq!(err.exit_code(), 12);
}

#[test]
fn incomplete_framebuffer_is_rejected() {
    let mut dev = SoftRaster::new(SoftRasterOpts::headless(Size::new(4, 4))).unwrap();
    dev.make_current().unwrap();
    let tex = dev.create_texture(Size::new(4, 4)).unwrap();
    let ds = dev.create_depth_stencil(Size::new(4, 2)).unwrap();
    let err = dev.create_framebuffer(tex, ds).unwrap_err();
    assert!(matches!(err, BridgeError::FrameBufferSize { .. }));
}

#[test]
fn fill_rect_uses_bottom_left_origin() {
    let (mut dev, _, _) = ready(SoftRasterOpts::headless(Size::new(2, 2)));
    dev.clear(BLUE).unwrap();
    dev.fill_rect(PixelRect::new(0, 0, 2, 1), RED).unwrap();
    let px = read(&mut dev);
    // Storage row 0 is the bottom row.
    assert_eq!(px.pixel(0, 0), &[0, 0, 255, 255]);
    assert_eq!(px.pixel(0, 1), &[255, 0, 0, 255]);
}

#[test]
fn premul_image_top_row_lands_on_top_raster_row() {
    let (mut dev, _, _) = ready(SoftRasterOpts::headless(Size::new(1, 2)));
    dev.clear(ClearColor::black()).unwrap();
    // Top pixel opaque green, bottom pixel transparent.
    let img = [0, 255, 0, 255, 0, 0, 0, 0];
    dev.draw_premul_rgba(&img, Size::new(1, 2)).unwrap();
    let px = read(&mut dev);
    assert_eq!(px.pixel(0, 1), &[0, 255, 0, 255]);
    assert_eq!(px.pixel(0, 0), &[0, 0, 0, 255]);
}

#[test]
fn premul_image_must_match_viewport() {
    let (mut dev, _, _) = ready(SoftRasterOpts::headless(Size::new(4, 4)));
    dev.set_viewport(PixelRect::new(0, 0, 2, 2)).unwrap();
    assert!(dev.draw_premul_rgba(&[0; 64], Size::new(4, 4)).is_err());
}

#[test]
fn attrib_stack_restores_viewport_on_desktop_profile() {
    let (mut dev, _, _) = ready(SoftRasterOpts::headless(Size::new(4, 4)));
    dev.set_viewport(PixelRect::new(1, 1, 2, 2)).unwrap();
    dev.push_attribs().unwrap();
    dev.set_viewport(PixelRect::full(Size::new(4, 4))).unwrap();
    dev.pop_attribs().unwrap();
    assert_eq!(dev.viewport(), PixelRect::new(1, 1, 2, 2));
    assert!(dev.pop_attribs().is_err());
}

#[test]
fn attrib_stack_is_a_no_op_on_es3() {
    let mut opts = SoftRasterOpts::headless(Size::new(4, 4));
    opts.profile = ApiProfile::Es3;
    let (mut dev, _, _) = ready(opts);
    dev.push_attribs().unwrap();
    dev.set_viewport(PixelRect::new(0, 0, 1, 1)).unwrap();
    dev.pop_attribs().unwrap();
    dev.pop_attribs().unwrap();
    assert_eq!(dev.viewport(), PixelRect::new(0, 0, 1, 1));
}

#[test]
fn interop_needs_extension_and_compute_context() {
    let (mut dev, _, tex) = ready(SoftRasterOpts::headless(Size::new(2, 2)));
    let mut buf = PixelBuffer::empty(PixelFormat::Bgra8);
    assert!(matches!(
        dev.import_texture(tex, &mut buf),
        Err(BridgeError::Context(_))
    ));
    let ctx = dev.context().clone();
    let _s = ctx.scope();
    dev.import_texture(tex, &mut buf).unwrap();
    assert_eq!(buf.size(), Size::new(2, 2));

    let mut opts = SoftRasterOpts::headless(Size::new(2, 2));
    opts.interop = false;
    let (mut dev, _, tex) = ready(opts);
    let ctx = dev.context().clone();
    let _s = ctx.scope();
    let err = dev.import_texture(tex, &mut buf).unwrap_err();
    assert_eq!(err.exit_code(), 15);
}

#[test]
fn present_shows_top_of_frame_at_top_of_window() {
    let mut opts = SoftRasterOpts::headless(Size::new(2, 2));
    opts.offscreen = false;
    let (mut dev, fb, _) = ready(opts);
    dev.clear(BLUE).unwrap();
    dev.fill_rect(PixelRect::new(0, 1, 2, 1), RED).unwrap();
    dev.present(fb, Rect::new(0.0, 0.0, 2.0, 2.0), true).unwrap();
    let screen = dev.screen().unwrap();
    assert_eq!(screen.pixel(0, 0), &[0, 0, 255, 255]);
    assert_eq!(screen.pixel(1, 1), &[255, 0, 0, 255]);
    assert_eq!(dev.frames_presented(), 1);
}

#[test]
fn present_letterboxes_without_stretch() {
    let mut opts = SoftRasterOpts::headless(Size::new(2, 2));
    opts.offscreen = false;
    opts.window_size = Size::new(4, 2);
    let (mut dev, fb, _) = ready(opts);
    dev.clear(RED).unwrap();
    dev.present(fb, Rect::new(0.0, 0.0, 2.0, 2.0), false).unwrap();
    let screen = dev.screen().unwrap();
    assert_eq!(screen.pixel(0, 0), &[0, 0, 0, 0]);
    assert_eq!(screen.pixel(1, 0), &[0, 0, 255, 255]);
    assert_eq!(screen.pixel(3, 1), &[0, 0, 0, 0]);
}

#[test]
fn offscreen_device_cannot_present() {
    let (mut dev, fb, _) = ready(SoftRasterOpts::headless(Size::new(2, 2)));
    assert!(dev.present(fb, Rect::new(0.0, 0.0, 2.0, 2.0), true).is_err());
}

#[test]
fn resize_events_update_window_size() {
    let mut opts = SoftRasterOpts::headless(Size::new(8, 8));
    opts.offscreen = false;
    let mut dev = SoftRaster::new(opts).unwrap();
    let proxy = dev.event_proxy();
    proxy.send(InputEvent::Resized {
        width: 3,
        height: 5,
    });
    proxy.send(InputEvent::CloseRequested);
    let evs = dev.poll_events();
    assert_eq!(evs.len(), 2);
    assert_eq!(dev.window_size(), Size::new(3, 5));
    assert!(dev.poll_events().is_empty());
}

#[test]
fn only_windowed_devices_have_a_surface() {
    let headless = SoftRaster::new(SoftRasterOpts::headless(Size::new(4, 4))).unwrap();
    assert!(!headless.has_window());
    let windowed = SoftRaster::new(SoftRasterOpts {
        offscreen: false,
        ..SoftRasterOpts::headless(Size::new(4, 4))
    })
    .unwrap();
    assert!(windowed.has_window());
}
