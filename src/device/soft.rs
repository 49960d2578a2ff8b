use crate::buffer::{PixelBuffer, PixelFormat};
use crate::config::{ApiProfile, WorkerConfig};
use crate::context::{DeviceDesc, ExecutionContext};
use crate::device::{DeviceInfo, FramebufferId, RasterDevice, RenderbufferId, TextureId};
use crate::foundation::core::{ClearColor, PixelRect, Rect, Size};
use crate::foundation::error::{BridgeError, BridgeResult, InitStage};
use crate::foundation::math::over_channel;
use crate::viewport::InputEvent;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread::ThreadId;

/// Options for [`SoftRaster`].
#[derive(Clone, Debug)]
pub struct SoftRasterOpts {
    /// Drawable surface size (the frame buffer size).
    pub surface_size: Size,
    /// Initial window size.
    pub window_size: Size,
    /// Emulated API profile.
    pub profile: ApiProfile,
    /// Whether compute interop is exposed.
    pub interop: bool,
    /// Headless: no window surface to present into.
    pub offscreen: bool,
    /// Log device calls at debug level.
    pub debug: bool,
}

impl SoftRasterOpts {
    /// Options derived from a worker config.
    pub fn from_config(cfg: &WorkerConfig) -> Self {
        Self {
            surface_size: cfg.framebuffer_size,
            window_size: cfg.window_size,
            profile: cfg.api,
            interop: cfg.interop,
            offscreen: cfg.offscreen,
            debug: cfg.debug,
        }
    }

    /// Offscreen device with interop and a `size` surface.
    pub fn headless(size: Size) -> Self {
        Self {
            surface_size: size,
            window_size: size,
            profile: ApiProfile::default(),
            interop: true,
            offscreen: true,
            debug: false,
        }
    }
}

/// Cloneable handle feeding window events into a [`SoftRaster`] from outside the device.
#[derive(Clone, Debug, Default)]
pub struct EventProxy {
    queue: Arc<Mutex<VecDeque<InputEvent>>>,
}

impl EventProxy {
    /// Queue an event for the next [`RasterDevice::poll_events`].
    pub fn send(&self, ev: InputEvent) {
        self.queue.lock().push_back(ev);
    }
}

/// Software raster device.
///
/// Textures live in host memory in raster order (row 0 = bottom, BGRA8). The compute interop maps
/// a texture by copying it in and out of a [`PixelBuffer`] while the device's compute context is
/// current.
pub struct SoftRaster {
    opts: SoftRasterOpts,
    ctx: ExecutionContext,
    owner: Option<ThreadId>,
    next_id: u32,

    textures: HashMap<TextureId, PixelBuffer>,
    renderbuffers: HashMap<RenderbufferId, Size>,
    framebuffers: HashMap<FramebufferId, (TextureId, RenderbufferId)>,
    bound: Option<FramebufferId>,
    viewport: PixelRect,
    attrib_stack: Vec<PixelRect>,

    window_size: Size,
    screen: Option<PixelBuffer>,
    events: EventProxy,
    presented: u64,
}

impl SoftRaster {
    /// Create a device.
    pub fn new(opts: SoftRasterOpts) -> BridgeResult<Self> {
        if opts.surface_size.is_empty() {
            return Err(BridgeError::init(
                InitStage::Display,
                format!("surface size must be non-empty, got {}", opts.surface_size),
            ));
        }
        if !opts.offscreen && opts.window_size.is_empty() {
            return Err(BridgeError::init(
                InitStage::Window,
                format!("window size must be non-empty, got {}", opts.window_size),
            ));
        }

        let ctx = ExecutionContext::new(DeviceDesc::new("framebridge software compute", "host"));
        let screen = (!opts.offscreen).then(|| PixelBuffer::new(opts.window_size, PixelFormat::Bgra8));
        tracing::debug!(
            surface = %opts.surface_size,
            window = %opts.window_size,
            profile = %opts.profile,
            interop = opts.interop,
            offscreen = opts.offscreen,
            "software raster device created"
        );
        Ok(Self {
            window_size: if opts.offscreen {
                opts.surface_size
            } else {
                opts.window_size
            },
            viewport: PixelRect::full(opts.surface_size),
            opts,
            ctx,
            owner: None,
            next_id: 1,
            textures: HashMap::new(),
            renderbuffers: HashMap::new(),
            framebuffers: HashMap::new(),
            bound: None,
            attrib_stack: Vec::new(),
            screen,
            events: EventProxy::default(),
            presented: 0,
        })
    }

    /// Handle for injecting window events.
    pub fn event_proxy(&self) -> EventProxy {
        self.events.clone()
    }

    /// Number of frames presented to the window.
    pub fn frames_presented(&self) -> u64 {
        self.presented
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn require_current(&self) -> BridgeResult<()> {
        if self.owner != Some(std::thread::current().id()) {
            return Err(BridgeError::context(
                "raster device is not current on this thread",
            ));
        }
        Ok(())
    }

    fn require_interop(&self) -> BridgeResult<()> {
        self.require_current()?;
        if !self.opts.interop {
            return Err(BridgeError::interop(
                "raster/compute interop extension is not available",
            ));
        }
        if !self.ctx.is_current() {
            return Err(BridgeError::context(format!(
                "compute context {} must be current for interop",
                self.ctx.id()
            )));
        }
        Ok(())
    }

    fn texture_mut(&mut self, tex: TextureId) -> BridgeResult<&mut PixelBuffer> {
        self.textures
            .get_mut(&tex)
            .ok_or_else(|| BridgeError::context(format!("unknown texture {tex:?}")))
    }

    fn bound_color_mut(&mut self) -> BridgeResult<&mut PixelBuffer> {
        self.require_current()?;
        let fb = self
            .bound
            .ok_or_else(|| BridgeError::context("no framebuffer bound"))?;
        let (tex, _) = *self
            .framebuffers
            .get(&fb)
            .ok_or_else(|| BridgeError::context(format!("unknown framebuffer {fb:?}")))?;
        self.texture_mut(tex)
    }
}

impl RasterDevice for SoftRaster {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            api_version: self.opts.profile.to_string(),
            renderer: "framebridge software raster".to_owned(),
            profile: self.opts.profile,
            interop: self.opts.interop,
        }
    }

    fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    fn surface_size(&self) -> Size {
        self.opts.surface_size
    }

    fn window_size(&self) -> Size {
        self.window_size
    }

    fn make_current(&mut self) -> BridgeResult<()> {
        self.owner = Some(std::thread::current().id());
        Ok(())
    }

    fn create_texture(&mut self, size: Size) -> BridgeResult<TextureId> {
        self.require_current()?;
        size.require_non_empty("texture size")?;
        let id = TextureId(self.alloc_id());
        self.textures
            .insert(id, PixelBuffer::new(size, PixelFormat::Bgra8));
        Ok(id)
    }

    fn create_depth_stencil(&mut self, size: Size) -> BridgeResult<RenderbufferId> {
        self.require_current()?;
        size.require_non_empty("depth/stencil size")?;
        let id = RenderbufferId(self.alloc_id());
        self.renderbuffers.insert(id, size);
        Ok(id)
    }

    fn create_framebuffer(
        &mut self,
        color: TextureId,
        depth_stencil: RenderbufferId,
    ) -> BridgeResult<FramebufferId> {
        self.require_current()?;
        let color_size = self
            .textures
            .get(&color)
            .map(PixelBuffer::size)
            .ok_or_else(|| BridgeError::context(format!("unknown texture {color:?}")))?;
        let depth_size = *self.renderbuffers.get(&depth_stencil).ok_or_else(|| {
            BridgeError::context(format!("unknown renderbuffer {depth_stencil:?}"))
        })?;
        if color_size != depth_size {
            return Err(BridgeError::FrameBufferSize {
                expected: color_size,
                actual: depth_size,
            });
        }
        let id = FramebufferId(self.alloc_id());
        self.framebuffers.insert(id, (color, depth_stencil));
        Ok(id)
    }

    fn bind_framebuffer(&mut self, fb: Option<FramebufferId>) -> BridgeResult<()> {
        self.require_current()?;
        if let Some(fb) = fb
            && !self.framebuffers.contains_key(&fb)
        {
            return Err(BridgeError::context(format!("unknown framebuffer {fb:?}")));
        }
        self.bound = fb;
        Ok(())
    }

    fn bound_framebuffer(&self) -> Option<FramebufferId> {
        self.bound
    }

    fn set_viewport(&mut self, rect: PixelRect) -> BridgeResult<()> {
        self.require_current()?;
        self.viewport = rect;
        Ok(())
    }

    fn viewport(&self) -> PixelRect {
        self.viewport
    }

    fn clear(&mut self, color: ClearColor) -> BridgeResult<()> {
        let px = color.to_bgra8();
        let dst = self.bound_color_mut()?;
        dst.data_mut()
            .chunks_exact_mut(4)
            .for_each(|d| d.copy_from_slice(&px));
        Ok(())
    }

    fn fill_rect(&mut self, rect: PixelRect, color: ClearColor) -> BridgeResult<()> {
        let px = color.to_bgra8();
        let dst = self.bound_color_mut()?;
        let Some((x0, y0, x1, y1)) = rect.clip_to(dst.size()) else {
            return Ok(());
        };
        let stride = dst.stride();
        let data = dst.data_mut();
        for y in y0..y1 {
            let row = &mut data[y * stride + x0 * 4..y * stride + x1 * 4];
            row.chunks_exact_mut(4).for_each(|d| d.copy_from_slice(&px));
        }
        Ok(())
    }

    fn push_attribs(&mut self) -> BridgeResult<()> {
        self.require_current()?;
        if self.opts.profile.has_attrib_stack() {
            self.attrib_stack.push(self.viewport);
        }
        Ok(())
    }

    fn pop_attribs(&mut self) -> BridgeResult<()> {
        self.require_current()?;
        if self.opts.profile.has_attrib_stack() {
            self.viewport = self
                .attrib_stack
                .pop()
                .ok_or_else(|| BridgeError::context("attribute stack underflow"))?;
        }
        Ok(())
    }

    fn draw_premul_rgba(&mut self, pixels: &[u8], size: Size) -> BridgeResult<()> {
        let vp = self.viewport;
        if size != Size::new(vp.width, vp.height) {
            return Err(BridgeError::validation(format!(
                "image {size} does not match viewport {}x{}",
                vp.width, vp.height
            )));
        }
        if size.is_empty() {
            return Ok(());
        }
        if pixels.len() != size.area() * 4 {
            return Err(BridgeError::validation(
                "premultiplied image length must be width*height*4",
            ));
        }

        let dst = self.bound_color_mut()?;
        let (dw, dh) = (i64::from(dst.width()), i64::from(dst.height()));
        let stride = dst.stride();
        let data = dst.data_mut();
        let w = size.width as usize;
        for (r, src_row) in pixels.chunks_exact(w * 4).enumerate() {
            // Image row 0 is the top of the viewport.
            let y = i64::from(vp.y) + i64::from(size.height) - 1 - r as i64;
            if !(0..dh).contains(&y) {
                continue;
            }
            for (c, s) in src_row.chunks_exact(4).enumerate() {
                let x = i64::from(vp.x) + c as i64;
                if s[3] == 0 || !(0..dw).contains(&x) {
                    continue;
                }
                let off = y as usize * stride + x as usize * 4;
                let d = &mut data[off..off + 4];
                d[0] = over_channel(s[2], s[3], d[0]);
                d[1] = over_channel(s[1], s[3], d[1]);
                d[2] = over_channel(s[0], s[3], d[2]);
                d[3] = over_channel(s[3], s[3], d[3]);
            }
        }
        Ok(())
    }

    fn read_pixels(&mut self, dst: &mut PixelBuffer) -> BridgeResult<()> {
        let src = self.bound_color_mut()?;
        dst.copy_from(src);
        Ok(())
    }

    fn finish(&mut self) -> BridgeResult<()> {
        self.require_current()
    }

    fn supports_interop(&self) -> bool {
        self.opts.interop
    }

    fn import_texture(&mut self, tex: TextureId, dst: &mut PixelBuffer) -> BridgeResult<()> {
        self.require_interop()?;
        let src = self.texture_mut(tex)?;
        dst.copy_from(src);
        Ok(())
    }

    fn export_texture(&mut self, tex: TextureId, src: &PixelBuffer) -> BridgeResult<()> {
        self.require_interop()?;
        let dst = self.texture_mut(tex)?;
        if src.size() != dst.size() {
            return Err(BridgeError::FrameBufferSize {
                expected: dst.size(),
                actual: src.size(),
            });
        }
        if src.format() != PixelFormat::Bgra8 {
            return Err(BridgeError::validation(format!(
                "texture export expects Bgra8, got {:?}",
                src.format()
            )));
        }
        dst.copy_from(src);
        Ok(())
    }

    fn present(&mut self, fb: FramebufferId, viewport: Rect, stretch: bool) -> BridgeResult<()> {
        self.require_current()?;
        let (tex, _) = *self
            .framebuffers
            .get(&fb)
            .ok_or_else(|| BridgeError::context(format!("unknown framebuffer {fb:?}")))?;
        let win = self.window_size;
        let Some(screen) = self.screen.as_mut() else {
            return Err(BridgeError::context("offscreen device has no window surface"));
        };
        let src = self
            .textures
            .get(&tex)
            .ok_or_else(|| BridgeError::context(format!("unknown texture {tex:?}")))?;

        screen.ensure(win, PixelFormat::Bgra8);
        screen.data_mut().fill(0);
        if win.is_empty() || viewport.width() <= 0.0 || viewport.height() <= 0.0 {
            self.presented += 1;
            return Ok(());
        }

        let (ww, wh) = (f64::from(win.width), f64::from(win.height));
        let dest = if stretch {
            Rect::new(0.0, 0.0, ww, wh)
        } else {
            let s = (ww / viewport.width()).min(wh / viewport.height());
            let (w, h) = (viewport.width() * s, viewport.height() * s);
            let (x0, y0) = ((ww - w) / 2.0, (wh - h) / 2.0);
            Rect::new(x0, y0, x0 + w, y0 + h)
        };

        let (sw, sh) = (src.width() as usize, src.height() as usize);
        let src_stride = src.stride();
        let dst_stride = screen.stride();
        let src_data = src.data();
        let dst_data = screen.data_mut();
        let (dx0, dy0) = (dest.x0.floor() as usize, dest.y0.floor() as usize);
        let dx1 = (dest.x1.ceil() as usize).min(win.width as usize);
        let dy1 = (dest.y1.ceil() as usize).min(win.height as usize);
        for wy in dy0..dy1 {
            let v = (wy as f64 + 0.5 - dest.y0) / dest.height();
            // Window row 0 shows the top edge of the viewport.
            let fy = viewport.y1 - v * viewport.height();
            let sy = (fy.floor().max(0.0) as usize).min(sh - 1);
            for wx in dx0..dx1 {
                let u = (wx as f64 + 0.5 - dest.x0) / dest.width();
                let fx = viewport.x0 + u * viewport.width();
                let sx = (fx.floor().max(0.0) as usize).min(sw - 1);
                let s = sy * src_stride + sx * 4;
                let d = wy * dst_stride + wx * 4;
                dst_data[d..d + 4].copy_from_slice(&src_data[s..s + 4]);
            }
        }
        self.presented += 1;
        if self.opts.debug {
            tracing::debug!(frame = self.presented, ?viewport, stretch, "present");
        }
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<InputEvent> {
        let events: Vec<InputEvent> = self.events.queue.lock().drain(..).collect();
        for ev in &events {
            if let InputEvent::Resized { width, height } = *ev {
                self.window_size = Size::new(width, height);
            }
        }
        events
    }

    fn has_window(&self) -> bool {
        self.screen.is_some()
    }

    fn screen(&self) -> Option<&PixelBuffer> {
        self.screen.as_ref()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/device/soft.rs"]
mod tests;
