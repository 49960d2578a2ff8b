//! Raster device seam.
//!
//! A [`RasterDevice`] is the OpenGL-like side of the bridge: it owns the window surface, the
//! texture and framebuffer objects, and the compute interop used to lend texture memory to the
//! compute context. Texture memory is kept in raster order: row 0 is the *bottom* row, pixels
//! are BGRA8.

use crate::buffer::PixelBuffer;
use crate::config::{ApiProfile, WorkerConfig};
use crate::context::ExecutionContext;
use crate::foundation::core::{ClearColor, PixelRect, Rect, Size};
use crate::foundation::error::BridgeResult;
use crate::viewport::InputEvent;

/// Software raster device.
pub mod soft;

/// Handle of a color texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) u32);

/// Handle of a depth/stencil renderbuffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderbufferId(pub(crate) u32);

/// Handle of a framebuffer object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub(crate) u32);

/// Static description of a raster device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Raster API version string.
    pub api_version: String,
    /// Renderer name.
    pub renderer: String,
    /// Requested profile.
    pub profile: ApiProfile,
    /// Whether raster/compute interop is available.
    pub interop: bool,
}

/// An OpenGL-like raster device with compute interop.
///
/// Every method that touches device memory requires the device to be current on the calling
/// thread (see [`RasterDevice::make_current`]); interop calls additionally require the device's
/// [`ExecutionContext`] to be the current compute context. Violations return
/// [`crate::BridgeError::Context`].
pub trait RasterDevice {
    /// Device description.
    fn info(&self) -> DeviceInfo;

    /// Compute context created alongside this device.
    fn context(&self) -> &ExecutionContext;

    /// Size of the drawable surface. The shared frame buffer must match it.
    fn surface_size(&self) -> Size;

    /// Current window size. Equal to the surface size for offscreen devices.
    fn window_size(&self) -> Size;

    /// Make the raster context current on the calling thread.
    fn make_current(&mut self) -> BridgeResult<()>;

    /// Allocate a BGRA8 color texture.
    fn create_texture(&mut self, size: Size) -> BridgeResult<TextureId>;

    /// Allocate a depth/stencil renderbuffer.
    fn create_depth_stencil(&mut self, size: Size) -> BridgeResult<RenderbufferId>;

    /// Create a framebuffer with the given attachments and check its completeness.
    fn create_framebuffer(
        &mut self,
        color: TextureId,
        depth_stencil: RenderbufferId,
    ) -> BridgeResult<FramebufferId>;

    /// Bind `fb` as draw target, or the default framebuffer when `None`.
    fn bind_framebuffer(&mut self, fb: Option<FramebufferId>) -> BridgeResult<()>;

    /// Currently bound framebuffer.
    fn bound_framebuffer(&self) -> Option<FramebufferId>;

    /// Set the viewport of the bound framebuffer.
    fn set_viewport(&mut self, rect: PixelRect) -> BridgeResult<()>;

    /// Current viewport.
    fn viewport(&self) -> PixelRect;

    /// Clear the bound framebuffer.
    fn clear(&mut self, color: ClearColor) -> BridgeResult<()>;

    /// Scissored clear of `rect` (raster coordinates).
    fn fill_rect(&mut self, rect: PixelRect, color: ClearColor) -> BridgeResult<()>;

    /// Save the attribute state. No-op on profiles without an attribute stack.
    fn push_attribs(&mut self) -> BridgeResult<()>;

    /// Restore the last saved attribute state. No-op on profiles without an attribute stack.
    fn pop_attribs(&mut self) -> BridgeResult<()>;

    /// Composite a premultiplied RGBA image (row 0 = top) over the viewport of the bound
    /// framebuffer. `size` must equal the viewport size.
    fn draw_premul_rgba(&mut self, pixels: &[u8], size: Size) -> BridgeResult<()>;

    /// Read the color attachment of the bound framebuffer in raster order.
    fn read_pixels(&mut self, dst: &mut PixelBuffer) -> BridgeResult<()>;

    /// Block until all issued raster work completed.
    fn finish(&mut self) -> BridgeResult<()>;

    /// Whether the compute interop extension is present.
    fn supports_interop(&self) -> bool;

    /// Map `tex` into the compute domain, copying its raster-order contents into `dst`.
    fn import_texture(&mut self, tex: TextureId, dst: &mut PixelBuffer) -> BridgeResult<()>;

    /// Write a raster-order compute buffer back into `tex`.
    fn export_texture(&mut self, tex: TextureId, src: &PixelBuffer) -> BridgeResult<()>;

    /// Blit `viewport` (raster coordinates) of `fb` into the window and swap.
    fn present(&mut self, fb: FramebufferId, viewport: Rect, stretch: bool) -> BridgeResult<()>;

    /// Whether the device has a window surface to present into.
    fn has_window(&self) -> bool;

    /// Drain pending window events.
    fn poll_events(&mut self) -> Vec<InputEvent>;

    /// Last presented window image (row 0 = top, BGRA8), if the device keeps one.
    fn screen(&self) -> Option<&PixelBuffer> {
        None
    }
}

/// Available device kinds.
///
/// - `Software` is always available.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    /// Headless software rasterizer with in-process compute interop.
    Software,
}

/// Create a raster device for `cfg`.
pub fn create_device(kind: DeviceKind, cfg: &WorkerConfig) -> BridgeResult<Box<dyn RasterDevice>> {
    match kind {
        DeviceKind::Software => Ok(Box::new(soft::SoftRaster::new(
            soft::SoftRasterOpts::from_config(cfg),
        )?)),
    }
}
