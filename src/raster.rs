//! Raster context: the device, its shared frame buffer, and scoped binding.

use crate::buffer::{PixelBuffer, PixelFormat};
use crate::context::{ExecScope, ExecutionContext};
use crate::device::{DeviceInfo, RasterDevice};
use crate::foundation::core::{ClearColor, PixelRect, Rect, Size};
use crate::foundation::error::BridgeResult;
use crate::framebuffer::FrameBufferStore;
use crate::viewport::InputEvent;

/// Owns a raster device together with the shared frame buffer allocated on it.
///
/// All device work goes through [`RasterContext::gl_scope`], which makes the device's compute
/// context and raster context current and binds the frame buffer for the lifetime of the guard.
pub struct RasterContext {
    pub(crate) device: Box<dyn RasterDevice>,
    pub(crate) store: FrameBufferStore,
    pub(crate) context: ExecutionContext,
    /// Compute-side view of the color attachment, reused across acquisitions.
    pub(crate) compute_buf: PixelBuffer,
}

impl RasterContext {
    /// Allocate a `size` frame buffer on `device`. `size` must equal the device surface size.
    pub fn new(mut device: Box<dyn RasterDevice>, size: Size) -> BridgeResult<Self> {
        let context = device.context().clone();
        let store = {
            let _exec = context.scope();
            device.make_current()?;
            FrameBufferStore::new(device.as_mut(), size)?
        };
        let info = device.info();
        tracing::debug!(
            api = %info.api_version,
            renderer = %info.renderer,
            ctx = context.id(),
            "raster context ready"
        );
        Ok(Self {
            device,
            store,
            context,
            compute_buf: PixelBuffer::empty(PixelFormat::Bgra8),
        })
    }

    /// Frame buffer size.
    pub fn size(&self) -> Size {
        self.store.size()
    }

    /// Frame buffer handles.
    pub fn store(&self) -> &FrameBufferStore {
        &self.store
    }

    /// Compute context of the raster device.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Device description.
    pub fn info(&self) -> DeviceInfo {
        self.device.info()
    }

    /// Read-only access to the device.
    pub fn device(&self) -> &dyn RasterDevice {
        self.device.as_ref()
    }

    /// Current window size.
    pub fn window_size(&self) -> Size {
        self.device.window_size()
    }

    /// Bind contexts and the frame buffer until the returned guard is dropped.
    pub fn gl_scope(&mut self) -> BridgeResult<GlScope<'_>> {
        let exec = self.context.scope();
        self.device.make_current()?;
        self.device.bind_framebuffer(Some(self.store.framebuffer()))?;
        self.device.set_viewport(PixelRect::full(self.store.size()))?;
        Ok(GlScope {
            rc: self,
            closed: false,
            _exec: exec,
        })
    }

    /// Run raster calls against the bound frame buffer.
    pub fn render<R>(
        &mut self,
        f: impl FnOnce(&mut dyn RasterDevice) -> BridgeResult<R>,
    ) -> BridgeResult<R> {
        let mut gl = self.gl_scope()?;
        let out = f(&mut *gl)?;
        gl.finish()?;
        Ok(out)
    }

    /// Clear the frame buffer.
    pub fn clear(&mut self, color: ClearColor) -> BridgeResult<()> {
        self.render(|d| d.clear(color))
    }

    /// Read the frame buffer's color attachment in raster order (row 0 = bottom).
    pub fn read_raw(&mut self, dst: &mut PixelBuffer) -> BridgeResult<()> {
        self.render(|d| d.read_pixels(dst))
    }

    /// Present `viewport` of the frame buffer to the window.
    pub fn blit_to_screen(&mut self, viewport: Rect, stretch: bool) -> BridgeResult<()> {
        let _exec = self.context.scope();
        self.device.make_current()?;
        self.device.present(self.store.framebuffer(), viewport, stretch)
    }

    /// Drain window events. Makes the raster context current when the window was resized.
    pub fn poll_events(&mut self) -> BridgeResult<Vec<InputEvent>> {
        let events = self.device.poll_events();
        if events
            .iter()
            .any(|e| matches!(e, InputEvent::Resized { .. }))
        {
            let _exec = self.context.scope();
            self.device.make_current()?;
        }
        Ok(events)
    }
}

/// Guard holding the raster and compute contexts current with the frame buffer bound.
///
/// Dropping the guard unbinds the frame buffer, waits for the device and restores the previous
/// compute context. Use [`GlScope::finish`] to observe errors from that teardown.
pub struct GlScope<'a> {
    pub(crate) rc: &'a mut RasterContext,
    closed: bool,
    _exec: ExecScope,
}

impl GlScope<'_> {
    /// Frame buffer handles.
    pub fn store(&self) -> &FrameBufferStore {
        &self.rc.store
    }

    /// Unbind and wait for the device, reporting failures.
    pub fn finish(mut self) -> BridgeResult<()> {
        self.close()
    }

    pub(crate) fn close(&mut self) -> BridgeResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.rc.device.bind_framebuffer(None)?;
        self.rc.device.finish()
    }
}

impl std::ops::Deref for GlScope<'_> {
    type Target = dyn RasterDevice;

    fn deref(&self) -> &Self::Target {
        self.rc.device.as_ref()
    }
}

impl std::ops::DerefMut for GlScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.rc.device.as_mut()
    }
}

impl Drop for GlScope<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(error = %err, "raster scope teardown failed");
        }
    }
}
