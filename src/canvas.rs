use crate::foundation::core::{PixelRect, Size};
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::raster::{GlScope, RasterContext};

/// Immediate-mode vector canvas drawing into the shared frame buffer.
///
/// Each [`VectorCanvasBridge::render`] call is one canvas frame: the raster attribute stack is
/// saved, the canvas is sized to the frame buffer, the user draws, the result is composited over
/// the frame buffer and the attribute stack is restored. The restore runs even when drawing or
/// compositing fails.
#[derive(Default)]
pub struct VectorCanvasBridge {
    ctx: Option<vello_cpu::RenderContext>,
    pixmap: Option<vello_cpu::Pixmap>,
}

impl VectorCanvasBridge {
    /// Create a bridge. Canvas resources are allocated on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one canvas frame. `draw` receives the canvas and the logical (frame buffer) size.
    pub fn render<R>(
        &mut self,
        raster: &mut RasterContext,
        draw: impl FnOnce(&mut vello_cpu::RenderContext, Size) -> R,
    ) -> BridgeResult<R> {
        let size = raster.size();
        let (w, h) = canvas_dims(size)?;
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        let mut pixmap = match self.pixmap.take() {
            Some(pm) if pm.width() == w && pm.height() == h => pm,
            _ => vello_cpu::Pixmap::new(w, h),
        };

        let mut gl = raster.gl_scope()?;
        gl.push_attribs()?;
        let out = canvas_frame(&mut gl, &mut ctx, &mut pixmap, size, draw);
        let restored = gl.pop_attribs();
        self.ctx = Some(ctx);
        self.pixmap = Some(pixmap);

        let out = out?;
        restored?;
        gl.finish()?;
        Ok(out)
    }
}

fn canvas_frame<R>(
    gl: &mut GlScope<'_>,
    ctx: &mut vello_cpu::RenderContext,
    pixmap: &mut vello_cpu::Pixmap,
    size: Size,
    draw: impl FnOnce(&mut vello_cpu::RenderContext, Size) -> R,
) -> BridgeResult<R> {
    gl.set_viewport(PixelRect::full(size))?;
    ctx.reset();
    let out = draw(ctx, size);
    ctx.flush();
    pixmap.data_as_u8_slice_mut().fill(0);
    ctx.render_to_pixmap(pixmap);
    gl.draw_premul_rgba(pixmap.data_as_u8_slice(), size)?;
    Ok(out)
}

fn canvas_dims(size: Size) -> BridgeResult<(u16, u16)> {
    let w = u16::try_from(size.width)
        .map_err(|_| BridgeError::validation(format!("canvas width exceeds u16: {size}")))?;
    let h = u16::try_from(size.height)
        .map_err(|_| BridgeError::validation(format!("canvas height exceeds u16: {size}")))?;
    Ok((w, h))
}
