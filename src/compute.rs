//! Frame buffer hand-off between the raster and compute domains.
//!
//! [`RasterContext::acquire_for_compute`] maps the color attachment into the compute domain and
//! flips it to top-left row order. The returned [`ComputeScope`] derefs to that buffer; releasing
//! it flips back and writes the buffer into the texture. While the scope lives it holds the
//! raster context mutably, so no raster drawing can interleave with compute work.

use crate::buffer::PixelBuffer;
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::raster::{GlScope, RasterContext};

impl RasterContext {
    /// Lend the frame buffer to the compute context.
    ///
    /// Fails with [`BridgeError::Interop`] when the device has no compute interop. There is no
    /// host-copy fallback.
    pub fn acquire_for_compute(&mut self) -> BridgeResult<ComputeScope<'_>> {
        if !self.device.supports_interop() {
            return Err(BridgeError::interop(format!(
                "{} has no raster/compute interop",
                self.device.info().renderer
            )));
        }
        let gl = self.gl_scope()?;
        gl.rc.device.finish()?;
        {
            let rc = &mut *gl.rc;
            rc.device.import_texture(rc.store.color(), &mut rc.compute_buf)?;
            rc.compute_buf.flip_vertical();
        }
        tracing::trace!(size = %gl.rc.store.size(), "frame buffer acquired for compute");
        Ok(ComputeScope {
            gl,
            released: false,
        })
    }

    /// Acquire, run `f` on the top-left-origin BGRA frame, release.
    pub fn compute<R>(
        &mut self,
        f: impl FnOnce(&mut PixelBuffer) -> BridgeResult<R>,
    ) -> BridgeResult<R> {
        let mut scope = self.acquire_for_compute()?;
        let out = f(&mut *scope)?;
        scope.release()?;
        Ok(out)
    }
}

/// The frame buffer on loan to the compute context.
pub struct ComputeScope<'a> {
    gl: GlScope<'a>,
    released: bool,
}

impl ComputeScope<'_> {
    /// Flip back, write into the color attachment and unbind.
    pub fn release(mut self) -> BridgeResult<()> {
        self.release_inner()?;
        self.gl.close()
    }

    fn release_inner(&mut self) -> BridgeResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let rc = &mut *self.gl.rc;
        rc.compute_buf.flip_vertical();
        rc.device.export_texture(rc.store.color(), &rc.compute_buf)
    }
}

impl std::ops::Deref for ComputeScope<'_> {
    type Target = PixelBuffer;

    fn deref(&self) -> &PixelBuffer {
        &self.gl.rc.compute_buf
    }
}

impl std::ops::DerefMut for ComputeScope<'_> {
    fn deref_mut(&mut self) -> &mut PixelBuffer {
        &mut self.gl.rc.compute_buf
    }
}

impl Drop for ComputeScope<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.release_inner() {
            tracing::warn!(error = %err, "compute release failed");
        }
    }
}
