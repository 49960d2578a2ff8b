use crate::buffer::{ColorConversion, PixelBuffer, PixelFormat};
use crate::context::ExecutionContext;
use crate::foundation::core::Size;
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::raster::RasterContext;

/// Moves frames between a video codec and the shared frame buffer.
///
/// Video frames are RGB8 with a top-left origin; the frame buffer is BGRA8 in raster order. The
/// codec side always runs under the video device's context, which may differ from the raster
/// device's context. The video frame size is fixed by the first capture or by
/// [`VideoBridge::set_frame_size`], and every later frame must match it.
#[derive(Debug)]
pub struct VideoBridge {
    context: ExecutionContext,
    frame_size: Option<Size>,
    frame: PixelBuffer,
    scratch: PixelBuffer,
    raw: PixelBuffer,
}

impl VideoBridge {
    /// Bridge whose codec calls run under `context`.
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            context,
            frame_size: None,
            frame: PixelBuffer::empty(PixelFormat::Rgb8),
            scratch: PixelBuffer::empty(PixelFormat::Rgb8),
            raw: PixelBuffer::empty(PixelFormat::Bgra8),
        }
    }

    /// Video device context.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Session frame size, once known.
    pub fn frame_size(&self) -> Option<Size> {
        self.frame_size
    }

    /// Record the session frame size, or check it against the recorded one.
    pub fn set_frame_size(&mut self, size: Size) -> BridgeResult<()> {
        size.require_non_empty("video frame size")?;
        match self.frame_size {
            None => {
                tracing::debug!(%size, "video frame size set");
                self.frame_size = Some(size);
                Ok(())
            }
            Some(expected) if expected == size => Ok(()),
            Some(expected) => Err(BridgeError::VideoFrameSize {
                expected,
                actual: size,
            }),
        }
    }

    /// Decode one frame with `fill` and upload it into the frame buffer.
    ///
    /// Returns `Ok(false)` when `fill` left the frame empty (end of stream).
    pub fn capture(
        &mut self,
        raster: &mut RasterContext,
        fill: impl FnOnce(&mut PixelBuffer) -> BridgeResult<()>,
    ) -> BridgeResult<bool> {
        self.frame.clear();
        {
            let _video = self.context.scope();
            fill(&mut self.frame)?;
        }
        if self.frame.is_empty() {
            tracing::debug!("video source reached end of stream");
            return Ok(false);
        }
        if self.frame.format() != PixelFormat::Rgb8 {
            return Err(BridgeError::validation(format!(
                "captured frames must be Rgb8, got {:?}",
                self.frame.format()
            )));
        }
        self.set_frame_size(self.frame.size())?;

        let fb_size = raster.size();
        let (frame, scratch) = (&self.frame, &mut self.scratch);
        raster.compute(|buf| {
            let src = if frame.size() != fb_size {
                frame.resize_into(scratch, fb_size)?;
                &*scratch
            } else {
                frame
            };
            src.convert_into(buf, ColorConversion::RgbToBgra)
        })?;
        Ok(true)
    }

    /// Download the frame buffer as an RGB8 video frame and hand it to `consume`.
    ///
    /// The frame is resized to the session frame size (the frame buffer size when none was
    /// recorded yet) and flipped into top-left row order.
    pub fn write(
        &mut self,
        raster: &mut RasterContext,
        consume: impl FnOnce(&PixelBuffer) -> BridgeResult<()>,
    ) -> BridgeResult<()> {
        let target = match self.frame_size {
            Some(size) => size,
            None => {
                self.set_frame_size(raster.size())?;
                raster.size()
            }
        };

        raster.read_raw(&mut self.raw)?;
        self.raw
            .convert_into(&mut self.scratch, ColorConversion::BgraToRgb)?;
        self.scratch.resize_into(&mut self.frame, target)?;
        self.frame.flip_vertical();

        let _video = self.context.scope();
        consume(&self.frame)
    }
}
