//! Host-side pixel buffers exchanged between the bridge components.
//!
//! A [`PixelBuffer`] is the common currency of the bridge: the compute view of the frame buffer,
//! decoded video frames, frames handed to the encoder and scratch buffers kept in task storage
//! are all pixel buffers. Row order is top-left origin unless a method says otherwise.

use crate::foundation::core::Size;
use crate::foundation::error::{BridgeError, BridgeResult};
use rayon::prelude::*;

/// Pixel layouts understood by the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 3 bytes per pixel, R G B. Video frames use this layout.
    Rgb8,
    /// 4 bytes per pixel, B G R A. The frame buffer uses this layout.
    Bgra8,
    /// 4 bytes per pixel, R G B A.
    Rgba8,
    /// 1 byte per pixel luminance.
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Bgra8 | Self::Rgba8 => 4,
            Self::Gray8 => 1,
        }
    }
}

/// Color conversions used at the bridge boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorConversion {
    /// Video RGB into frame-buffer BGRA (alpha = 255).
    RgbToBgra,
    /// Frame-buffer BGRA into video RGB (alpha dropped).
    BgraToRgb,
    /// RGB to luminance (BT.601 weights).
    RgbToGray,
    /// BGRA to luminance (BT.601 weights).
    BgraToGray,
}

impl ColorConversion {
    fn formats(self) -> (PixelFormat, PixelFormat) {
        match self {
            Self::RgbToBgra => (PixelFormat::Rgb8, PixelFormat::Bgra8),
            Self::BgraToRgb => (PixelFormat::Bgra8, PixelFormat::Rgb8),
            Self::RgbToGray => (PixelFormat::Rgb8, PixelFormat::Gray8),
            Self::BgraToGray => (PixelFormat::Bgra8, PixelFormat::Gray8),
        }
    }
}

/// Tightly packed, row-major 8-bit image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    size: Size,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a zeroed buffer.
    pub fn new(size: Size, format: PixelFormat) -> Self {
        Self {
            size,
            format,
            data: vec![0u8; size.area() * format.channels()],
        }
    }

    /// An empty buffer. Empty video frames signal end of stream.
    pub fn empty(format: PixelFormat) -> Self {
        Self {
            size: Size::zero(),
            format,
            data: Vec::new(),
        }
    }

    /// Wrap existing bytes, validating the length.
    pub fn from_raw(size: Size, format: PixelFormat, data: Vec<u8>) -> BridgeResult<Self> {
        let expected = size.area() * format.channels();
        if data.len() != expected {
            return Err(BridgeError::validation(format!(
                "pixel buffer {size} {format:?} expects {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self { size, format, data })
    }

    /// Buffer of `size` filled with one pixel value.
    pub fn filled(size: Size, format: PixelFormat, px: &[u8]) -> BridgeResult<Self> {
        if px.len() != format.channels() {
            return Err(BridgeError::validation(format!(
                "fill pixel for {format:?} must have {} bytes",
                format.channels()
            )));
        }
        Ok(Self {
            size,
            format,
            data: px.repeat(size.area()),
        })
    }

    /// Dimensions.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Pixel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Return `true` when the buffer holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// Raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume into raw bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.size.width as usize * self.format.channels()
    }

    /// Borrow row `y`.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.stride();
        let off = y as usize * stride;
        &self.data[off..off + stride]
    }

    /// Borrow pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let ch = self.format.channels();
        let off = y as usize * self.stride() + x as usize * ch;
        &self.data[off..off + ch]
    }

    /// Reshape to `size`/`format`, reallocating only when the byte length changes.
    ///
    /// Contents are unspecified afterwards.
    pub fn ensure(&mut self, size: Size, format: PixelFormat) {
        let len = size.area() * format.channels();
        if self.data.len() != len {
            self.data.resize(len, 0);
        }
        self.size = size;
        self.format = format;
    }

    /// Drop all pixels, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
        self.size = Size::zero();
    }

    /// Replace contents with a copy of `src`.
    pub fn copy_from(&mut self, src: &PixelBuffer) {
        self.ensure(src.size, src.format);
        self.data.copy_from_slice(&src.data);
    }

    /// Mirror rows in place (row 0 <-> row h-1).
    pub fn flip_vertical(&mut self) {
        let stride = self.stride();
        let h = self.size.height as usize;
        if stride == 0 || h < 2 {
            return;
        }
        let (top, bottom) = self.data.split_at_mut(stride * (h / 2));
        let bottom_start = if h % 2 == 1 { stride } else { 0 };
        let bottom = &mut bottom[bottom_start..];
        top.par_chunks_exact_mut(stride)
            .zip(bottom.par_chunks_exact_mut(stride).rev())
            .for_each(|(a, b)| a.swap_with_slice(b));
    }

    /// Convert into `dst`, reshaping it to this buffer's size.
    pub fn convert_into(&self, dst: &mut PixelBuffer, conv: ColorConversion) -> BridgeResult<()> {
        let (from, to) = conv.formats();
        if self.format != from {
            return Err(BridgeError::validation(format!(
                "{conv:?} expects {from:?} input, got {:?}",
                self.format
            )));
        }
        dst.ensure(self.size, to);
        let sc = from.channels();
        let dc = to.channels();
        let src = self.data.par_chunks_exact(sc);
        let out = dst.data.par_chunks_exact_mut(dc);
        match conv {
            ColorConversion::RgbToBgra => out.zip(src).for_each(|(d, s)| {
                d[0] = s[2];
                d[1] = s[1];
                d[2] = s[0];
                d[3] = 255;
            }),
            ColorConversion::BgraToRgb => out.zip(src).for_each(|(d, s)| {
                d[0] = s[2];
                d[1] = s[1];
                d[2] = s[0];
            }),
            ColorConversion::RgbToGray => {
                out.zip(src).for_each(|(d, s)| d[0] = luma(s[0], s[1], s[2]))
            }
            ColorConversion::BgraToGray => {
                out.zip(src).for_each(|(d, s)| d[0] = luma(s[2], s[1], s[0]))
            }
        }
        Ok(())
    }

    /// Resample into `dst` at `size` with a triangle filter. Same-size resizes are plain copies.
    pub fn resize_into(&self, dst: &mut PixelBuffer, size: Size) -> BridgeResult<()> {
        size.require_non_empty("resize target")?;
        if self.is_empty() {
            return Err(BridgeError::validation("cannot resize an empty pixel buffer"));
        }
        if size == self.size {
            dst.copy_from(self);
            return Ok(());
        }

        use image::imageops::{FilterType, resize};
        let (w, h) = (self.size.width, self.size.height);
        let bytes = self.data.as_slice();
        let out = match self.format {
            PixelFormat::Rgb8 => {
                let view = image::ImageBuffer::<image::Rgb<u8>, &[u8]>::from_raw(w, h, bytes)
                    .ok_or_else(|| BridgeError::validation("rgb buffer length mismatch"))?;
                resize(&view, size.width, size.height, FilterType::Triangle).into_raw()
            }
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => {
                // Channel order does not matter to the filter.
                let view = image::ImageBuffer::<image::Rgba<u8>, &[u8]>::from_raw(w, h, bytes)
                    .ok_or_else(|| BridgeError::validation("4-channel buffer length mismatch"))?;
                resize(&view, size.width, size.height, FilterType::Triangle).into_raw()
            }
            PixelFormat::Gray8 => {
                let view = image::ImageBuffer::<image::Luma<u8>, &[u8]>::from_raw(w, h, bytes)
                    .ok_or_else(|| BridgeError::validation("gray buffer length mismatch"))?;
                resize(&view, size.width, size.height, FilterType::Triangle).into_raw()
            }
        };
        dst.size = size;
        dst.format = self.format;
        dst.data = out;
        Ok(())
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    ((y + 500) / 1000) as u8
}

#[cfg(test)]
#[path = "../tests/unit/buffer.rs"]
mod tests;
