use crate::foundation::error::{BridgeError, BridgeResult};

pub use kurbo::{Point, Rect, Vec2};

/// Pixel dimensions of a frame buffer, window or video frame.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a size from width and height.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The empty `0x0` size.
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Return `true` when either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels.
    pub fn area(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Return `true` when `other` fits inside `self` in both axes.
    pub fn contains(self, other: Size) -> bool {
        other.width <= self.width && other.height <= self.height
    }

    /// Full rectangle `(0, 0, width, height)`.
    pub fn to_rect(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Reject empty sizes with a validation error naming `what`.
    pub fn require_non_empty(self, what: &str) -> BridgeResult<Self> {
        if self.is_empty() {
            return Err(BridgeError::validation(format!(
                "{what} must be non-empty, got {self}"
            )));
        }
        Ok(self)
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Integer pixel rectangle in raster coordinates (origin bottom-left).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelRect {
    /// Left edge.
    pub x: i32,
    /// Bottom edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Create a rectangle.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole surface of `size`.
    pub fn full(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Intersect with `[0, size)` and return `(x0, y0, x1, y1)` as exclusive bounds.
    pub fn clip_to(self, size: Size) -> Option<(usize, usize, usize, usize)> {
        let x0 = i64::from(self.x).max(0);
        let y0 = i64::from(self.y).max(0);
        let x1 = (i64::from(self.x) + i64::from(self.width)).min(i64::from(size.width));
        let y1 = (i64::from(self.y) + i64::from(self.height)).min(i64::from(size.height));
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
    }
}

/// Straight-alpha RGBA color with float channels in `[0, 1]`, as passed to raster clears.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClearColor {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl ClearColor {
    /// Create a color from float channels.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from 8-bit RGBA channels.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }

    /// Opaque black.
    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Quantize to a BGRA8 pixel.
    pub fn to_bgra8(self) -> [u8; 4] {
        fn q(c: f32) -> u8 {
            (c.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        [q(self.b), q(self.g), q(self.r), q(self.a)]
    }
}
