//! Pan/zoom state of the on-screen view into the frame buffer.
//!
//! The viewport is a rectangle in raster coordinates (origin bottom-left) covering the part of
//! the frame buffer that is presented. Its size is always `frame_size * scale`.

use crate::foundation::core::{Point, Rect, Size};

const SCALE_SNAP_EPS: f64 = 1e-6;

/// Pointer buttons reported by the window system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button. Dragging with it pans the view.
    Right,
    /// Middle button.
    Middle,
}

/// Keys the bridge reacts to. Everything else is passed through as `Other`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// Escape.
    Escape,
    /// A printable character.
    Char(char),
    /// Any other key code.
    Other(u32),
}

/// Window/input events consumed by the bridge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    /// Pointer moved to window coordinates (origin top-left).
    PointerMoved {
        /// X in window pixels.
        x: f64,
        /// Y in window pixels.
        y: f64,
    },
    /// Pointer button changed state.
    PointerButton {
        /// Button.
        button: MouseButton,
        /// `true` on press.
        pressed: bool,
    },
    /// Scroll wheel.
    Scroll {
        /// Horizontal delta.
        dx: f64,
        /// Vertical delta. Negative values zoom out.
        dy: f64,
    },
    /// Key changed state.
    Key {
        /// Key.
        key: Key,
        /// `true` on press.
        pressed: bool,
    },
    /// Window was resized.
    Resized {
        /// New width.
        width: u32,
        /// New height.
        height: u32,
    },
    /// The user asked to close the window.
    CloseRequested,
}

/// Current pan/zoom view.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    frame_size: Size,
    window_size: Size,
    viewport: Rect,
    scale: f64,
    pointer: Point,
    dragging: bool,
    min_scale: f64,
}

impl ViewState {
    /// Full view of a `frame_size` frame buffer shown in a `window_size` window.
    pub fn new(frame_size: Size, window_size: Size, min_scale: f64) -> Self {
        Self {
            frame_size,
            window_size,
            viewport: frame_size.to_rect(),
            scale: 1.0,
            pointer: Point::ZERO,
            dragging: false,
            min_scale,
        }
    }

    /// Visible frame-buffer region in raster coordinates.
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Zoom scale. `1.0` shows the whole frame buffer.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Last pointer position in window coordinates.
    pub fn pointer(&self) -> Point {
        self.pointer
    }

    /// Window size used to map pointer positions.
    pub fn window_size(&self) -> Size {
        self.window_size
    }

    /// Return `true` while a pan drag is active.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Return `true` when the whole frame buffer is visible.
    pub fn is_full(&self) -> bool {
        self.scale == 1.0
    }

    /// Reset to the full frame buffer.
    pub fn reset(&mut self) {
        self.scale = 1.0;
        self.viewport = self.frame_size.to_rect();
    }

    /// Move the viewport by a window-space delta (raster axis directions), clamped to the frame.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        if self.is_full() || self.window_size.is_empty() {
            return;
        }
        let sx = f64::from(self.frame_size.width) / f64::from(self.window_size.width);
        let sy = f64::from(self.frame_size.height) / f64::from(self.window_size.height);
        let x0 = self.viewport.x0 + dx * sx * self.scale;
        let y0 = self.viewport.y0 + dy * sy * self.scale;
        self.place(x0, y0);
    }

    /// Multiply the scale by `factor`, keeping the frame point under the pointer fixed.
    ///
    /// Factors above 1 zoom out. Reaching scale 1 snaps to the full frame buffer.
    pub fn zoom(&mut self, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) || (factor > 1.0 && self.is_full()) {
            return;
        }
        let next = self.scale * factor;
        if next >= 1.0 - SCALE_SNAP_EPS {
            self.reset();
            return;
        }
        let next = next.max(self.min_scale);

        let (nx, ny) = self.pointer_norm();
        let fx = self.viewport.x0 + nx * self.viewport.width();
        let fy = self.viewport.y0 + ny * self.viewport.height();

        self.scale = next;
        let w = f64::from(self.frame_size.width) * next;
        let h = f64::from(self.frame_size.height) * next;
        self.place(fx - nx * w, fy - ny * h);
    }

    /// Apply one input event. Returns `true` when the view changed.
    pub fn handle_event(&mut self, ev: &InputEvent) -> bool {
        let before = (self.viewport, self.scale);
        match *ev {
            InputEvent::PointerMoved { x, y } => {
                let old = self.pointer;
                self.pointer = Point::new(x, y);
                if self.dragging {
                    self.pan(old.x - x, -(old.y - y));
                }
            }
            InputEvent::PointerButton {
                button: MouseButton::Right,
                pressed,
            } => self.dragging = pressed,
            InputEvent::Scroll { dy, .. } if dy != 0.0 => {
                self.zoom(if dy < 0.0 { 1.1 } else { 0.9 });
            }
            InputEvent::Resized { width, height } => {
                self.window_size = Size::new(width, height);
            }
            _ => {}
        }
        before != (self.viewport, self.scale)
    }

    fn pointer_norm(&self) -> (f64, f64) {
        if self.window_size.is_empty() {
            return (0.5, 0.5);
        }
        let nx = (self.pointer.x / f64::from(self.window_size.width)).clamp(0.0, 1.0);
        let ny = 1.0 - (self.pointer.y / f64::from(self.window_size.height)).clamp(0.0, 1.0);
        (nx, ny)
    }

    fn place(&mut self, x0: f64, y0: f64) {
        let fw = f64::from(self.frame_size.width);
        let fh = f64::from(self.frame_size.height);
        let w = fw * self.scale;
        let h = fh * self.scale;
        let x0 = x0.clamp(0.0, (fw - w).max(0.0));
        let y0 = y0.clamp(0.0, (fh - h).max(0.0));
        self.viewport = Rect::new(x0, y0, x0 + w, y0 + h);
    }
}

#[cfg(test)]
#[path = "../tests/unit/viewport.rs"]
mod tests;
