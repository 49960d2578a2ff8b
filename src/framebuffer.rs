use crate::device::{FramebufferId, RasterDevice, RenderbufferId, TextureId};
use crate::foundation::core::Size;
use crate::foundation::error::{BridgeError, BridgeResult};

/// The shared off-screen frame buffer: a BGRA8 color texture plus a depth/stencil companion,
/// attached to one framebuffer object.
///
/// The size is fixed at construction and must equal the device's surface size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameBufferStore {
    size: Size,
    color: TextureId,
    depth_stencil: RenderbufferId,
    framebuffer: FramebufferId,
}

impl FrameBufferStore {
    /// Allocate the frame buffer on `device`. The device must be current.
    pub fn new(device: &mut dyn RasterDevice, size: Size) -> BridgeResult<Self> {
        let surface = device.surface_size();
        if size != surface {
            return Err(BridgeError::FrameBufferSize {
                expected: surface,
                actual: size,
            });
        }
        let color = device.create_texture(size)?;
        let depth_stencil = device.create_depth_stencil(size)?;
        let framebuffer = device.create_framebuffer(color, depth_stencil)?;
        tracing::debug!(%size, ?framebuffer, "frame buffer allocated");
        Ok(Self {
            size,
            color,
            depth_stencil,
            framebuffer,
        })
    }

    /// Frame buffer size.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Color attachment.
    pub fn color(&self) -> TextureId {
        self.color
    }

    /// Depth/stencil attachment.
    pub fn depth_stencil(&self) -> RenderbufferId {
        self.depth_stencil
    }

    /// Framebuffer object.
    pub fn framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }
}
