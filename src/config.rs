use crate::foundation::core::Size;
use crate::foundation::error::{BridgeError, BridgeResult};
use std::path::Path;

/// Raster API profile requested for the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiProfile {
    /// Desktop compatibility profile with an attribute stack.
    DesktopCompat {
        /// Major version.
        major: u8,
        /// Minor version.
        minor: u8,
    },
    /// Embedded profile (ES 3). No attribute stack.
    Es3,
}

impl ApiProfile {
    /// Whether the profile keeps a server-side attribute stack.
    pub fn has_attrib_stack(self) -> bool {
        matches!(self, Self::DesktopCompat { .. })
    }
}

impl Default for ApiProfile {
    fn default() -> Self {
        Self::DesktopCompat { major: 4, minor: 6 }
    }
}

impl std::fmt::Display for ApiProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DesktopCompat { major, minor } => write!(f, "OpenGL {major}.{minor} compat"),
            Self::Es3 => f.write_str("OpenGL ES 3.0"),
        }
    }
}

/// Surface/worker configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Window title.
    pub title: String,
    /// Window size in pixels.
    pub window_size: Size,
    /// Shared frame buffer size. Must be at least the window size in both axes.
    pub framebuffer_size: Size,
    /// Run without presenting to a window.
    pub offscreen: bool,
    /// Stretch the viewport over the whole window instead of preserving aspect ratio.
    pub stretch: bool,
    /// Raster API profile.
    pub api: ApiProfile,
    /// MSAA sample count (informational).
    pub samples: u32,
    /// Enable debug output of the raster device.
    pub debug: bool,
    /// Smallest zoom scale reachable by zooming in.
    pub min_scale: f64,
    /// Whether the device exposes raster/compute interop.
    pub interop: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            title: "framebridge".to_owned(),
            window_size: Size::new(1280, 720),
            framebuffer_size: Size::new(1920, 1080),
            offscreen: false,
            stretch: false,
            api: ApiProfile::default(),
            samples: 0,
            debug: false,
            min_scale: 0.025,
            interop: true,
        }
    }
}

impl WorkerConfig {
    /// Config with a square-pixel window matching the frame buffer.
    pub fn with_size(size: Size) -> Self {
        Self {
            window_size: size,
            framebuffer_size: size,
            ..Self::default()
        }
    }

    /// Load and validate a JSON config file.
    pub fn from_json_path(path: &Path) -> BridgeResult<Self> {
        use anyhow::Context as _;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text).map_err(|e| {
            BridgeError::validation(format!("invalid config '{}': {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> BridgeResult<()> {
        self.window_size.require_non_empty("window_size")?;
        self.framebuffer_size.require_non_empty("framebuffer_size")?;
        if !self.framebuffer_size.contains(self.window_size) {
            return Err(BridgeError::validation(format!(
                "framebuffer_size {} must be at least window_size {}",
                self.framebuffer_size, self.window_size
            )));
        }
        if !(self.min_scale > 0.0 && self.min_scale <= 1.0) {
            return Err(BridgeError::validation(format!(
                "min_scale must be in (0, 1], got {}",
                self.min_scale
            )));
        }
        Ok(())
    }
}

/// Hardware acceleration mode handed to the video codec at open time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HwAccel {
    /// Software decode/encode.
    #[default]
    None,
    /// VA-API on a DRM render node.
    Vaapi,
}

/// Opaque open-time options for video capture and writing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VideoOpts {
    /// Render node index (`/dev/dri/renderD{128 + index}`).
    pub device_index: u32,
    /// Acceleration mode.
    pub accel: HwAccel,
}

impl VideoOpts {
    /// VA-API options for render node `device_index`.
    pub fn vaapi(device_index: u32) -> Self {
        Self {
            device_index,
            accel: HwAccel::Vaapi,
        }
    }

    /// DRM render node path for the configured device.
    pub fn render_node(&self) -> String {
        format!("/dev/dri/renderD{}", 128 + self.device_index)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
