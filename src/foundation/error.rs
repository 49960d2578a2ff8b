use crate::foundation::core::Size;

/// Convenience result type used across the bridge.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Device or session initialization stage that failed.
///
/// Each stage maps to its own process exit code so wrapper scripts can tell them apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitStage {
    /// Window / surface creation.
    Window,
    /// Display connection or raster context creation.
    Display,
    /// Video codec open (capture or writer).
    Codec,
    /// Compute device / context creation.
    Compute,
}

impl std::fmt::Display for InitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Window => "window",
            Self::Display => "display",
            Self::Codec => "codec",
            Self::Compute => "compute",
        };
        f.write_str(s)
    }
}

/// Top-level error taxonomy used by the bridge.
///
/// Everything except [`BridgeError::Validation`] is a fatal condition: it signals environment
/// misconfiguration or a broken bridge contract, never a data-dependent hiccup worth retrying.
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    /// Invalid user-provided configuration or arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// An operation touched device memory without the correct context being current.
    #[error("context error: {0}")]
    Context(String),

    /// Device, window, display or codec initialization failed.
    #[error("{stage} init error: {msg}")]
    Init {
        /// The stage that failed.
        stage: InitStage,
        /// Diagnostic message.
        msg: String,
    },

    /// Raster/compute interop is not available on this device.
    #[error("interop error: {0}")]
    Interop(String),

    /// The frame buffer does not match the surface it was created for.
    #[error("frame buffer size mismatch: expected {expected}, got {actual}")]
    FrameBufferSize {
        /// Surface size.
        expected: Size,
        /// Requested frame buffer size.
        actual: Size,
    },

    /// A video frame changed size in the middle of a capture/write session.
    #[error("video frame size mismatch: expected {expected}, got {actual}")]
    VideoFrameSize {
        /// Size recorded for the session.
        expected: Size,
        /// Size of the offending frame.
        actual: Size,
    },

    /// Video codec runtime failure.
    #[error("video error: {0}")]
    Video(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BridgeError {
    /// Build a [`BridgeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`BridgeError::Context`] value.
    pub fn context(msg: impl Into<String>) -> Self {
        Self::Context(msg.into())
    }

    /// Build a [`BridgeError::Init`] value.
    pub fn init(stage: InitStage, msg: impl Into<String>) -> Self {
        Self::Init {
            stage,
            msg: msg.into(),
        }
    }

    /// Build a [`BridgeError::Interop`] value.
    pub fn interop(msg: impl Into<String>) -> Self {
        Self::Interop(msg.into())
    }

    /// Build a [`BridgeError::Video`] value.
    pub fn video(msg: impl Into<String>) -> Self {
        Self::Video(msg.into())
    }

    /// Return `true` when the error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Init { stage, .. } => match stage {
                InitStage::Window => 11,
                InitStage::Display => 12,
                InitStage::Codec => 13,
                InitStage::Compute => 14,
            },
            Self::Interop(_) => 15,
            Self::FrameBufferSize { .. } | Self::VideoFrameSize { .. } => 16,
            Self::Context(_) | Self::Video(_) | Self::Other(_) => 1,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
