//! Video capture/write bridge and codec endpoints.

/// Capture/write bridge.
pub mod bridge;
/// `ffmpeg`/`ffprobe` subprocess endpoints.
pub mod ffmpeg;
/// Codec contracts and in-memory endpoints.
pub mod io;

pub use bridge::VideoBridge;
pub use ffmpeg::{FfmpegCapture, FfmpegWriter, ProbeInfo, is_ffmpeg_on_path, is_ffprobe_on_path};
pub use io::{InMemorySink, InMemorySource, VideoSink, VideoSource};
