//! framebridge shares one off-screen frame buffer between a raster device, a compute context, an
//! immediate-mode vector canvas and a video codec, within one process and one frame.
//!
//! The moving parts:
//!
//! - [`ExecutionContext`] with scoped, thread-bound binding
//! - [`RasterContext`] owning a [`RasterDevice`] and its [`FrameBufferStore`]
//! - the compute hand-off ([`RasterContext::acquire_for_compute`] / [`ComputeScope::release`])
//! - [`VideoBridge`] moving RGB video frames in and out of the frame buffer
//! - [`VectorCanvasBridge`] compositing vector drawing over raster drawing
//! - [`Worker`] sequencing a per-frame [`Plan`] of `gl`/`cl`/`clgl`/`cpu`/`nvg` tasks
//! - [`SafeQueue`] and friends for decode-ahead producer/consumer pipelines
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Host-side pixel buffers and conversions.
pub mod buffer;
/// Vector canvas bridge.
pub mod canvas;
/// Frame buffer hand-off to the compute context.
pub mod compute;
/// Worker and video configuration.
pub mod config;
/// Compute execution contexts.
pub mod context;
/// Raster device seam and the software device.
pub mod device;
/// Frame rate measurement.
pub mod fps;
/// Shared frame buffer store.
pub mod framebuffer;
/// Producer/consumer pipeline helpers.
pub mod queue;
/// Raster context and scoped binding.
pub mod raster;
/// Per-frame task plans and scratch storage.
pub mod scheduler;
/// Video bridge, codec contracts and ffmpeg endpoints.
pub mod video;
/// Pan/zoom view state and input events.
pub mod viewport;
/// Per-surface worker.
pub mod worker;

pub use crate::foundation::core::{ClearColor, PixelRect, Point, Rect, Size, Vec2};
pub use crate::foundation::error::{BridgeError, BridgeResult, InitStage};

pub use crate::buffer::{ColorConversion, PixelBuffer, PixelFormat};
pub use crate::canvas::VectorCanvasBridge;
pub use crate::compute::ComputeScope;
pub use crate::config::{ApiProfile, HwAccel, VideoOpts, WorkerConfig};
pub use crate::context::{DeviceDesc, ExecScope, ExecutionContext};
pub use crate::device::soft::{EventProxy, SoftRaster, SoftRasterOpts};
pub use crate::device::{DeviceInfo, DeviceKind, RasterDevice, create_device};
pub use crate::fps::FpsMeter;
pub use crate::framebuffer::FrameBufferStore;
pub use crate::queue::{CancelFlag, FramePacket, SafeQueue, consume, spawn_producer};
pub use crate::raster::{GlScope, RasterContext};
pub use crate::scheduler::{Plan, Storage, StorageTable, Task, TaskKind};
pub use crate::video::{
    FfmpegCapture, FfmpegWriter, InMemorySink, InMemorySource, VideoBridge, VideoSink, VideoSource,
    is_ffmpeg_on_path, is_ffprobe_on_path,
};
pub use crate::viewport::{InputEvent, Key, MouseButton, ViewState};
pub use crate::worker::{RunStats, SystemInfo, Worker};

/// Vector canvas types (`vello_cpu` re-export) for use inside `nvg` tasks.
pub use vello_cpu;
