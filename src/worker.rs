//! The per-surface worker: one raster device, its frame buffer, the video session and the task
//! plan, driven frame by frame from a single thread.

use crate::buffer::PixelBuffer;
use crate::canvas::VectorCanvasBridge;
use crate::config::WorkerConfig;
use crate::context::ExecutionContext;
use crate::device::{DeviceKind, RasterDevice, create_device};
use crate::foundation::core::{ClearColor, Size};
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::fps::FpsMeter;
use crate::queue::CancelFlag;
use crate::raster::RasterContext;
use crate::scheduler::{Plan, StorageTable, Task, TaskEnv};
use crate::video::bridge::VideoBridge;
use crate::video::io::{VideoSink, VideoSource};
use crate::viewport::{InputEvent, Key, ViewState};
use std::path::Path;

/// Summary of a [`Worker::run`] loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Frames ticked.
    pub frames: u64,
    /// Frames handed to the video sink.
    pub written: u64,
}

/// Runtime description logged at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemInfo {
    /// Raster API version string.
    pub api_version: String,
    /// Raster renderer.
    pub renderer: String,
    /// Compute device of the raster context.
    pub compute_device: String,
    /// Raster/compute interop availability.
    pub interop: bool,
    /// Compute offload toggle.
    pub use_compute: bool,
    /// Raster device's compute context id.
    pub raster_context: u64,
    /// Video device's compute context id.
    pub video_context: u64,
}

impl std::fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "raster:  {} ({})", self.api_version, self.renderer)?;
        writeln!(
            f,
            "compute: {} (context {}, enabled: {})",
            self.compute_device, self.raster_context, self.use_compute
        )?;
        writeln!(f, "interop: {}", if self.interop { "yes" } else { "no" })?;
        write!(f, "video:   context {}", self.video_context)
    }
}

/// Drives one rendering surface.
///
/// Per tick: capture from the attached source, run the plan's tasks in order, write to the
/// attached sink, then present. The same operations are available one by one for immediate-mode
/// use ([`Worker::gl`], [`Worker::compute`], [`Worker::nanovg`], [`Worker::capture`],
/// [`Worker::write`], [`Worker::display`]).
pub struct Worker {
    config: WorkerConfig,
    raster: RasterContext,
    video: VideoBridge,
    canvas: VectorCanvasBridge,
    storage: StorageTable,
    view: ViewState,
    source: Option<Box<dyn VideoSource>>,
    sink: Option<Box<dyn VideoSink>>,
    tasks: Vec<Task>,
    frame_count: u64,
    written: u64,
    fps: FpsMeter,
    done: CancelFlag,
    closed: bool,
}

impl Worker {
    /// Worker on `device` whose video calls share the raster device's compute context.
    pub fn new(config: WorkerConfig, device: Box<dyn RasterDevice>) -> BridgeResult<Self> {
        let video_ctx = device.context().clone();
        Self::with_video_context(config, device, video_ctx)
    }

    /// Worker whose video calls run under `video_ctx`.
    pub fn with_video_context(
        config: WorkerConfig,
        device: Box<dyn RasterDevice>,
        video_ctx: ExecutionContext,
    ) -> BridgeResult<Self> {
        config.validate()?;
        let raster = RasterContext::new(device, config.framebuffer_size)?;
        let view = ViewState::new(raster.size(), raster.window_size(), config.min_scale);
        let worker = Self {
            raster,
            video: VideoBridge::new(video_ctx),
            canvas: VectorCanvasBridge::new(),
            storage: StorageTable::new(),
            view,
            source: None,
            sink: None,
            tasks: Vec::new(),
            frame_count: 0,
            written: 0,
            fps: FpsMeter::new(),
            done: CancelFlag::new(),
            closed: false,
            config,
        };
        let info = worker.system_info();
        tracing::info!(
            title = %worker.config.title,
            api = %info.api_version,
            compute = %info.compute_device,
            interop = info.interop,
            video_context = info.video_context,
            "worker ready"
        );
        Ok(worker)
    }

    /// Worker on a software device built from `config`.
    pub fn from_config(config: WorkerConfig) -> BridgeResult<Self> {
        config.validate()?;
        let device = create_device(DeviceKind::Software, &config)?;
        Self::new(config, device)
    }

    /// Configuration.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Raster context.
    pub fn raster(&self) -> &RasterContext {
        &self.raster
    }

    /// Mutable raster context.
    pub fn raster_mut(&mut self) -> &mut RasterContext {
        &mut self.raster
    }

    /// Video bridge.
    pub fn video(&self) -> &VideoBridge {
        &self.video
    }

    /// Pan/zoom state.
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Task scratch storage.
    pub fn storage(&self) -> &StorageTable {
        &self.storage
    }

    /// Frame buffer size.
    pub fn size(&self) -> Size {
        self.raster.size()
    }

    /// Frames ticked so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Measured frame rate.
    pub fn fps(&self) -> f64 {
        self.fps.fps()
    }

    /// Flag that stops [`Worker::run`] when cancelled.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.done.clone()
    }

    /// Attach a decoder. Its frame size becomes the session frame size.
    pub fn attach_source(&mut self, source: Box<dyn VideoSource>) -> BridgeResult<()> {
        self.video.set_frame_size(source.frame_size())?;
        self.source = Some(source);
        Ok(())
    }

    /// Attach an encoder. Its frame size must match the session frame size.
    pub fn attach_sink(&mut self, sink: Box<dyn VideoSink>) -> BridgeResult<()> {
        self.video.set_frame_size(sink.frame_size())?;
        self.sink = Some(sink);
        Ok(())
    }

    /// Append tasks built by `build` to the per-frame plan.
    pub fn plan(&mut self, build: impl FnOnce(&mut Plan)) {
        let mut plan = Plan::new();
        build(&mut plan);
        tracing::debug!(tasks = plan.len(), "plan built");
        self.tasks.extend(plan.into_tasks());
    }

    /// Names of the planned tasks in execution order.
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(Task::name).collect()
    }

    /// Run one frame. Returns `false` when the loop should stop (end of stream, window closed
    /// or cancellation).
    pub fn tick(&mut self) -> BridgeResult<bool> {
        if self.closed || self.done.is_cancelled() {
            return Ok(false);
        }
        if self.source.is_some() && !self.capture()? {
            return Ok(false);
        }

        let mut tasks = std::mem::take(&mut self.tasks);
        let ran = self.run_tasks(&mut tasks);
        self.tasks = tasks;
        ran?;

        if self.sink.is_some() {
            self.write()?;
        }
        self.frame_count += 1;
        self.fps.tick();

        let open = self.display()?;
        Ok(open && !self.done.is_cancelled())
    }

    fn run_tasks(&mut self, tasks: &mut [Task]) -> BridgeResult<()> {
        let mut env = TaskEnv {
            raster: &mut self.raster,
            canvas: &mut self.canvas,
            storage: &mut self.storage,
            frame: self.frame_count,
        };
        for task in tasks {
            task.run(&mut env)?;
        }
        Ok(())
    }

    /// Tick until [`Worker::tick`] returns `false`, then finish the sink.
    pub fn run(&mut self) -> BridgeResult<RunStats> {
        let start = self.frame_count;
        let looped = loop {
            match self.tick() {
                Ok(true) => {}
                Ok(false) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        let finished = match self.sink.as_mut() {
            Some(sink) => sink.finish(),
            None => Ok(()),
        };
        looped?;
        finished?;
        let stats = RunStats {
            frames: self.frame_count - start,
            written: self.written,
        };
        tracing::debug!(frames = stats.frames, written = stats.written, "run finished");
        Ok(stats)
    }

    /// Raster calls against the frame buffer.
    pub fn gl<R>(
        &mut self,
        f: impl FnOnce(&mut dyn RasterDevice) -> BridgeResult<R>,
    ) -> BridgeResult<R> {
        self.raster.render(f)
    }

    /// Compute work on the frame buffer (top-left origin, BGRA8).
    pub fn compute<R>(
        &mut self,
        f: impl FnOnce(&mut PixelBuffer) -> BridgeResult<R>,
    ) -> BridgeResult<R> {
        self.raster.compute(f)
    }

    /// Compute work under the raster device's compute context, without frame buffer access.
    pub fn cl<R>(&mut self, f: impl FnOnce(&ExecutionContext) -> BridgeResult<R>) -> BridgeResult<R> {
        let ctx = self.raster.context().clone();
        let _exec = ctx.scope();
        f(&ctx)
    }

    /// One vector canvas frame.
    pub fn nanovg<R>(
        &mut self,
        f: impl FnOnce(&mut vello_cpu::RenderContext, Size) -> R,
    ) -> BridgeResult<R> {
        self.canvas.render(&mut self.raster, f)
    }

    /// Clear the frame buffer.
    pub fn clear(&mut self, color: ClearColor) -> BridgeResult<()> {
        self.raster.clear(color)
    }

    /// Capture the next frame of the attached source. `false` means end of stream.
    pub fn capture(&mut self) -> BridgeResult<bool> {
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| BridgeError::validation("no video source attached"))?;
        self.video
            .capture(&mut self.raster, |frame| source.pull(frame))
    }

    /// Capture a frame produced by `fill`. `false` means `fill` produced an empty frame.
    pub fn capture_with(
        &mut self,
        fill: impl FnOnce(&mut PixelBuffer) -> BridgeResult<()>,
    ) -> BridgeResult<bool> {
        self.video.capture(&mut self.raster, fill)
    }

    /// Write the frame buffer to the attached sink.
    pub fn write(&mut self) -> BridgeResult<()> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| BridgeError::validation("no video sink attached"))?;
        self.video.write(&mut self.raster, |frame| sink.push(frame))?;
        self.written += 1;
        Ok(())
    }

    /// Hand the frame buffer as an RGB video frame to `consume`.
    pub fn write_with(
        &mut self,
        consume: impl FnOnce(&PixelBuffer) -> BridgeResult<()>,
    ) -> BridgeResult<()> {
        self.video.write(&mut self.raster, consume)
    }

    /// Process window events and present the current view. Returns `false` once the window
    /// asked to close. Offscreen workers still process events but do not present.
    pub fn display(&mut self) -> BridgeResult<bool> {
        for ev in self.raster.poll_events()? {
            self.handle_event(&ev);
        }
        if self.closed {
            return Ok(false);
        }
        if self.config.offscreen {
            return Ok(true);
        }
        self.raster
            .blit_to_screen(self.view.viewport(), self.config.stretch)?;
        Ok(true)
    }

    /// Apply one window event.
    pub fn handle_event(&mut self, ev: &InputEvent) {
        match *ev {
            InputEvent::CloseRequested => self.close(),
            InputEvent::Key {
                key: Key::Escape,
                pressed: true,
            } => {
                let offscreen = !self.config.offscreen;
                self.set_offscreen(offscreen);
            }
            _ => {
                self.view.handle_event(ev);
            }
        }
    }

    /// Request the loop to stop after the current frame.
    pub fn close(&mut self) {
        tracing::debug!("worker closed");
        self.closed = true;
    }

    /// Whether [`Worker::close`] was called or the window asked to close.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop or resume presenting to the window.
    ///
    /// Devices without a window surface stay offscreen.
    pub fn set_offscreen(&mut self, offscreen: bool) {
        if !offscreen && !self.raster.device().has_window() {
            tracing::debug!("no window surface, staying offscreen");
            return;
        }
        self.config.offscreen = offscreen;
    }

    /// Whether presenting is disabled.
    pub fn is_offscreen(&self) -> bool {
        self.config.offscreen
    }

    /// Runtime description.
    pub fn system_info(&self) -> SystemInfo {
        let info = self.raster.info();
        let ctx = self.raster.context();
        SystemInfo {
            api_version: info.api_version,
            renderer: info.renderer,
            compute_device: ctx.device().name.clone(),
            interop: info.interop,
            use_compute: ctx.use_compute(),
            raster_context: ctx.id(),
            video_context: self.video.context().id(),
        }
    }

    /// Save the frame buffer as an RGBA PNG (top row first).
    pub fn snapshot_png(&mut self, path: &Path) -> BridgeResult<()> {
        use anyhow::Context as _;
        let mut px = PixelBuffer::empty(crate::buffer::PixelFormat::Bgra8);
        self.raster.read_raw(&mut px)?;
        px.flip_vertical();
        for p in px.data_mut().chunks_exact_mut(4) {
            p.swap(0, 2);
        }
        crate::video::ffmpeg::ensure_parent_dir(path)?;
        image::save_buffer_with_format(
            path,
            px.data(),
            px.width(),
            px.height(),
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}
