use std::time::{Duration, Instant};

/// Frame rate meter. Logs the measured rate about once per second of frames.
#[derive(Debug)]
pub struct FpsMeter {
    window_start: Instant,
    window_frames: u64,
    frames: u64,
    fps: f64,
    report_every: u64,
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsMeter {
    /// Start measuring now.
    pub fn new() -> Self {
        Self {
            window_start: Instant::now(),
            window_frames: 0,
            frames: 0,
            fps: 0.0,
            report_every: 1,
        }
    }

    /// Count one frame.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Count one frame finished at `now`.
    pub fn tick_at(&mut self, now: Instant) {
        self.frames += 1;
        self.window_frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= Duration::from_secs(1) {
            self.fps = self.window_frames as f64 / elapsed.as_secs_f64();
            self.window_start = now;
            self.window_frames = 0;
            self.report_every = (self.fps.ceil() as u64).max(1);
        }
        if self.fps > 0.0 && self.frames.is_multiple_of(self.report_every) {
            tracing::info!(fps = format_args!("{:.1}", self.fps), frames = self.frames, "fps");
        }
    }

    /// Last measured rate, `0.0` until one second has passed.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Frames counted so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
