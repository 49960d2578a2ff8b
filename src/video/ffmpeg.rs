use crate::buffer::{PixelBuffer, PixelFormat};
use crate::config::{HwAccel, VideoOpts};
use crate::foundation::core::Size;
use crate::foundation::error::{BridgeError, BridgeResult, InitStage};
use crate::video::io::{VideoSink, VideoSource};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

type StderrDrain = JoinHandle<std::io::Result<Vec<u8>>>;

/// Stream metadata reported by `ffprobe`.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeInfo {
    /// Frame size.
    pub size: Size,
    /// Frame rate.
    pub fps: f64,
}

/// Probe the first video stream of `path`.
pub fn probe(path: &Path) -> BridgeResult<ProbeInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
    }

    let out = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(path)
        .output()
        .map_err(|e| BridgeError::init(InitStage::Codec, format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(BridgeError::init(
            InitStage::Codec,
            format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        ));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout).map_err(|e| {
        BridgeError::init(InitStage::Codec, format!("ffprobe json parse failed: {e}"))
    })?;
    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| BridgeError::init(InitStage::Codec, "no video stream found"))?;
    let (Some(width), Some(height)) = (stream.width, stream.height) else {
        return Err(BridgeError::init(
            InitStage::Codec,
            "missing video dimensions from ffprobe",
        ));
    };
    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .unwrap_or(30.0);
    Ok(ProbeInfo {
        size: Size::new(width, height),
        fps,
    })
}

/// Parse `num/den` or a plain number.
pub(crate) fn parse_rate(s: &str) -> Option<f64> {
    let v = match s.split_once('/') {
        Some((n, d)) => {
            let d: f64 = d.trim().parse().ok()?;
            if d == 0.0 {
                return None;
            }
            n.trim().parse::<f64>().ok()? / d
        }
        None => s.trim().parse().ok()?,
    };
    (v.is_finite() && v > 0.0).then_some(v)
}

/// Decoder spawning `ffmpeg` and reading raw `rgb24` frames from its stdout.
pub struct FfmpegCapture {
    path: PathBuf,
    info: ProbeInfo,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr_drain: Option<StderrDrain>,
}

impl FfmpegCapture {
    /// Probe and open `path` for decoding.
    pub fn open(path: impl Into<PathBuf>, opts: VideoOpts) -> BridgeResult<Self> {
        let path = path.into();
        if !is_ffmpeg_on_path() {
            return Err(BridgeError::init(
                InitStage::Codec,
                "ffmpeg is required for video capture, but was not found on PATH",
            ));
        }
        let info = probe(&path)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .args(["-nostdin", "-loglevel", "error"]);
        if opts.accel == HwAccel::Vaapi {
            cmd.args(["-hwaccel", "vaapi", "-hwaccel_device"])
                .arg(opts.render_node());
        }
        cmd.arg("-i")
            .arg(&path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"]);

        let mut child = cmd.spawn().map_err(|e| {
            BridgeError::init(InitStage::Codec, format!("failed to spawn ffmpeg: {e}"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            BridgeError::init(InitStage::Codec, "failed to open ffmpeg stdout (unexpected)")
        })?;
        let stderr_drain = spawn_stderr_drain(&mut child)?;
        tracing::debug!(path = %path.display(), size = %info.size, fps = info.fps, ?opts, "video capture opened");

        Ok(Self {
            path,
            info,
            child: Some(child),
            stdout: Some(stdout),
            stderr_drain: Some(stderr_drain),
        })
    }

    fn close(&mut self) -> BridgeResult<()> {
        drop(self.stdout.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| BridgeError::video(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr = join_stderr_drain(self.stderr_drain.take())?;
        if !status.success() {
            return Err(BridgeError::video(format!(
                "ffmpeg decoding '{}' exited with status {status}: {}",
                self.path.display(),
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(())
    }
}

impl VideoSource for FfmpegCapture {
    fn frame_size(&self) -> Size {
        self.info.size
    }

    fn fps(&self) -> f64 {
        self.info.fps
    }

    fn pull(&mut self, dst: &mut PixelBuffer) -> BridgeResult<()> {
        let Some(stdout) = self.stdout.as_mut() else {
            dst.clear();
            return Ok(());
        };
        dst.ensure(self.info.size, PixelFormat::Rgb8);
        match stdout.read_exact(dst.data_mut()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                dst.clear();
                self.close()
            }
            Err(e) => Err(BridgeError::video(format!(
                "failed to read frame from ffmpeg: {e}"
            ))),
        }
    }
}

impl Drop for FfmpegCapture {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill();
        }
        if let Err(err) = self.close() {
            tracing::debug!(error = %err, "ffmpeg capture closed early");
        }
    }
}

/// Encoder spawning `ffmpeg` and streaming raw `rgb24` frames to its stdin. Output is VP9.
pub struct FfmpegWriter {
    out_path: PathBuf,
    size: Size,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<StderrDrain>,
}

impl FfmpegWriter {
    /// Open `out_path` for `size` frames at `fps`.
    pub fn open(
        out_path: impl Into<PathBuf>,
        fps: f64,
        size: Size,
        opts: VideoOpts,
    ) -> BridgeResult<Self> {
        let out_path = out_path.into();
        size.require_non_empty("video writer size")?;
        if !size.width.is_multiple_of(2) || !size.height.is_multiple_of(2) {
            return Err(BridgeError::validation(format!(
                "video writer size must be even for yuv420p output, got {size}"
            )));
        }
        if !(fps.is_finite() && fps > 0.0) {
            return Err(BridgeError::validation(format!(
                "video writer fps must be positive, got {fps}"
            )));
        }
        ensure_parent_dir(&out_path)?;
        if !is_ffmpeg_on_path() {
            return Err(BridgeError::init(
                InitStage::Codec,
                "ffmpeg is required for video writing, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args(["-y", "-loglevel", "error"]);
        if opts.accel == HwAccel::Vaapi {
            cmd.arg("-vaapi_device").arg(opts.render_node());
        }
        cmd.args([
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &size.to_string(),
            "-r",
            &fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
        ]);
        match opts.accel {
            HwAccel::None => cmd.args(["-c:v", "libvpx-vp9", "-pix_fmt", "yuv420p"]),
            HwAccel::Vaapi => cmd.args(["-vf", "format=nv12,hwupload", "-c:v", "vp9_vaapi"]),
        };
        cmd.arg(&out_path);

        let mut child = cmd.spawn().map_err(|e| {
            BridgeError::init(InitStage::Codec, format!("failed to spawn ffmpeg: {e}"))
        })?;
        let stdin = child.stdin.take().ok_or_else(|| {
            BridgeError::init(InitStage::Codec, "failed to open ffmpeg stdin (unexpected)")
        })?;
        let stderr_drain = spawn_stderr_drain(&mut child)?;
        tracing::debug!(path = %out_path.display(), %size, fps, ?opts, "video writer opened");

        Ok(Self {
            out_path,
            size,
            child: Some(child),
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
        })
    }
}

impl VideoSink for FfmpegWriter {
    fn frame_size(&self) -> Size {
        self.size
    }

    fn push(&mut self, frame: &PixelBuffer) -> BridgeResult<()> {
        if frame.size() != self.size {
            return Err(BridgeError::VideoFrameSize {
                expected: self.size,
                actual: frame.size(),
            });
        }
        if frame.format() != PixelFormat::Rgb8 {
            return Err(BridgeError::validation(format!(
                "video writer expects Rgb8 frames, got {:?}",
                frame.format()
            )));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(BridgeError::video("video writer is already finished"));
        };
        use std::io::Write as _;
        stdin
            .write_all(frame.data())
            .map_err(|e| BridgeError::video(format!("failed to write frame to ffmpeg stdin: {e}")))
    }

    fn finish(&mut self) -> BridgeResult<()> {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| BridgeError::video(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr = join_stderr_drain(self.stderr_drain.take())?;
        if !status.success() {
            return Err(BridgeError::video(format!(
                "ffmpeg writing '{}' exited with status {status}: {}",
                self.out_path.display(),
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            tracing::warn!(error = %err, "video writer finish failed");
        }
    }
}

fn spawn_stderr_drain(child: &mut Child) -> BridgeResult<StderrDrain> {
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| BridgeError::init(InitStage::Codec, "failed to open ffmpeg stderr"))?;
    Ok(std::thread::spawn(move || {
        let mut bytes = Vec::new();
        stderr.read_to_end(&mut bytes)?;
        Ok(bytes)
    }))
}

fn join_stderr_drain(handle: Option<StderrDrain>) -> BridgeResult<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| BridgeError::video("ffmpeg stderr drain thread panicked"))?
            .map_err(|e| BridgeError::video(format!("ffmpeg stderr read failed: {e}"))),
        None => Ok(Vec::new()),
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> BridgeResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    tool_on_path("ffmpeg")
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

fn tool_on_path(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
