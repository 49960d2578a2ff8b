use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use framebridge::vello_cpu::kurbo::Shape as _;
use framebridge::vello_cpu::{self, kurbo, peniko};
use framebridge::{
    BridgeError, CancelFlag, ClearColor, FfmpegCapture, FfmpegWriter, FramePacket, PixelBuffer,
    PixelFormat, Point, SafeQueue, Size, VideoOpts, VideoSink, VideoSource, Worker, WorkerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "framebridge", version)]
struct Cli {
    /// Worker config JSON. Defaults apply to missing fields.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run without presenting to a window.
    #[arg(long, global = true)]
    offscreen: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print raster, compute and interop information.
    Info,
    /// Decode a video through the frame buffer and re-encode it (requires `ffmpeg`).
    Video(VideoArgs),
    /// Render a synthetic scene.
    Synthetic(SyntheticArgs),
    /// Decode and analyze on a producer thread, composite and encode on the consumer.
    Pipeline(VideoArgs),
}

#[derive(Args, Debug)]
struct VideoArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output video (VP9).
    #[arg(long)]
    out: PathBuf,

    /// Use VA-API hardware decode/encode.
    #[arg(long)]
    vaapi: bool,

    /// DRM render node index for VA-API.
    #[arg(long, default_value_t = 0)]
    device: u32,

    /// Queue depth between producer and consumer.
    #[arg(long, default_value_t = 8)]
    queue: usize,
}

impl VideoArgs {
    fn opts(&self) -> VideoOpts {
        if self.vaapi {
            VideoOpts::vaapi(self.device)
        } else {
            VideoOpts::default()
        }
    }
}

#[derive(Args, Debug)]
struct SyntheticArgs {
    /// Number of frames to render.
    #[arg(long, default_value_t = 60)]
    frames: u64,

    /// Save the last frame as PNG.
    #[arg(long)]
    png: Option<PathBuf>,

    /// Encode the frames to a video file (requires `ffmpeg`).
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            let code = err
                .downcast_ref::<BridgeError>()
                .map(BridgeError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => WorkerConfig::from_json_path(path)?,
        None => WorkerConfig::default(),
    };
    config.offscreen |= cli.offscreen;

    match cli.cmd {
        Command::Info => cmd_info(config),
        Command::Video(args) => cmd_video(config, args),
        Command::Synthetic(args) => cmd_synthetic(config, args),
        Command::Pipeline(args) => cmd_pipeline(config, args),
    }
}

fn make_worker(config: WorkerConfig) -> anyhow::Result<Worker> {
    let worker = Worker::from_config(config)?;
    install_cancel_handler(worker.cancel_flag())?;
    Ok(worker)
}

fn install_cancel_handler(done: CancelFlag) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        tracing::info!("interrupted, finishing current frame");
        done.cancel();
    })
    .context("install signal handler")
}

fn cmd_info(config: WorkerConfig) -> anyhow::Result<()> {
    let worker = Worker::from_config(config)?;
    println!("{}", worker.system_info());
    Ok(())
}

fn cmd_video(config: WorkerConfig, args: VideoArgs) -> anyhow::Result<()> {
    let source = FfmpegCapture::open(&args.in_path, args.opts())?;
    let (size, fps) = (source.frame_size(), source.fps());
    let sink = FfmpegWriter::open(&args.out, fps, size, args.opts())?;

    let mut worker = make_worker(config)?;
    worker.attach_source(Box::new(source))?;
    worker.attach_sink(Box::new(sink))?;
    worker.plan(|plan| {
        plan.nvg("frame-counter", |canvas, size, storage| {
            draw_progress_bar(canvas, size, storage.frame());
        });
    });

    let stats = worker.run()?;
    eprintln!("wrote {} ({} frames)", args.out.display(), stats.written);
    Ok(())
}

fn cmd_synthetic(config: WorkerConfig, args: SyntheticArgs) -> anyhow::Result<()> {
    let mut worker = make_worker(config)?;
    if let Some(out) = &args.out {
        let size = worker.size();
        worker.attach_sink(Box::new(FfmpegWriter::open(out, 30.0, size, VideoOpts::default())?))?;
    }
    worker.plan(|plan| {
        plan.gl("background", |gl, _| gl.clear(ClearColor::new(0.0, 0.0, 1.0, 1.0)))
            .nvg("orbit", |canvas, size, storage| {
                draw_orbit(canvas, size, storage.frame());
            });
    });

    let done = worker.cancel_flag();
    for _ in 0..args.frames {
        if !worker.tick()? || done.is_cancelled() {
            break;
        }
    }
    if let Some(png) = &args.png {
        worker.snapshot_png(png)?;
        eprintln!("wrote {}", png.display());
    }
    if args.out.is_some() {
        worker.close();
        worker.run()?;
    }
    Ok(())
}

fn cmd_pipeline(config: WorkerConfig, args: VideoArgs) -> anyhow::Result<()> {
    let source = FfmpegCapture::open(&args.in_path, args.opts())?;
    let (size, fps) = (source.frame_size(), source.fps());
    let mut sink = FfmpegWriter::open(&args.out, fps, size, args.opts())?;

    let mut worker = make_worker(config)?;
    let done = worker.cancel_flag();
    let queue = Arc::new(SafeQueue::new(args.queue));
    let producer = framebridge::spawn_producer(
        Arc::clone(&queue),
        done.clone(),
        source,
        |frame: &PixelBuffer| Ok(bright_points(frame, 64)),
    )?;

    let mut written = 0u64;
    let consumed = framebridge::consume(&queue, &done, |packet: FramePacket| {
        let frame = &packet.frame;
        worker.capture_with(|dst| {
            dst.copy_from(frame);
            Ok(())
        })?;
        let points = packet.points.clone();
        let frame_size = frame.size();
        worker.nanovg(|canvas, fb_size| draw_points(canvas, fb_size, frame_size, &points))?;
        worker.write_with(|out| sink.push(out))?;
        written += 1;
        worker.display()
    });
    let produced = producer
        .join()
        .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
    sink.finish()?;
    let consumed = consumed?;
    let produced = produced?;
    tracing::info!(produced, consumed, written, "pipeline finished");
    eprintln!("wrote {} ({written} frames)", args.out.display());
    Ok(())
}

/// Up to `max` local luminance maxima on a coarse grid.
fn bright_points(frame: &PixelBuffer, max: usize) -> Vec<Point> {
    const CELL: u32 = 32;
    let mut gray = PixelBuffer::empty(PixelFormat::Gray8);
    if frame
        .convert_into(&mut gray, framebridge::ColorConversion::RgbToGray)
        .is_err()
    {
        return Vec::new();
    }
    let mut cells = Vec::new();
    for cy in (0..gray.height()).step_by(CELL as usize) {
        for cx in (0..gray.width()).step_by(CELL as usize) {
            let mut best = (0u8, cx, cy);
            for y in cy..(cy + CELL).min(gray.height()) {
                for x in cx..(cx + CELL).min(gray.width()) {
                    let v = gray.pixel(x, y)[0];
                    if v > best.0 {
                        best = (v, x, y);
                    }
                }
            }
            cells.push(best);
        }
    }
    cells.sort_by(|a, b| b.0.cmp(&a.0));
    cells
        .into_iter()
        .take(max)
        .map(|(_, x, y)| Point::new(f64::from(x), f64::from(y)))
        .collect()
}

fn draw_points(
    canvas: &mut vello_cpu::RenderContext,
    fb_size: Size,
    frame_size: Size,
    points: &[Point],
) {
    let sx = f64::from(fb_size.width) / f64::from(frame_size.width.max(1));
    let sy = f64::from(fb_size.height) / f64::from(frame_size.height.max(1));
    canvas.set_paint(peniko::Color::from_rgba8(255, 64, 0, 200));
    for p in points {
        let c = kurbo::Circle::new((p.x * sx, p.y * sy), 4.0 * sx.max(sy));
        canvas.fill_path(&c.to_path(0.1));
    }
}

fn draw_progress_bar(canvas: &mut vello_cpu::RenderContext, size: Size, frame: u64) {
    let w = f64::from(size.width);
    let h = f64::from(size.height);
    let t = (frame % 120) as f64 / 120.0;
    canvas.set_paint(peniko::Color::from_rgba8(0, 0, 0, 128));
    canvas.fill_rect(&kurbo::Rect::new(0.0, h - 12.0, w, h));
    canvas.set_paint(peniko::Color::from_rgba8(255, 255, 255, 220));
    canvas.fill_rect(&kurbo::Rect::new(0.0, h - 10.0, w * t, h - 2.0));
}

fn draw_orbit(canvas: &mut vello_cpu::RenderContext, size: Size, frame: u64) {
    let w = f64::from(size.width);
    let h = f64::from(size.height);
    let r = w.min(h) * 0.3;
    let a = frame as f64 * std::f64::consts::TAU / 120.0;
    let c = kurbo::Circle::new((w / 2.0 + r * a.cos(), h / 2.0 + r * a.sin()), r * 0.15);
    canvas.set_paint(peniko::Color::from_rgba8(255, 200, 0, 255));
    canvas.fill_path(&c.to_path(0.1));
}
