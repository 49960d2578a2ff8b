use std::path::{Path, PathBuf};
use std::process::Command;

use framebridge::video::ffmpeg::probe;
use framebridge::{
    ClearColor, FfmpegCapture, FfmpegWriter, PixelBuffer, Size, VideoOpts, VideoSink, VideoSource,
    Worker, WorkerConfig, is_ffmpeg_on_path, is_ffprobe_on_path,
};

fn tools_available() -> bool {
    is_ffmpeg_on_path() && is_ffprobe_on_path()
}

fn out_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("ffmpeg_tests").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn synth_clip(path: &Path, size: Size, frames: u32) {
    let status = Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-f", "lavfi", "-i"])
        .arg(format!(
            "color=c=blue:size={}x{}:rate=30",
            size.width, size.height
        ))
        .args(["-frames:v", &frames.to_string(), "-pix_fmt", "yuv420p"])
        .args(["-c:v", "libvpx-vp9", "-lossless", "1"])
        .arg(path)
        .status()
        .unwrap();
    assert!(status.success(), "ffmpeg failed creating {}", path.display());
}

#[test]
fn capture_reads_every_frame() {
    if !tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }
    let dir = out_dir("capture");
    let clip = dir.join("blue.webm");
    let size = Size::new(64, 48);
    synth_clip(&clip, size, 5);

    let mut cap = FfmpegCapture::open(&clip, VideoOpts::default()).unwrap();
    assert_eq!(cap.frame_size(), size);
    assert!((cap.fps() - 30.0).abs() < 1e-6);

    let mut frame = PixelBuffer::empty(framebridge::PixelFormat::Rgb8);
    let mut n = 0;
    loop {
        cap.pull(&mut frame).unwrap();
        if frame.is_empty() {
            break;
        }
        n += 1;
        let p = frame.pixel(10, 10);
        assert!(p[2] > 200 && p[0] < 40, "{p:?}");
    }
    assert_eq!(n, 5);
}

#[test]
fn worker_reencodes_a_clip() {
    if !tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }
    let dir = out_dir("reencode");
    let clip = dir.join("in.webm");
    let out = dir.join("out.webm");
    let _ = std::fs::remove_file(&out);
    let size = Size::new(64, 48);
    synth_clip(&clip, size, 4);

    let cap = FfmpegCapture::open(&clip, VideoOpts::default()).unwrap();
    let writer = FfmpegWriter::open(&out, cap.fps(), cap.frame_size(), VideoOpts::default()).unwrap();

    let cfg = WorkerConfig {
        offscreen: true,
        ..WorkerConfig::with_size(Size::new(128, 96))
    };
    let mut worker = Worker::from_config(cfg).unwrap();
    worker.attach_source(Box::new(cap)).unwrap();
    worker.attach_sink(Box::new(writer)).unwrap();
    worker.plan(|plan| {
        plan.gl("red-corner", |gl, _| {
            gl.fill_rect(
                framebridge::PixelRect::new(0, 0, 16, 16),
                ClearColor::new(1.0, 0.0, 0.0, 1.0),
            )
        });
    });
    let stats = worker.run().unwrap();
    assert_eq!(stats.frames, 4);
    assert_eq!(stats.written, 4);

    let info = probe(&out).unwrap();
    assert_eq!(info.size, size);
}

#[test]
fn writer_rejects_frames_of_the_wrong_size() {
    if !tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }
    let dir = out_dir("wrong_size");
    let mut writer = FfmpegWriter::open(
        dir.join("out.webm"),
        30.0,
        Size::new(16, 16),
        VideoOpts::default(),
    )
    .unwrap();
    let frame = PixelBuffer::new(Size::new(8, 8), framebridge::PixelFormat::Rgb8);
    let err = writer.push(&frame).unwrap_err();
    assert_eq!(err.exit_code(), 16);
    // No frame was written; ffmpeg may or may not treat the empty stream as an error.
    let _ = writer.finish();
}

#[test]
fn missing_input_is_a_codec_init_error() {
    if !tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }
    let err = FfmpegCapture::open("does/not/exist.webm", VideoOpts::default())
        .err()
        .unwrap();
    assert_eq!(err.exit_code(), 13);
}
