use crate::buffer::{PixelBuffer, PixelFormat};
use crate::foundation::core::Size;
use crate::foundation::error::{BridgeError, BridgeResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Decoder contract: pull decoded RGB frames in stream order.
pub trait VideoSource: Send {
    /// Frame size announced at open time.
    fn frame_size(&self) -> Size;
    /// Stream frame rate.
    fn fps(&self) -> f64;
    /// Decode the next frame into `dst` as RGB8. Leaves `dst` empty at end of stream.
    fn pull(&mut self, dst: &mut PixelBuffer) -> BridgeResult<()>;
}

/// Encoder contract: push RGB frames in presentation order.
pub trait VideoSink: Send {
    /// Frame size the encoder was opened with.
    fn frame_size(&self) -> Size;
    /// Encode one RGB8 frame.
    fn push(&mut self, frame: &PixelBuffer) -> BridgeResult<()>;
    /// Flush and close the stream.
    fn finish(&mut self) -> BridgeResult<()>;
}

/// Scripted decoder for tests and synthetic runs.
#[derive(Debug)]
pub struct InMemorySource {
    frames: VecDeque<PixelBuffer>,
    size: Size,
    fps: f64,
}

impl InMemorySource {
    /// Source yielding `frames` in order. The announced size is the first frame's size.
    pub fn new(frames: Vec<PixelBuffer>, fps: f64) -> Self {
        let size = frames.first().map(PixelBuffer::size).unwrap_or_default();
        Self {
            frames: frames.into(),
            size,
            fps,
        }
    }

    /// Source yielding `count` frames of one RGB color.
    pub fn solid(size: Size, rgb: [u8; 3], count: usize, fps: f64) -> BridgeResult<Self> {
        let frame = PixelBuffer::filled(size, PixelFormat::Rgb8, &rgb)?;
        Ok(Self::new(vec![frame; count], fps))
    }

    /// Frames not pulled yet.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl VideoSource for InMemorySource {
    fn frame_size(&self) -> Size {
        self.size
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn pull(&mut self, dst: &mut PixelBuffer) -> BridgeResult<()> {
        match self.frames.pop_front() {
            Some(frame) => *dst = frame,
            None => dst.clear(),
        }
        Ok(())
    }
}

/// Encoder collecting frames in memory.
///
/// Clones share the collected frames, so a test can keep one clone and hand the other to a
/// worker.
#[derive(Clone, Debug)]
pub struct InMemorySink {
    size: Size,
    frames: Arc<Mutex<Vec<PixelBuffer>>>,
    finished: Arc<Mutex<bool>>,
}

impl InMemorySink {
    /// Sink expecting `size` frames.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            frames: Arc::default(),
            finished: Arc::default(),
        }
    }

    /// Copy of the frames pushed so far.
    pub fn frames(&self) -> Vec<PixelBuffer> {
        self.frames.lock().clone()
    }

    /// Number of frames pushed so far.
    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    /// Return `true` when no frame was pushed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`VideoSink::finish`] was called.
    pub fn is_finished(&self) -> bool {
        *self.finished.lock()
    }
}

impl VideoSink for InMemorySink {
    fn frame_size(&self) -> Size {
        self.size
    }

    fn push(&mut self, frame: &PixelBuffer) -> BridgeResult<()> {
        if *self.finished.lock() {
            return Err(BridgeError::video("sink is already finished"));
        }
        self.frames.lock().push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> BridgeResult<()> {
        *self.finished.lock() = true;
        Ok(())
    }
}
