//! Producer/consumer hand-off for decode-ahead pipelines.
//!
//! The producer thread decodes frames and runs host-side analysis; the consumer thread owns all
//! raster, compute and codec contexts. [`SafeQueue`] is the only state shared between them. The
//! producer always finishes with an end-of-stream sentinel (a packet with an empty frame), so a
//! consumer blocked in [`SafeQueue::dequeue`] is guaranteed to wake up.

use crate::buffer::{PixelBuffer, PixelFormat};
use crate::foundation::core::Point;
use crate::foundation::error::BridgeResult;
use crate::video::io::VideoSource;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

/// Shared cancellation flag, flipped by signal handlers or by an exiting consumer.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Fresh, not-cancelled flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bounded blocking FIFO.
#[derive(Debug)]
pub struct SafeQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> SafeQueue<T> {
    /// Queue holding at most `capacity` items (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Append `item`, blocking while the queue is full.
    pub fn enqueue(&self, item: T) {
        let mut items = self.items.lock();
        while items.len() >= self.capacity {
            self.not_full.wait(&mut items);
        }
        items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Pop the oldest item, blocking while the queue is empty.
    pub fn dequeue(&self) -> T {
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                self.not_full.notify_one();
                return item;
            }
            self.not_empty.wait(&mut items);
        }
    }

    /// Pop the oldest item if there is one.
    pub fn try_dequeue(&self) -> Option<T> {
        let item = self.items.lock().pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Items currently queued.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Return `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Decoded frame plus the feature points the producer extracted from it.
#[derive(Clone, Debug, PartialEq)]
pub struct FramePacket {
    /// Feature points in frame pixel coordinates (top-left origin).
    pub points: Vec<Point>,
    /// RGB8 frame. Empty for the end-of-stream sentinel.
    pub frame: PixelBuffer,
}

impl FramePacket {
    /// End-of-stream sentinel.
    pub fn sentinel() -> Self {
        Self {
            points: Vec::new(),
            frame: PixelBuffer::empty(PixelFormat::Rgb8),
        }
    }

    /// Return `true` for the end-of-stream sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.frame.is_empty()
    }
}

/// Enqueues the end-of-stream sentinel when dropped, including while unwinding.
struct SentinelGuard(Arc<SafeQueue<FramePacket>>);

impl Drop for SentinelGuard {
    fn drop(&mut self) {
        self.0.enqueue(FramePacket::sentinel());
    }
}

/// Decode `source` on a new thread, run `analyze` on each frame and enqueue the results.
///
/// The loop stops at end of stream, on cancellation or on the first error; the sentinel is
/// enqueued in every case, even if `analyze` or the source panics. The thread returns the
/// number of frames produced.
pub fn spawn_producer<S, F>(
    queue: Arc<SafeQueue<FramePacket>>,
    done: CancelFlag,
    mut source: S,
    mut analyze: F,
) -> BridgeResult<JoinHandle<BridgeResult<u64>>>
where
    S: VideoSource + 'static,
    F: FnMut(&PixelBuffer) -> BridgeResult<Vec<Point>> + Send + 'static,
{
    use anyhow::Context as _;
    let handle = std::thread::Builder::new()
        .name("framebridge-producer".to_owned())
        .spawn(move || {
            let sentinel = SentinelGuard(Arc::clone(&queue));
            let mut produced = 0u64;
            let result: BridgeResult<()> = (|| {
                while !done.is_cancelled() {
                    let mut frame = PixelBuffer::empty(PixelFormat::Rgb8);
                    source.pull(&mut frame)?;
                    if frame.is_empty() {
                        break;
                    }
                    let points = analyze(&frame)?;
                    queue.enqueue(FramePacket { points, frame });
                    produced += 1;
                }
                Ok(())
            })();
            drop(sentinel);
            tracing::debug!(produced, ok = result.is_ok(), "producer finished");
            result.map(|()| produced)
        })
        .context("failed to spawn producer thread")?;
    Ok(handle)
}

/// Pop packets and feed them to `f` until the sentinel arrives.
///
/// `f` returns `Ok(false)` to stop early. On early exit (stop, error or cancellation) the flag is
/// cancelled and the queue is drained up to the sentinel so the producer cannot stay blocked on a
/// full queue. Returns the number of packets handed to `f`.
pub fn consume<F>(queue: &SafeQueue<FramePacket>, done: &CancelFlag, mut f: F) -> BridgeResult<u64>
where
    F: FnMut(FramePacket) -> BridgeResult<bool>,
{
    let mut consumed = 0u64;
    let result = loop {
        if done.is_cancelled() {
            break Ok(false);
        }
        let packet = queue.dequeue();
        if packet.is_sentinel() {
            break Ok(true);
        }
        consumed += 1;
        match f(packet) {
            Ok(true) => {}
            Ok(false) => break Ok(false),
            Err(e) => break Err(e),
        }
    };

    match result {
        Ok(true) => Ok(consumed),
        other => {
            done.cancel();
            while !queue.dequeue().is_sentinel() {}
            other.map(|_| consumed)
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/queue.rs"]
mod tests;
