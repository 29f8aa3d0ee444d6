//! Bounded frame queue between decoder and renderer.
//!
//! A classic producer/consumer buffer with one twist: neither side
//! ever waits. When the renderer falls behind, [`push_frame`] evicts
//! the oldest frames, because under congestion a fresh frame is worth
//! more than a complete history. When the queue is empty,
//! [`pop_frame`] returns `None` and the renderer simply redraws.
//!
//! [`push_frame`]: FrameBufferManager::push_frame
//! [`pop_frame`]: FrameBufferManager::pop_frame

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, trace};

use crate::ring::RingBuffer;
use crate::session::pool::BufferPool;
use crate::session::types::Frame;

// ── FrameBufferStats ─────────────────────────────────────────────

/// Snapshot of the frame queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameBufferStats {
    /// Frames currently queued.
    pub count: usize,
    /// Payload bytes currently queued.
    pub total_bytes: usize,
    /// Frames accepted by `push_frame` since creation.
    pub pushed: u64,
    /// Frames evicted by drop-oldest.
    pub dropped: u64,
    /// Out-of-order frames rejected on push.
    pub discarded: u64,
}

impl FrameBufferStats {
    /// Dropped frames as a share of accepted frames (0 when idle).
    pub fn drop_ratio(&self) -> f64 {
        if self.pushed == 0 {
            0.0
        } else {
            self.dropped as f64 / self.pushed as f64
        }
    }
}

// ── FrameBufferManager ───────────────────────────────────────────

struct Inner {
    queue: RingBuffer<Frame>,
    total_bytes: usize,
    last_id: Option<u64>,
    pushed: u64,
    dropped: u64,
    discarded: u64,
}

/// Drop-oldest frame queue of fixed capacity.
///
/// Safe to share between a decoder task and a render task; the
/// internal lock is held only for the O(1) queue operation itself.
pub struct FrameBufferManager {
    inner: Mutex<Inner>,
    pool: Option<Arc<BufferPool<Vec<u8>>>>,
}

impl FrameBufferManager {
    /// Queue holding at most `max_buffers` frames.
    pub fn new(max_buffers: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: RingBuffer::with_capacity(max_buffers),
                total_bytes: 0,
                last_id: None,
                pushed: 0,
                dropped: 0,
                discarded: 0,
            }),
            pool: None,
        }
    }

    /// Queue that hands evicted and recycled payloads back to `pool`.
    pub fn with_pool(max_buffers: usize, pool: Arc<BufferPool<Vec<u8>>>) -> Self {
        Self {
            pool: Some(pool),
            ..Self::new(max_buffers)
        }
    }

    pub fn max_buffers(&self) -> usize {
        self.lock().queue.capacity()
    }

    /// Append `frame` at the tail, evicting from the head if the queue
    /// is full.
    ///
    /// Frames whose id does not increase past the last accepted id are
    /// discarded and `false` is returned; every other push succeeds.
    pub fn push_frame(&self, frame: Frame) -> bool {
        let mut inner = self.lock();

        if inner.last_id.is_some_and(|last| frame.id <= last) {
            inner.discarded += 1;
            let last = inner.last_id;
            drop(inner);
            debug!(frame_id = frame.id, ?last, "discarding out-of-order frame");
            self.recycle(frame);
            return false;
        }

        inner.last_id = Some(frame.id);
        inner.pushed += 1;
        inner.total_bytes += frame.byte_len();
        let evicted = inner.queue.push_back(frame);
        if let Some(old) = &evicted {
            inner.dropped += 1;
            inner.total_bytes = inner.total_bytes.saturating_sub(old.byte_len());
        }
        drop(inner);

        if let Some(old) = evicted {
            trace!(frame_id = old.id, "evicted stale frame");
            self.recycle(old);
        }
        true
    }

    /// Remove and return the oldest queued frame, or `None`.
    pub fn pop_frame(&self) -> Option<Frame> {
        let mut inner = self.lock();
        let frame = inner.queue.pop_front()?;
        inner.total_bytes = inner.total_bytes.saturating_sub(frame.byte_len());
        Some(frame)
    }

    /// Skip straight to the newest frame, recycling everything older.
    pub fn pop_latest(&self) -> Option<Frame> {
        let mut inner = self.lock();
        let mut frames = inner.queue.drain();
        inner.total_bytes = 0;
        drop(inner);

        let latest = frames.pop();
        for stale in frames {
            self.recycle(stale);
        }
        latest
    }

    /// Return a consumed frame's payload to the pool (if any).
    pub fn recycle(&self, frame: Frame) {
        if let Some(pool) = &self.pool {
            pool.release(frame.payload);
        }
    }

    pub fn stats(&self) -> FrameBufferStats {
        let inner = self.lock();
        FrameBufferStats {
            count: inner.queue.len(),
            total_bytes: inner.total_bytes,
            pushed: inner.pushed,
            dropped: inner.dropped,
            discarded: inner.discarded,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ── Tests ────────────────────────────────────────────────────────
