//! Reusable-buffer pool for sustained frame throughput.
//!
//! Decoding at 60 fps allocates a multi-megabyte payload per frame.
//! The pool keeps up to `max_buffers` released buffers idle and hands
//! them back out on the next [`acquire`](BufferPool::acquire), so the
//! steady state performs no allocation at all.
//!
//! Buffers move by value: whoever holds one owns it exclusively until
//! it is passed to [`release`](BufferPool::release).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use bytes::BytesMut;
use serde::Serialize;

// ── Reusable ─────────────────────────────────────────────────────

/// A buffer type the pool knows how to reset between owners.
pub trait Reusable {
    /// Drop the contents while keeping the allocation.
    fn reset(&mut self);
}

impl Reusable for Vec<u8> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl Reusable for BytesMut {
    fn reset(&mut self) {
        self.clear();
    }
}

// ── PoolStats ────────────────────────────────────────────────────

/// Counters exposed to the monitoring layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Buffers created by the factory since the pool was built.
    pub allocated: u64,
    /// Acquisitions served from the idle set.
    pub reused: u64,
    /// Releases dropped because the idle set was full.
    pub discarded: u64,
    /// Buffers currently idle.
    pub idle: usize,
}

// ── BufferPool ───────────────────────────────────────────────────

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Bounded pool of reusable buffers.
///
/// The idle set never holds more than `max_buffers` entries; surplus
/// releases are dropped, so the pool cannot grow without bound.
pub struct BufferPool<T> {
    idle: Mutex<Vec<T>>,
    max_buffers: usize,
    factory: Factory<T>,
    allocated: AtomicU64,
    reused: AtomicU64,
    discarded: AtomicU64,
}

impl<T: Reusable> BufferPool<T> {
    /// Create a pool that builds new buffers with `factory`.
    pub fn new<F>(max_buffers: usize, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            idle: Mutex::new(Vec::with_capacity(max_buffers)),
            max_buffers,
            factory: Box::new(factory),
            allocated: AtomicU64::new(0),
            reused: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Take an idle buffer, or allocate a fresh one if none is idle.
    pub fn acquire(&self) -> T {
        if let Some(buffer) = self.lock_idle().pop() {
            self.reused.fetch_add(1, Ordering::Relaxed);
            return buffer;
        }
        self.allocated.fetch_add(1, Ordering::Relaxed);
        (self.factory)()
    }

    /// Give a buffer back. Returns `false` when the idle set was full
    /// and the buffer was dropped instead.
    pub fn release(&self, mut buffer: T) -> bool {
        buffer.reset();
        let mut idle = self.lock_idle();
        if idle.len() < self.max_buffers {
            idle.push(buffer);
            true
        } else {
            drop(idle);
            self.discarded.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.allocated.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            idle: self.idle_count(),
        }
    }

    pub fn idle_count(&self) -> usize {
        self.lock_idle().len()
    }

    pub fn max_buffers(&self) -> usize {
        self.max_buffers
    }

    fn lock_idle(&self) -> MutexGuard<'_, Vec<T>> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BufferPool<Vec<u8>> {
    /// Pool of byte buffers pre-sized for `buffer_bytes`.
    pub fn for_frames(max_buffers: usize, buffer_bytes: usize) -> Self {
        Self::new(max_buffers, move || Vec::with_capacity(buffer_bytes))
    }
}

impl<T: Reusable> std::fmt::Debug for BufferPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("max_buffers", &self.max_buffers)
            .field("stats", &self.stats())
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────
