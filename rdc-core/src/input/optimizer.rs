//! Input batching under a latency budget.
//!
//! Input arrives in bursts: a finger dragging across a phone screen
//! produces a pointer-move every few milliseconds. Sending each event
//! on its own would flood the link, so events are queued and drained
//! once per batch tick. Within a batch, discrete intents (keys, button
//! transitions, gestures) are ordered ahead of pointer motion, and when
//! the queue is full it is pointer motion that gets thrown away.

use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Serialize;
use tracing::trace;

use crate::config::InputConfig;
use crate::input::event::{InputBatch, InputEvent};
use crate::ring::{RingBuffer, SampleWindow};

// ── InputQueueStats ──────────────────────────────────────────────

/// Snapshot of the input pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct InputQueueStats {
    /// Events waiting for the next batch tick.
    pub pending: usize,
    /// Events accepted since creation.
    pub queued: u64,
    /// Events dropped because the queue was full.
    pub dropped: u64,
    /// Batches handed out by `get_batch`.
    pub batches: u64,
    /// Rolling round-trip latency of dispatched batches.
    pub avg_latency_ms: f64,
}

// ── InputOptimizer ───────────────────────────────────────────────

struct QueueState {
    events: RingBuffer<InputEvent>,
    next_sequence: u64,
    queued: u64,
    dropped: u64,
}

/// Bounded, priority-aware input queue.
///
/// `queue_event` and `get_batch` may be called from different tasks;
/// the drain-sort-clear of a batch happens under one lock, so an event
/// lands either wholly in this batch or wholly in the next.
pub struct InputOptimizer {
    queue: Mutex<QueueState>,
    latency: Mutex<SampleWindow>,
    batch_interval_ms: u64,
    latency_budget_ms: f64,
}

impl InputOptimizer {
    /// Default tuning with explicit queue size and tick period.
    pub fn new(max_queue_size: usize, batch_interval_ms: u64) -> Self {
        Self::with_config(&InputConfig {
            max_queue_size,
            batch_interval_ms,
            ..InputConfig::default()
        })
    }

    pub fn with_config(config: &InputConfig) -> Self {
        Self {
            queue: Mutex::new(QueueState {
                events: RingBuffer::with_capacity(config.max_queue_size),
                next_sequence: 0,
                queued: 0,
                dropped: 0,
            }),
            latency: Mutex::new(SampleWindow::new(config.latency_window)),
            batch_interval_ms: config.batch_interval_ms,
            latency_budget_ms: config.latency_budget_ms,
        }
    }

    /// Enqueue `event`. Returns `false` if the event itself was dropped.
    ///
    /// When the queue is full, room is made by dropping the oldest
    /// pointer-move. If there is none and `event` is a pointer-move,
    /// `event` is the one dropped. Only a queue holding nothing but
    /// discrete events loses its oldest discrete event.
    pub fn queue_event(&self, event: InputEvent) -> bool {
        let mut state = self.lock_queue();

        if state.events.is_full() {
            let victim = state.events.position(InputEvent::is_continuous);
            match victim {
                Some(index) => {
                    state.events.remove(index);
                }
                None if event.is_continuous() => {
                    state.dropped += 1;
                    trace!("input queue full of discrete events; dropping pointer-move");
                    return false;
                }
                None => {
                    state.events.pop_front();
                }
            }
            state.dropped += 1;
        }

        state.events.push_back(event);
        state.queued += 1;
        true
    }

    /// Drain everything queued, discrete events first, each class in
    /// arrival order.
    pub fn get_batch(&self) -> InputBatch {
        let mut state = self.lock_queue();
        let mut events = state.events.drain();
        // `sort_by_key` is stable: arrival order survives within a class.
        events.sort_by_key(InputEvent::priority);
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        InputBatch { sequence, events }
    }

    /// Record the observed round-trip latency of a dispatched batch.
    pub fn record_latency(&self, ms: f64) {
        if ms.is_finite() && ms >= 0.0 {
            self.lock_latency().record(ms);
        }
    }

    /// Rolling average latency, `None` before the first sample.
    pub fn avg_latency(&self) -> Option<f64> {
        self.lock_latency().mean()
    }

    /// Whether dispatched input is reaching the remote side within the
    /// latency budget. `false` until a sample exists.
    pub fn meets_latency_requirement(&self) -> bool {
        self.avg_latency()
            .is_some_and(|avg| avg <= self.latency_budget_ms)
    }

    pub fn batch_interval_ms(&self) -> u64 {
        self.batch_interval_ms
    }

    pub fn pending(&self) -> usize {
        self.lock_queue().events.len()
    }

    pub fn stats(&self) -> InputQueueStats {
        let avg_latency_ms = self.avg_latency().unwrap_or(0.0);
        let state = self.lock_queue();
        InputQueueStats {
            pending: state.events.len(),
            queued: state.queued,
            dropped: state.dropped,
            batches: state.next_sequence,
            avg_latency_ms,
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_latency(&self) -> MutexGuard<'_, SampleWindow> {
        self.latency.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::event::{InputEventKind, KeyModifiers, PointerButton};
    use std::sync::Arc;

    fn key(ts: u64, code: u16) -> InputEvent {
        InputEvent::key(ts, code, true, KeyModifiers::empty())
    }

    fn mv(ts: u64) -> InputEvent {
        InputEvent::pointer_move(ts, ts as i32, ts as i32)
    }

    #[test]
    fn empty_batch() {
        let opt = InputOptimizer::new(8, 16);
        let batch = opt.get_batch();
        assert!(batch.is_empty());
        assert_eq!(batch.sequence, 0);
        assert_eq!(opt.get_batch().sequence, 1);
    }

    #[test]
    fn discrete_events_sort_first_stably() {
        let opt = InputOptimizer::new(64, 16);
        // Interleave 5 keys and 7 moves.
        let mut ts = 0;
        for i in 0..7u16 {
            opt.queue_event(mv(ts));
            ts += 1;
            if i < 5 {
                opt.queue_event(key(ts, 100 + i));
                ts += 1;
            }
        }
        let batch = opt.get_batch();
        assert_eq!(batch.len(), 12);

        let (discrete, continuous) = batch.events.split_at(5);
        let codes: Vec<_> = discrete
            .iter()
            .map(|e| match e.kind {
                InputEventKind::Key { code, .. } => code,
                _ => panic!("expected key, got {:?}", e.kind),
            })
            .collect();
        assert_eq!(codes, vec![100, 101, 102, 103, 104]);
        assert!(continuous.iter().all(InputEvent::is_continuous));
        let stamps: Vec<_> = continuous.iter().map(|e| e.timestamp_us).collect();
        let mut sorted = stamps.clone();
        sorted.sort_unstable();
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn batch_clears_queue() {
        let opt = InputOptimizer::new(8, 16);
        opt.queue_event(key(0, 1));
        assert_eq!(opt.pending(), 1);
        assert_eq!(opt.get_batch().len(), 1);
        assert_eq!(opt.pending(), 0);
        assert!(opt.get_batch().is_empty());
    }

    #[test]
    fn overflow_drops_oldest_pointer_move_first() {
        let opt = InputOptimizer::new(3, 16);
        opt.queue_event(key(0, 1));
        opt.queue_event(mv(1));
        opt.queue_event(mv(2));
        assert!(opt.queue_event(key(3, 2)));

        let batch = opt.get_batch();
        let stamps: Vec<_> = batch.events.iter().map(|e| e.timestamp_us).collect();
        assert_eq!(stamps, vec![0, 3, 2]);
        assert_eq!(opt.stats().dropped, 1);
    }

    #[test]
    fn pointer_move_dropped_when_queue_is_all_discrete() {
        let opt = InputOptimizer::new(2, 16);
        opt.queue_event(key(0, 1));
        opt.queue_event(key(1, 2));
        assert!(!opt.queue_event(mv(2)));
        let batch = opt.get_batch();
        assert_eq!(batch.len(), 2);
        assert!(batch.events.iter().all(|e| !e.is_continuous()));
    }

    #[test]
    fn discrete_overflow_evicts_oldest_discrete() {
        let opt = InputOptimizer::new(2, 16);
        opt.queue_event(key(0, 1));
        opt.queue_event(key(1, 2));
        assert!(opt.queue_event(InputEvent::pointer_down(2, 0, 0, PointerButton::Left, 1)));
        let stamps: Vec<_> = opt.get_batch().events.iter().map(|e| e.timestamp_us).collect();
        assert_eq!(stamps, vec![1, 2]);
    }

    #[test]
    fn latency_requirement() {
        let opt = InputOptimizer::new(8, 16);
        assert!(!opt.meets_latency_requirement());

        for _ in 0..10 {
            opt.record_latency(50.0);
        }
        assert!(opt.meets_latency_requirement());

        for _ in 0..10 {
            opt.record_latency(150.0);
        }
        assert!(!opt.meets_latency_requirement());
    }

    #[test]
    fn concurrent_producers_lose_nothing_below_capacity() {
        let opt = Arc::new(InputOptimizer::new(10_000, 16));
        let producers: Vec<_> = (0..4u64)
            .map(|p| {
                let opt = Arc::clone(&opt);
                std::thread::spawn(move || {
                    for i in 0..500u64 {
                        opt.queue_event(key(p * 1_000 + i, p as u16));
                    }
                })
            })
            .collect();

        let mut seen = 0;
        for _ in 0..50 {
            seen += opt.get_batch().len();
        }
        for p in producers {
            p.join().unwrap();
        }
        seen += opt.get_batch().len();
        assert_eq!(seen, 2_000);
    }
}
