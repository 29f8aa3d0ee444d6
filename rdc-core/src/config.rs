//! Tuning knobs for a session.
//!
//! Every threshold the controllers use lives here instead of being
//! baked into the algorithms, so the values can be tuned per network
//! (and checked against recorded traces) without code changes. The
//! client embeds [`SessionConfig`] in its TOML file under `[session]`.

use serde::{Deserialize, Serialize};

use crate::error::RdcError;

/// Top-level session tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Frame queue and buffer pool.
    pub frames: FrameConfig,
    /// Adaptive bitrate controller.
    pub bitrate: BitrateConfig,
    /// Input batching.
    pub input: InputConfig,
    /// Touch gesture classification.
    pub gesture: GestureConfig,
    /// Coordinator loop timing.
    pub monitor: MonitorConfig,
}

/// Frame queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Frames held between decoder and renderer before drop-oldest.
    pub max_buffers: usize,
    /// Idle payload buffers kept by the pool.
    pub pool_buffers: usize,
    /// Initial capacity of a freshly allocated payload buffer.
    pub buffer_bytes: usize,
    /// Highest acceptable dropped/pushed ratio.
    pub max_drop_ratio: f64,
}

/// Adaptive bitrate settings. Bitrates are in bits per second.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BitrateConfig {
    pub min_bitrate: u64,
    pub max_bitrate: u64,
    /// Starting bitrate, clamped into `[min_bitrate, max_bitrate]`.
    pub target_bitrate: u64,
    /// Samples kept in each sliding window.
    pub window_size: usize,
    /// Average latency above which the bitrate is cut.
    pub high_latency_ms: f64,
    /// Average latency below which the bitrate may grow.
    pub low_latency_ms: f64,
    /// Multiplier applied on congestion (< 1).
    pub decrease_factor: f64,
    /// Multiplier applied when probing upward (> 1).
    pub increase_factor: f64,
    /// Measured bandwidth must exceed `current × headroom` to grow.
    pub bandwidth_headroom: f64,
    /// Growth never exceeds this share of measured bandwidth.
    pub bandwidth_utilization: f64,
}

/// Input batching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Events held between batch ticks.
    pub max_queue_size: usize,
    /// Batch tick period.
    pub batch_interval_ms: u64,
    /// Round-trip latency budget for dispatched batches.
    pub latency_budget_ms: f64,
    /// Samples in the rolling latency average.
    pub latency_window: usize,
}

/// Gesture classification thresholds (local screen pixels).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Touches held at least this long are long-presses.
    pub long_press_ms: u64,
    /// Displacement that turns a touch into a drag.
    pub drag_threshold_px: f64,
    /// Max gap between two taps forming a double-tap.
    pub double_tap_window_ms: u64,
    /// Max distance between two taps forming a double-tap.
    pub double_tap_distance_px: f64,
}

/// Coordinator loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Period of the bitrate adaptation loop.
    pub adapt_interval_ms: u64,
    /// Sent batches remembered for ack → latency matching.
    pub max_in_flight_batches: usize,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_buffers: 3,
            pool_buffers: 6,
            buffer_bytes: 1920 * 1080 * 4,
            max_drop_ratio: 0.05,
        }
    }
}

impl Default for BitrateConfig {
    fn default() -> Self {
        Self {
            min_bitrate: 500_000,
            max_bitrate: 20_000_000,
            target_bitrate: 4_000_000,
            window_size: 20,
            high_latency_ms: 150.0,
            low_latency_ms: 50.0,
            decrease_factor: 0.8,
            increase_factor: 1.1,
            bandwidth_headroom: 1.2,
            bandwidth_utilization: 0.9,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 256,
            batch_interval_ms: 16,
            latency_budget_ms: 100.0,
            latency_window: 10,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            long_press_ms: 500,
            drag_threshold_px: 10.0,
            double_tap_window_ms: 300,
            double_tap_distance_px: 30.0,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            adapt_interval_ms: 500,
            max_in_flight_batches: 64,
        }
    }
}

// ── Construction / validation ────────────────────────────────────

impl BitrateConfig {
    /// Default tuning with an explicit bitrate range.
    pub fn new(min_bitrate: u64, max_bitrate: u64, target_bitrate: u64) -> Self {
        Self {
            min_bitrate,
            max_bitrate,
            target_bitrate,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), RdcError> {
        if self.min_bitrate == 0 {
            return Err(RdcError::config("bitrate.min_bitrate", "must be positive"));
        }
        if self.min_bitrate > self.max_bitrate {
            return Err(RdcError::config(
                "bitrate.min_bitrate",
                format!(
                    "{} exceeds max_bitrate {}",
                    self.min_bitrate, self.max_bitrate
                ),
            ));
        }
        if self.window_size == 0 {
            return Err(RdcError::config("bitrate.window_size", "must be at least 1"));
        }
        if !(self.low_latency_ms.is_finite() && self.high_latency_ms.is_finite()) {
            return Err(RdcError::config(
                "bitrate.high_latency_ms",
                "latency thresholds must be finite",
            ));
        }
        if self.low_latency_ms >= self.high_latency_ms {
            return Err(RdcError::config(
                "bitrate.low_latency_ms",
                "must be below high_latency_ms",
            ));
        }
        if !(self.decrease_factor > 0.0 && self.decrease_factor < 1.0) {
            return Err(RdcError::config("bitrate.decrease_factor", "must be in (0, 1)"));
        }
        if !(self.increase_factor > 1.0 && self.increase_factor.is_finite()) {
            return Err(RdcError::config("bitrate.increase_factor", "must be above 1"));
        }
        if !(self.bandwidth_headroom >= 1.0 && self.bandwidth_headroom.is_finite()) {
            return Err(RdcError::config(
                "bitrate.bandwidth_headroom",
                "must be at least 1",
            ));
        }
        if !(self.bandwidth_utilization > 0.0 && self.bandwidth_utilization <= 1.0) {
            return Err(RdcError::config(
                "bitrate.bandwidth_utilization",
                "must be in (0, 1]",
            ));
        }
        Ok(())
    }
}

impl SessionConfig {
    /// Check every section; the first offending field is reported.
    pub fn validate(&self) -> Result<(), RdcError> {
        if self.frames.max_buffers == 0 {
            return Err(RdcError::config("frames.max_buffers", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.frames.max_drop_ratio) {
            return Err(RdcError::config("frames.max_drop_ratio", "must be in [0, 1]"));
        }
        self.bitrate.validate()?;
        if self.input.max_queue_size == 0 {
            return Err(RdcError::config("input.max_queue_size", "must be at least 1"));
        }
        if self.input.batch_interval_ms == 0 {
            return Err(RdcError::config("input.batch_interval_ms", "must be positive"));
        }
        if self.input.latency_window == 0 {
            return Err(RdcError::config("input.latency_window", "must be at least 1"));
        }
        if self.gesture.drag_threshold_px <= 0.0 {
            return Err(RdcError::config("gesture.drag_threshold_px", "must be positive"));
        }
        if self.monitor.adapt_interval_ms == 0 {
            return Err(RdcError::config("monitor.adapt_interval_ms", "must be positive"));
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
