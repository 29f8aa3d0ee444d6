//! Closed-loop adaptive bitrate controller.
//!
//! Latency and bandwidth samples arrive from the transport's network
//! reports and land in fixed-size sliding windows. Each call to
//! [`adapt_bitrate`](TransmissionOptimizer::adapt_bitrate) looks at
//! the window averages and nudges the requested bitrate:
//!
//! ```text
//!   avg latency > high threshold            → current × decrease  (fast down)
//!   avg latency < low threshold
//!     and avg bandwidth > current × headroom → current × increase  (slow up)
//!   otherwise                                → hold
//! ```
//!
//! Cutting multiplicatively while growing in small capped steps keeps
//! the stream interactive under congestion without oscillating once
//! the link recovers.

use serde::Serialize;
use tracing::debug;

use crate::config::BitrateConfig;
use crate::error::RdcError;
use crate::ring::SampleWindow;

// ── BitrateDecision ──────────────────────────────────────────────

/// What the last adaptation step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BitrateDecision {
    Decrease,
    Increase,
    Hold,
}

// ── TransmissionOptimizer ────────────────────────────────────────

/// Adaptive bitrate controller.
///
/// Single writer: callers that collect samples from several sources
/// serialize them (the coordinator keeps the optimizer behind a
/// mutex).
#[derive(Debug, Clone)]
pub struct TransmissionOptimizer {
    config: BitrateConfig,
    current_bitrate: u64,
    latency_ms: SampleWindow,
    bandwidth_bps: SampleWindow,
    last_decision: BitrateDecision,
}

impl TransmissionOptimizer {
    /// Default tuning with the given range; `target_bitrate` is clamped
    /// into `[min_bitrate, max_bitrate]`.
    pub fn new(min_bitrate: u64, max_bitrate: u64, target_bitrate: u64) -> Result<Self, RdcError> {
        Self::with_config(BitrateConfig::new(min_bitrate, max_bitrate, target_bitrate))
    }

    pub fn with_config(config: BitrateConfig) -> Result<Self, RdcError> {
        config.validate()?;
        Ok(Self {
            current_bitrate: config
                .target_bitrate
                .clamp(config.min_bitrate, config.max_bitrate),
            latency_ms: SampleWindow::new(config.window_size),
            bandwidth_bps: SampleWindow::new(config.window_size),
            last_decision: BitrateDecision::Hold,
            config,
        })
    }

    /// Record a latency sample in milliseconds.
    pub fn record_latency(&mut self, ms: f64) {
        if ms.is_finite() && ms >= 0.0 {
            self.latency_ms.record(ms);
        }
    }

    /// Record a bandwidth sample in bits per second.
    pub fn record_bandwidth(&mut self, bps: f64) {
        if bps.is_finite() && bps >= 0.0 {
            self.bandwidth_bps.record(bps);
        }
    }

    /// Run one adaptation step and return the new bitrate.
    pub fn adapt_bitrate(&mut self) -> u64 {
        let Some(avg_latency) = self.latency_ms.mean() else {
            self.last_decision = BitrateDecision::Hold;
            return self.current_bitrate;
        };
        let avg_bandwidth = self.bandwidth_bps.mean().unwrap_or(0.0);
        let cfg = &self.config;
        let current = self.current_bitrate as f64;
        let previous = self.current_bitrate;

        let (next, decision) = if avg_latency > cfg.high_latency_ms {
            (current * cfg.decrease_factor, BitrateDecision::Decrease)
        } else if avg_latency < cfg.low_latency_ms
            && avg_bandwidth > current * cfg.bandwidth_headroom
        {
            let ceiling = (avg_bandwidth * cfg.bandwidth_utilization).min(cfg.max_bitrate as f64);
            let grown = (current * cfg.increase_factor).min(ceiling).max(current);
            (grown, BitrateDecision::Increase)
        } else {
            (current, BitrateDecision::Hold)
        };

        self.current_bitrate = (next.round() as u64).clamp(cfg.min_bitrate, cfg.max_bitrate);
        self.last_decision = if self.current_bitrate == previous {
            BitrateDecision::Hold
        } else {
            decision
        };

        if self.current_bitrate != previous {
            debug!(
                from = previous,
                to = self.current_bitrate,
                avg_latency_ms = avg_latency,
                avg_bandwidth_bps = avg_bandwidth,
                decision = ?self.last_decision,
                "bitrate adapted"
            );
        }
        self.current_bitrate
    }

    pub fn current_bitrate(&self) -> u64 {
        self.current_bitrate
    }

    /// Average latency over the window, 0 before any sample.
    pub fn avg_latency(&self) -> f64 {
        self.latency_ms.mean().unwrap_or(0.0)
    }

    /// Average bandwidth over the window, 0 before any sample.
    pub fn avg_bandwidth(&self) -> f64 {
        self.bandwidth_bps.mean().unwrap_or(0.0)
    }

    pub fn last_decision(&self) -> BitrateDecision {
        self.last_decision
    }

    /// `(latency samples, bandwidth samples)` currently in the windows.
    pub fn sample_counts(&self) -> (usize, usize) {
        (self.latency_ms.len(), self.bandwidth_bps.len())
    }

    pub fn min_bitrate(&self) -> u64 {
        self.config.min_bitrate
    }

    pub fn max_bitrate(&self) -> u64 {
        self.config.max_bitrate
    }

    pub fn config(&self) -> &BitrateConfig {
        &self.config
    }
}

// ── Tests ────────────────────────────────────────────────────────
