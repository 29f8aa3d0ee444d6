//! Offline replay of recorded network traces through the bitrate
//! controller.
//!
//! A trace is JSON lines, one measurement per line:
//!
//! ```text
//! {"rtt_ms": 42.0, "bandwidth_bps": 9500000, "packet_loss_pct": 0.3}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Replaying prints
//! the bitrate the controller would have requested after each step, so
//! tuning changes can be checked against real links before shipping.

use std::io::BufRead;

use serde::{Deserialize, Serialize};

use rdc_core::{BitrateConfig, BitrateDecision, ConnectionQuality, RdcError, TransmissionOptimizer};

/// One recorded measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceSample {
    pub rtt_ms: f64,
    pub bandwidth_bps: f64,
    #[serde(default)]
    pub packet_loss_pct: f64,
}

/// Controller state after one adaptation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReplayStep {
    /// Index of the last sample fed before this step.
    pub sample: usize,
    pub bitrate_bps: u64,
    pub decision: BitrateDecision,
    pub avg_latency_ms: f64,
    pub avg_bandwidth_bps: f64,
    pub quality: ConnectionQuality,
}

/// Parse a JSON-lines trace.
pub fn parse_trace<R: BufRead>(reader: R) -> Result<Vec<TraceSample>, RdcError> {
    let mut samples = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let sample: TraceSample = serde_json::from_str(line)
            .map_err(|e| RdcError::Encoding(format!("trace line {}: {e}", lineno + 1)))?;
        samples.push(sample);
    }
    Ok(samples)
}

/// Feed `samples` through a fresh controller, adapting after every
/// `adapt_every` samples (and once more at the end if samples remain).
pub fn replay(
    samples: &[TraceSample],
    config: &BitrateConfig,
    adapt_every: usize,
) -> Result<Vec<ReplayStep>, RdcError> {
    let adapt_every = adapt_every.max(1);
    let mut optimizer = TransmissionOptimizer::with_config(config.clone())?;
    let mut steps = Vec::with_capacity(samples.len() / adapt_every + 1);

    for (i, sample) in samples.iter().enumerate() {
        optimizer.record_latency(sample.rtt_ms);
        optimizer.record_bandwidth(sample.bandwidth_bps);
        let last = i + 1 == samples.len();
        if (i + 1) % adapt_every == 0 || last {
            let bitrate_bps = optimizer.adapt_bitrate();
            steps.push(ReplayStep {
                sample: i,
                bitrate_bps,
                decision: optimizer.last_decision(),
                avg_latency_ms: optimizer.avg_latency(),
                avg_bandwidth_bps: optimizer.avg_bandwidth(),
                quality: ConnectionQuality::from_metrics(sample.rtt_ms, sample.packet_loss_pct),
            });
        }
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TRACE: &str = r#"
# congested start
{"rtt_ms": 220.0, "bandwidth_bps": 3000000, "packet_loss_pct": 4.0}
{"rtt_ms": 210.0, "bandwidth_bps": 3000000, "packet_loss_pct": 4.5}

{"rtt_ms": 20.0, "bandwidth_bps": 12000000}
"#;

    #[test]
    fn parses_trace_with_comments_and_defaults() {
        let samples = parse_trace(Cursor::new(TRACE)).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].packet_loss_pct, 4.0);
        assert_eq!(samples[2].packet_loss_pct, 0.0);
    }

    #[test]
    fn bad_line_reports_its_number() {
        let err = parse_trace(Cursor::new("{\"rtt_ms\": 1.0, \"bandwidth_bps\": 2.0}\nnope\n"))
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn congestion_then_recovery() {
        let samples = parse_trace(Cursor::new(TRACE)).unwrap();
        let config = BitrateConfig::new(500_000, 10_000_000, 4_000_000);
        let steps = replay(&samples, &config, 1).unwrap();

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].decision, BitrateDecision::Decrease);
        assert_eq!(steps[0].bitrate_bps, 3_200_000);
        assert_eq!(steps[1].bitrate_bps, 2_560_000);
        assert_eq!(steps[1].quality, ConnectionQuality::Poor);
        // Window average is still (220 + 210 + 20) / 3 = 150, not above
        // the high threshold and not below the low one.
        assert_eq!(steps[2].decision, BitrateDecision::Hold);
    }

    #[test]
    fn every_step_stays_in_range() {
        let samples: Vec<_> = (0..500)
            .map(|i| TraceSample {
                rtt_ms: if (i / 50) % 2 == 0 { 300.0 } else { 10.0 },
                bandwidth_bps: 50_000_000.0,
                packet_loss_pct: 0.0,
            })
            .collect();
        let config = BitrateConfig::new(500_000, 10_000_000, 4_000_000);
        for step in replay(&samples, &config, 5).unwrap() {
            assert!((500_000..=10_000_000).contains(&step.bitrate_bps));
        }
    }
}
