//! Four-level connection quality label for the monitoring layer.

use std::fmt;

use serde::Serialize;

/// Coarse connection quality derived from RTT and packet loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl ConnectionQuality {
    /// Classify a link.
    ///
    /// | label     | RTT      | loss  |
    /// |-----------|----------|-------|
    /// | excellent | < 50 ms  | < 1 % |
    /// | good      | < 100 ms | < 3 % |
    /// | fair      | < 200 ms | < 5 % |
    /// | poor      | any      | any   |
    ///
    /// A link must satisfy both bounds of a row to earn its label.
    pub fn from_metrics(rtt_ms: f64, packet_loss_pct: f64) -> Self {
        if rtt_ms < 50.0 && packet_loss_pct < 1.0 {
            ConnectionQuality::Excellent
        } else if rtt_ms < 100.0 && packet_loss_pct < 3.0 {
            ConnectionQuality::Good
        } else if rtt_ms < 200.0 && packet_loss_pct < 5.0 {
            ConnectionQuality::Fair
        } else {
            ConnectionQuality::Poor
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionQuality::Excellent => "excellent",
            ConnectionQuality::Good => "good",
            ConnectionQuality::Fair => "fair",
            ConnectionQuality::Poor => "poor",
        }
    }
}

impl fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
