//! Control-channel message types.
//!
//! [`ControlMessage`] flows client → remote, [`InboundMessage`] flows
//! remote → client. Both are serialized with bincode and framed by
//! [`ControlCodec`](crate::codec::ControlCodec).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RdcError;
use crate::input::event::InputBatch;

// ── ControlMessage ───────────────────────────────────────────────

/// Outbound control traffic produced by the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlMessage {
    /// One batch tick worth of priority-ordered input.
    InputBatch(InputBatch),
    /// Ask the remote encoder to target a new bitrate.
    BitrateRequest { bitrate_bps: u64 },
    /// Keep-alive.
    Heartbeat { sequence: u64 },
}

impl ControlMessage {
    pub fn to_bytes(&self) -> Result<Vec<u8>, RdcError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RdcError> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::InputBatch(_) => "InputBatch",
            ControlMessage::BitrateRequest { .. } => "BitrateRequest",
            ControlMessage::Heartbeat { .. } => "Heartbeat",
        }
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMessage::InputBatch(batch) => {
                write!(f, "InputBatch(#{}, {} events)", batch.sequence, batch.len())
            }
            ControlMessage::BitrateRequest { bitrate_bps } => {
                write!(f, "BitrateRequest({bitrate_bps} bps)")
            }
            ControlMessage::Heartbeat { sequence } => write!(f, "Heartbeat(#{sequence})"),
        }
    }
}

// ── InboundMessage ───────────────────────────────────────────────

/// Telemetry and notifications delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InboundMessage {
    /// The remote side applied input batch `sequence`.
    BatchAck { sequence: u64 },
    /// Periodic link measurement.
    NetworkReport {
        rtt_ms: f64,
        bandwidth_bps: f64,
        packet_loss_pct: f64,
    },
    /// The remote desktop changed resolution.
    ViewportChanged { remote_width: u32, remote_height: u32 },
}

impl InboundMessage {
    pub fn to_bytes(&self) -> Result<Vec<u8>, RdcError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RdcError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
