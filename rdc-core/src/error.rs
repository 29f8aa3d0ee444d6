//! Domain-specific error types for the session core.
//!
//! Expected runtime conditions (empty frame queue, full input queue,
//! disconnected transport) are *not* errors: they surface as `bool` or
//! `Option` outcomes. `RdcError` covers setup and framing failures only.

use thiserror::Error;

/// The canonical error type for the session core.
#[derive(Debug, Error)]
pub enum RdcError {
    // ── Configuration Errors ─────────────────────────────────────
    /// A configuration value is outside its accepted range.
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    // ── Framing Errors ───────────────────────────────────────────
    /// Received bytes that do not start with the `RDC1` magic.
    #[error("invalid magic bytes: expected RDC1")]
    InvalidMagic,

    /// The frame payload failed checksum verification.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// The payload exceeds the codec limit.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    // ── Runtime Errors ───────────────────────────────────────────
    /// The TCP/UDP/IO layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// `start()` was called outside a Tokio runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding or decoding of a payload failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl RdcError {
    /// Shorthand for [`RdcError::InvalidConfig`].
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        RdcError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for RdcError {
    fn from(s: String) -> Self {
        RdcError::Other(s)
    }
}

impl From<&str> for RdcError {
    fn from(s: &str) -> Self {
        RdcError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for RdcError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        RdcError::ChannelClosed
    }
}

impl From<Box<bincode::ErrorKind>> for RdcError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        RdcError::Encoding(e.to_string())
    }
}

impl From<serde_json::Error> for RdcError {
    fn from(e: serde_json::Error) -> Self {
        RdcError::Encoding(e.to_string())
    }
}
