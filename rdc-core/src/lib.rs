//! # rdc-core
//!
//! Real-time control loop of the RDC remote desktop client.
//!
//! This crate contains:
//! - **Session**: `PerformanceCoordinator` tying frame buffering, bitrate
//!   adaptation and input dispatch to one monitored session
//! - **Frames**: `FrameBufferManager` (drop-oldest) over a `BufferPool`
//! - **Bitrate**: `TransmissionOptimizer`, `ConnectionQuality`
//! - **Input**: `InputOptimizer`, `GestureTranslator`, `CoordinateMapper`
//! - **Codec**: `ControlCodec` for framed control traffic via `tokio_util`
//! - **Config**: `SessionConfig` and its per-component sections
//! - **Error**: `RdcError`, a `thiserror`-based error enum

pub mod codec;
pub mod config;
pub mod error;
pub mod input;
pub mod message;
pub mod ring;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{ClientCodec, ControlCodec, MAX_PAYLOAD_SIZE, RemoteCodec, frame_message};
pub use config::{
    BitrateConfig, FrameConfig, GestureConfig, InputConfig, MonitorConfig, SessionConfig,
};
pub use error::RdcError;
pub use input::{
    CoordinateMapper, GestureTranslator, InputBatch, InputEvent, InputEventKind, InputOptimizer,
    KeyModifiers, PointerButton, RawInput, RemoteViewport,
};
pub use message::{ControlMessage, InboundMessage};
pub use ring::{RingBuffer, SampleWindow};
pub use session::{
    BitrateDecision, BufferPool, ChannelTransport, ConnectionQuality, Frame, FrameBufferManager,
    PerformanceCoordinator, PixelFormat, SessionHealth, TransmissionOptimizer, Transport,
};
