//! Session performance core.
//!
//! | Module         | Role                                                |
//! |----------------|-----------------------------------------------------|
//! | `types`        | `Frame`, `PixelFormat`                              |
//! | `pool`         | `BufferPool<T>`: reusable payload buffers           |
//! | `frame_buffer` | `FrameBufferManager`: drop-oldest frame queue       |
//! | `transmission` | `TransmissionOptimizer`: adaptive bitrate           |
//! | `quality`      | `ConnectionQuality` label from RTT and loss         |
//! | `transport`    | `Transport` seam + in-process `ChannelTransport`    |
//! | `coordinator`  | `PerformanceCoordinator`: the monitored session     |
//!
//! ## Data flow
//!
//! ```text
//!  decoder ─► acquire_buffer ─► push_frame ─► FrameBufferManager ─► pop_frame ─► renderer
//!                  ▲                               │ evicted                        │
//!                  └───────── BufferPool ◄─────────┴────────── recycle_frame ◄──────┘
//!
//!  RawInput ─► GestureTranslator ─► InputOptimizer ─► dispatch loop ─► Transport::send
//!  Transport::subscribe ─► telemetry loop ─► TransmissionOptimizer ─► adapt loop ─► BitrateRequest
//! ```

pub mod coordinator;
pub mod frame_buffer;
pub mod pool;
pub mod quality;
pub mod transmission;
pub mod transport;
pub mod types;

pub use coordinator::{PerformanceCoordinator, SessionHealth};
pub use frame_buffer::{FrameBufferManager, FrameBufferStats};
pub use pool::{BufferPool, PoolStats, Reusable};
pub use quality::ConnectionQuality;
pub use transmission::{BitrateDecision, TransmissionOptimizer};
pub use transport::{ChannelTransport, RemoteEnd, Transport};
pub use types::{Frame, PixelFormat};
