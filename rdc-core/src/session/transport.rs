//! The byte transport the session talks through.
//!
//! The session never owns a socket. It frames [`ControlMessage`]s into
//! [`Bytes`] and hands them to a [`Transport`], and it learns about the
//! link from the transport's inbound broadcast and connectivity watch.
//!
//! [`ChannelTransport`] is an in-process implementation backed by tokio
//! channels, used for loopback sessions and tests.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::codec::Decoder;
use tracing::warn;

use crate::codec::RemoteCodec;
use crate::error::RdcError;
use crate::message::{ControlMessage, InboundMessage};

/// Capacity of the inbound broadcast channel.
pub const INBOUND_CAPACITY: usize = 256;

// ── Transport ────────────────────────────────────────────────────

/// Secured byte channel to the remote peer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fire-and-forget send of one framed message. Returns `false` if
    /// the transport could not accept it; retry is the transport's job.
    async fn send(&self, bytes: Bytes) -> bool;

    /// Subscribe to decoded inbound messages.
    fn subscribe(&self) -> broadcast::Receiver<InboundMessage>;

    /// Connectivity flag, `true` while the link is up.
    fn connectivity(&self) -> watch::Receiver<bool>;

    fn is_connected(&self) -> bool {
        *self.connectivity().borrow()
    }
}

// ── ChannelTransport ─────────────────────────────────────────────

/// In-process [`Transport`]: outbound frames land in the paired
/// [`RemoteEnd`], which can also inject inbound messages and flip
/// connectivity.
pub struct ChannelTransport {
    outbound: mpsc::UnboundedSender<Bytes>,
    inbound: broadcast::Sender<InboundMessage>,
    connected: watch::Receiver<bool>,
}

/// Peer side of a [`ChannelTransport`].
pub struct RemoteEnd {
    outbound: mpsc::UnboundedReceiver<Bytes>,
    inbound: broadcast::Sender<InboundMessage>,
    connected: watch::Sender<bool>,
    codec: RemoteCodec,
}

impl ChannelTransport {
    /// Create a connected transport and its peer.
    pub fn pair() -> (Self, RemoteEnd) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, _) = broadcast::channel(INBOUND_CAPACITY);
        let (conn_tx, conn_rx) = watch::channel(true);
        (
            Self {
                outbound: out_tx,
                inbound: in_tx.clone(),
                connected: conn_rx,
            },
            RemoteEnd {
                outbound: out_rx,
                inbound: in_tx,
                connected: conn_tx,
                codec: RemoteCodec::new(),
            },
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, bytes: Bytes) -> bool {
        if !*self.connected.borrow() {
            return false;
        }
        self.outbound.send(bytes).is_ok()
    }

    fn subscribe(&self) -> broadcast::Receiver<InboundMessage> {
        self.inbound.subscribe()
    }

    fn connectivity(&self) -> watch::Receiver<bool> {
        self.connected.clone()
    }
}

impl RemoteEnd {
    /// Receive and decode the next outbound message. `None` once the
    /// transport is dropped.
    pub async fn recv(&mut self) -> Option<Result<ControlMessage, RdcError>> {
        let bytes = self.outbound.recv().await?;
        Some(self.decode(bytes))
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<Result<ControlMessage, RdcError>> {
        let bytes = self.outbound.try_recv().ok()?;
        Some(self.decode(bytes))
    }

    /// Deliver a message to every subscriber. Returns the number of
    /// receivers reached.
    pub fn inject(&self, message: InboundMessage) -> usize {
        self.inbound.send(message).unwrap_or(0)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.send_replace(connected);
    }

    fn decode(&mut self, bytes: Bytes) -> Result<ControlMessage, RdcError> {
        let mut buf = BytesMut::from(&bytes[..]);
        match self.codec.decode(&mut buf)? {
            Some(message) => Ok(message),
            None => {
                warn!(len = bytes.len(), "truncated frame on channel transport");
                Err(RdcError::Encoding("truncated frame".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::frame_message;

    #[tokio::test]
    async fn frames_reach_remote_end() {
        let (transport, mut remote) = ChannelTransport::pair();
        let msg = ControlMessage::BitrateRequest {
            bitrate_bps: 3_200_000,
        };
        assert!(transport.send(frame_message(&msg).unwrap()).await);
        assert_eq!(remote.recv().await.unwrap().unwrap(), msg);
    }

    #[tokio::test]
    async fn disconnected_transport_refuses_sends() {
        let (transport, mut remote) = ChannelTransport::pair();
        remote.set_connected(false);
        assert!(!transport.is_connected());
        let msg = ControlMessage::Heartbeat { sequence: 1 };
        assert!(!transport.send(frame_message(&msg).unwrap()).await);
        assert!(remote.try_recv().is_none());
    }

    #[tokio::test]
    async fn injected_messages_fan_out() {
        let (transport, remote) = ChannelTransport::pair();
        let mut a = transport.subscribe();
        let mut b = transport.subscribe();
        assert_eq!(remote.inject(InboundMessage::BatchAck { sequence: 4 }), 2);
        assert_eq!(a.recv().await.unwrap(), InboundMessage::BatchAck { sequence: 4 });
        assert_eq!(b.recv().await.unwrap(), InboundMessage::BatchAck { sequence: 4 });
    }
}
