//! UDP control transport.
//!
//! Outbound frames are already encoded by the session, so sending is a
//! plain `send` on a connected socket. Each inbound datagram carries one
//! frame; a background task decodes it with [`ClientCodec`] and fans
//! the message out on a broadcast channel.
//!
//! UDP has no connection state: the link is reported up after any
//! datagram arrives and down after `timeout` of silence or a failed
//! send.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, watch};
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rdc_core::codec::{HEADER_LEN, MAX_PAYLOAD_SIZE};
use rdc_core::session::transport::INBOUND_CAPACITY;
use rdc_core::{ClientCodec, InboundMessage, RdcError, Transport};

/// Largest datagram the receive loop accepts.
const MAX_DATAGRAM: usize = HEADER_LEN + MAX_PAYLOAD_SIZE;

/// [`Transport`] over a connected UDP socket.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    inbound: broadcast::Sender<InboundMessage>,
    connected: Arc<watch::Sender<bool>>,
    cancel: CancellationToken,
}

impl UdpTransport {
    /// Bind `bind`, connect to `remote` and start the receive task.
    pub async fn connect(bind: &str, remote: &str, timeout: Duration) -> Result<Self, RdcError> {
        let remote: SocketAddr = remote
            .parse()
            .map_err(|e| RdcError::config("network.remote_address", format!("{e}")))?;
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(remote).await?;
        let socket = Arc::new(socket);
        info!(local = %socket.local_addr()?, %remote, "control socket ready");

        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
        let (connected, _) = watch::channel(true);
        let connected = Arc::new(connected);
        let cancel = CancellationToken::new();

        tokio::spawn(receive_loop(
            Arc::clone(&socket),
            inbound.clone(),
            Arc::clone(&connected),
            timeout,
            cancel.clone(),
        ));

        Ok(Self {
            socket,
            inbound,
            connected,
            cancel,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RdcError> {
        Ok(self.socket.local_addr()?)
    }

    /// Stop the receive task.
    pub fn close(&self) {
        self.cancel.cancel();
        self.connected.send_replace(false);
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, bytes: Bytes) -> bool {
        match self.socket.send(&bytes).await {
            Ok(_) => true,
            Err(e) => {
                warn!("udp send failed: {e}");
                self.connected.send_replace(false);
                false
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<InboundMessage> {
        self.inbound.subscribe()
    }

    fn connectivity(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    inbound: broadcast::Sender<InboundMessage>,
    connected: Arc<watch::Sender<bool>>,
    timeout: Duration,
    cancel: CancellationToken,
) {
    let mut codec = ClientCodec::new();
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = tokio::time::timeout(timeout, socket.recv(&mut buf)) => match received {
                Err(_) => {
                    if connected.send_replace(false) {
                        warn!(timeout_ms = timeout.as_millis() as u64, "remote silent; link down");
                    }
                }
                Ok(Err(e)) => {
                    warn!("udp recv failed: {e}");
                    connected.send_replace(false);
                }
                Ok(Ok(n)) => {
                    let mut frame = BytesMut::from(&buf[..n]);
                    match codec.decode(&mut frame) {
                        Ok(Some(message)) => {
                            if !connected.send_replace(true) {
                                info!("link up");
                            }
                            // No subscribers is not an error.
                            let _ = inbound.send(message);
                        }
                        Ok(None) => debug!(len = n, "dropping truncated datagram"),
                        Err(e) => debug!("dropping bad datagram: {e}"),
                    }
                }
            },
        }
    }
    debug!("udp receive loop stopped");
}
