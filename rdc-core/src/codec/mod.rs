//! Length-prefixed, checksummed framing for the control channel.
//!
//! ```text
//! ┌────────┬──────────────┬──────────────┬───────────────────────┐
//! │ "RDC1" │ len: u32 LE  │ crc: u32 LE  │ bincode payload (len) │
//! └────────┴──────────────┴──────────────┴───────────────────────┘
//!   4 B        4 B            4 B             ≤ 64 KiB
//! ```
//!
//! `crc` is the first four bytes of the blake3 hash of the payload.

use std::marker::PhantomData;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::RdcError;
use crate::message::{ControlMessage, InboundMessage};

pub const MAGIC: [u8; 4] = *b"RDC1";
pub const HEADER_LEN: usize = 12;
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Codec used on the client: decodes telemetry, encodes control.
pub type ClientCodec = ControlCodec<InboundMessage>;
/// Codec used by the remote side (and test peers).
pub type RemoteCodec = ControlCodec<ControlMessage>;

/// `tokio_util` codec for the control channel.
///
/// Decodes frames into `D`; encodes any serializable item.
pub struct ControlCodec<D> {
    _decode: PhantomData<fn() -> D>,
}

impl<D> ControlCodec<D> {
    pub fn new() -> Self {
        Self {
            _decode: PhantomData,
        }
    }
}

impl<D> Default for ControlCodec<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> std::fmt::Debug for ControlCodec<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ControlCodec")
    }
}

fn checksum(payload: &[u8]) -> u32 {
    let hash = blake3::hash(payload);
    let b = hash.as_bytes();
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

impl<D: DeserializeOwned> Decoder for ControlCodec<D> {
    type Item = D;
    type Error = RdcError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }
        if src[..4] != MAGIC {
            return Err(RdcError::InvalidMagic);
        }

        let len = u32::from_le_bytes([src[4], src[5], src[6], src[7]]) as usize;
        if len > MAX_PAYLOAD_SIZE {
            return Err(RdcError::PayloadTooLarge {
                size: len,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        if src.len() < HEADER_LEN + len {
            src.reserve(HEADER_LEN + len - src.len());
            return Ok(None);
        }

        let expected = u32::from_le_bytes([src[8], src[9], src[10], src[11]]);
        src.advance(HEADER_LEN);
        let payload = src.split_to(len);
        if checksum(&payload) != expected {
            return Err(RdcError::ChecksumMismatch);
        }

        Ok(Some(bincode::deserialize(&payload)?))
    }
}

impl<D, E: Serialize> Encoder<E> for ControlCodec<D> {
    type Error = RdcError;

    fn encode(&mut self, item: E, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = bincode::serialize(&item)?;
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(RdcError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        dst.reserve(HEADER_LEN + payload.len());
        dst.put_slice(&MAGIC);
        dst.put_u32_le(payload.len() as u32);
        dst.put_u32_le(checksum(&payload));
        dst.put_slice(&payload);
        Ok(())
    }
}

/// Frame a single control message into a send buffer.
pub fn frame_message(message: &ControlMessage) -> Result<Bytes, RdcError> {
    let mut buf = BytesMut::new();
    ClientCodec::new().encode(message, &mut buf)?;
    Ok(buf.freeze())
}
