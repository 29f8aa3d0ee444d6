//! Shared frame types for the decode → render pipeline.
//!
//! These are **internal** representations handed from the decoder
//! collaborator to the renderer. Nothing here travels over the wire.

use std::time::Instant;

use serde::{Deserialize, Serialize};

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 4 bytes per pixel: Blue, Green, Red, Alpha.
    Bgra8,
    /// 4 bytes per pixel: Red, Green, Blue, Alpha.
    Rgba8,
    /// 3 bytes per pixel: Red, Green, Blue.
    Rgb8,
    /// Planar 4:2:0: a full-resolution luma plane followed by an
    /// interleaved half-resolution chroma plane.
    Nv12,
}

impl PixelFormat {
    /// Bytes consumed by a single pixel of the first plane.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Nv12 => 1,
        }
    }

    /// Bytes needed for a tightly packed `width × height` image.
    pub const fn frame_size(self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            PixelFormat::Nv12 => pixels + pixels / 2,
            _ => pixels * self.bytes_per_pixel(),
        }
    }
}

// ── Frame ────────────────────────────────────────────────────────

/// A decoded frame waiting to be rendered.
///
/// `payload` is a pooled buffer: once the renderer is done with the
/// frame it should go back through
/// [`FrameBufferManager::recycle`](crate::session::FrameBufferManager::recycle)
/// so the allocation is reused.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Monotonic sequence number assigned by the decoder.
    pub id: u64,
    /// When the frame was captured on the remote side (local clock).
    pub capture_timestamp: Instant,
    /// Decoded pixel data.
    pub payload: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel layout of `payload`.
    pub pixel_format: PixelFormat,
}

impl Frame {
    pub fn new(
        id: u64,
        payload: Vec<u8>,
        width: u32,
        height: u32,
        pixel_format: PixelFormat,
    ) -> Self {
        Self {
            id,
            capture_timestamp: Instant::now(),
            payload,
            width,
            height,
            pixel_format,
        }
    }

    /// Size of the payload in bytes.
    pub fn byte_len(&self) -> usize {
        self.payload.len()
    }
}
