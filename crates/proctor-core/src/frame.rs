//! The `Frame` data type: an opaque pixel grid plus a monotonic capture
//! timestamp and a substream tag. The engine never stores frames beyond
//! the single detector call that consumes them.

use crate::error::{ProctorError, Result};
use base64::{engine::general_purpose, Engine as _};
use std::time::Instant;

/// Which of the two synchronized substreams a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Substream {
    Camera,
    Screen,
}

impl Substream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Substream::Camera => "camera",
            Substream::Screen => "screen",
        }
    }
}

/// A single decoded video frame: a luminance-convertible pixel grid, its
/// dimensions, a monotonic capture instant, and the substream it arrived
/// on. Grayscale luminance bytes are reconstructed lazily by the
/// consuming adapter so this type stays format-agnostic.
#[derive(Debug, Clone)]
pub struct Frame {
    pub substream: Substream,
    pub width: usize,
    pub height: usize,
    /// Raw decoded bytes (RGB8, row-major) backing this frame.
    pub pixels: Vec<u8>,
    pub captured_at: Instant,
}

impl Frame {
    /// Decode a data-URL style payload (`"data:image/...;base64,<payload>"`)
    /// into a `Frame`. The decoder splits on the first comma and
    /// base64-decodes the remainder, per the ingress contract. Decode
    /// failure is a `ProctorError::FrameDecode`; the caller is expected to
    /// log and drop the frame rather than propagate further (frames are
    /// lossy).
    ///
    /// This does not perform real image-container decoding (PNG/JPEG) —
    /// it treats the payload bytes as an already-flat RGB8 buffer of
    /// `width * height * 3` bytes, which is what the synthetic and test
    /// producers in this crate emit. A production deployment would route
    /// the decoded bytes through an image-decoding crate before handing
    /// them to the vision adapters; that step lives behind the same
    /// `CameraVision` / `ScreenVision` trait boundary and is out of scope
    /// here.
    pub fn decode_data_url(
        substream: Substream,
        data_url: &str,
        width: usize,
        height: usize,
    ) -> Result<Self> {
        let (_, payload) = data_url
            .split_once(',')
            .ok_or_else(|| ProctorError::FrameDecode("missing comma separator".into()))?;

        let pixels = general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| ProctorError::FrameDecode(e.to_string()))?;

        let expected = width * height * 3;
        if pixels.len() < expected {
            return Err(ProctorError::FrameDecode(format!(
                "payload too short: got {} bytes, expected {}",
                pixels.len(),
                expected
            )));
        }

        Ok(Self {
            substream,
            width,
            height,
            pixels,
            captured_at: Instant::now(),
        })
    }

    /// Construct a frame directly from an already-decoded RGB8 buffer.
    pub fn from_rgb8(substream: Substream, width: usize, height: usize, pixels: Vec<u8>) -> Self {
        Self {
            substream,
            width,
            height,
            pixels,
            captured_at: Instant::now(),
        }
    }

    /// Luminance (Rec. 601) for pixel `(x, y)`, as a byte in `[0, 255]`.
    pub fn luminance_at(&self, x: usize, y: usize) -> u8 {
        let idx = (y * self.width + x) * 3;
        let r = self.pixels[idx] as f32;
        let g = self.pixels[idx + 1] as f32;
        let b = self.pixels[idx + 2] as f32;
        (0.299 * r + 0.587 * g + 0.114 * b) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_url_roundtrip() {
        let pixels = vec![128u8; 4 * 4 * 3];
        let encoded = general_purpose::STANDARD.encode(&pixels);
        let data_url = format!("data:image/rgb8;base64,{encoded}");

        let frame = Frame::decode_data_url(Substream::Camera, &data_url, 4, 4).unwrap();
        assert_eq!(frame.width, 4);
        assert_eq!(frame.height, 4);
        assert_eq!(frame.luminance_at(0, 0), 128);
    }

    #[test]
    fn test_decode_data_url_missing_comma() {
        let err = Frame::decode_data_url(Substream::Camera, "not-a-data-url", 4, 4).unwrap_err();
        assert!(matches!(err, ProctorError::FrameDecode(_)));
    }

    #[test]
    fn test_decode_data_url_short_payload() {
        let encoded = general_purpose::STANDARD.encode(b"too short");
        let data_url = format!("data:image/rgb8;base64,{encoded}");
        let err = Frame::decode_data_url(Substream::Camera, &data_url, 10, 10).unwrap_err();
        assert!(matches!(err, ProctorError::FrameDecode(_)));
    }
}
