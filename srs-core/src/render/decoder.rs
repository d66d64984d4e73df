//! Frame decoding.
//!
//! Takes the opaque binary payload received from the stream server
//! and reconstructs a displayable image. The server emits JPEG;
//! decoding goes through format detection, so a PNG-emitting server
//! works unchanged.

use image::DynamicImage;

use crate::error::SrsError;

// ── DecodedFrame ─────────────────────────────────────────────────

/// A decoded frame ready for presentation.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// The decoded image.
    pub image: DynamicImage,
}

impl DecodedFrame {
    /// Decode one compressed frame payload.
    ///
    /// All intermediate decode buffers live inside this call; nothing
    /// is retained on failure.
    pub fn decode(data: &[u8]) -> Result<Self, SrsError> {
        let image = image::load_from_memory(data).map_err(|e| SrsError::Decode(e.to_string()))?;
        Ok(Self {
            width: image.width(),
            height: image.height(),
            image,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_compressed_payload() {
        let payload = png_bytes(8, 6);
        let frame = DecodedFrame::decode(&payload).unwrap();
        assert_eq!(frame.width, 8);
        assert_eq!(frame.height, 6);
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let err = DecodedFrame::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, SrsError::Decode(_)));
    }

    #[test]
    fn empty_payload_is_a_decode_error() {
        assert!(DecodedFrame::decode(&[]).is_err());
    }
}
