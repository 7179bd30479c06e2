//! Screencast frame decoding
//!
//! Frames arrive as base64 JPEG or PNG. Painting only needs the encoded bytes and
//! the natural size, so only the header is read, pixels stay compressed.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageReader;
use protocol::ImageFormat;
use std::io::Cursor;
use std::sync::Arc;

use crate::error::{Result, ViewError};

/// An image ready to paint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Arc<[u8]>,
}

#[async_trait]
pub trait FrameDecoder: Send + Sync {
    async fn decode(&self, data: &str) -> Result<DecodedFrame>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Decoder;

#[async_trait]
impl FrameDecoder for Base64Decoder {
    async fn decode(&self, data: &str) -> Result<DecodedFrame> {
        let bytes = STANDARD.decode(data)?;
        let (format, width, height) = sniff(&bytes)?;
        Ok(DecodedFrame {
            format,
            width,
            height,
            bytes: bytes.into(),
        })
    }
}

/// Format and natural size from the header
pub fn sniff(bytes: &[u8]) -> Result<(ImageFormat, u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?;
    let format = match reader.format() {
        Some(image::ImageFormat::Png) => ImageFormat::Png,
        Some(image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
        Some(other) => return Err(ViewError::Decode(format!("{:?} frames", other))),
        None => return Err(ViewError::Decode("neither PNG nor JPEG".to_string())),
    };
    let (width, height) = reader.into_dimensions()?;
    Ok((format, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn encode(width: u32, height: u32, format: image::ImageFormat) -> String {
        let pixels = ImageBuffer::from_pixel(width, height, Rgb([40u8, 120, 200]));
        let mut bytes = Cursor::new(Vec::new());
        pixels.write_to(&mut bytes, format).unwrap();
        STANDARD.encode(bytes.into_inner())
    }

    #[tokio::test]
    async fn test_decode_png_size() {
        let data = encode(64, 36, image::ImageFormat::Png);
        let frame = Base64Decoder.decode(&data).await.unwrap();
        assert_eq!(frame.format, ImageFormat::Png);
        assert_eq!((frame.width, frame.height), (64, 36));
    }

    #[tokio::test]
    async fn test_decode_jpeg_size() {
        let data = encode(80, 60, image::ImageFormat::Jpeg);
        let frame = Base64Decoder.decode(&data).await.unwrap();
        assert_eq!(frame.format, ImageFormat::Jpeg);
        assert_eq!((frame.width, frame.height), (80, 60));
    }

    #[tokio::test]
    async fn test_decode_rejects_garbage() {
        assert!(matches!(
            Base64Decoder.decode("!!not base64!!").await,
            Err(ViewError::Base64(_))
        ));
        let text = STANDARD.encode(b"plain text, not an image");
        assert!(matches!(Base64Decoder.decode(&text).await, Err(ViewError::Decode(_))));
    }

    #[test]
    fn test_truncated_header() {
        assert!(matches!(
            sniff(&[0xFF, 0xD8, 0xFF, 0xC0, 0x00]),
            Err(ViewError::Image(_))
        ));
    }
}
