// SPDX-License-Identifier: GPL-3.0-only

//! Async JPEG encoding and media store writes
//!
//! Both stages are CPU or I/O bound and run on the blocking pool.

use crate::backends::camera::types::CameraFrame;
use crate::errors::CaptureError;
use crate::session::OutputFileOptions;
use crate::storage::MediaDestination;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Encoding quality settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncodingQuality {
    /// Low quality (high compression)
    Low,
    /// Medium quality (balanced)
    Medium,
    /// High quality (low compression)
    #[default]
    High,
    /// Maximum quality (minimal compression)
    Maximum,
}

impl EncodingQuality {
    /// Get JPEG quality value (0-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            EncodingQuality::Low => 60,
            EncodingQuality::Medium => 80,
            EncodingQuality::High => 92,
            EncodingQuality::Maximum => 98,
        }
    }
}

/// Encoded image data ready for saving
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// JPEG encoder
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    quality: EncodingQuality,
}

impl PhotoEncoder {
    pub fn new(quality: EncodingQuality) -> Self {
        Self { quality }
    }

    /// Encode a camera frame as JPEG
    pub async fn encode(&self, frame: Arc<CameraFrame>) -> Result<EncodedImage, CaptureError> {
        info!(
            width = frame.width,
            height = frame.height,
            quality = self.quality.jpeg_quality(),
            "Starting encoding"
        );

        let quality = self.quality;
        tokio::task::spawn_blocking(move || -> Result<EncodedImage, CaptureError> {
            let image = frame.to_rgb_image().ok_or_else(|| {
                CaptureError::Encoding(format!(
                    "Incomplete frame: {} bytes for {}x{}",
                    frame.data.len(),
                    frame.width,
                    frame.height
                ))
            })?;
            let data = Self::encode_jpeg(&image, quality)?;
            debug!(size = data.len(), "Encoding complete");

            Ok(EncodedImage {
                data,
                width: image.width(),
                height: image.height(),
            })
        })
        .await
        .map_err(|e| CaptureError::Encoding(format!("Encoding task error: {}", e)))?
    }

    /// Write encoded data to a new media store entry
    pub async fn save(
        &self,
        encoded: EncodedImage,
        options: OutputFileOptions,
    ) -> Result<MediaDestination, CaptureError> {
        tokio::task::spawn_blocking(move || -> Result<MediaDestination, CaptureError> {
            let OutputFileOptions {
                store,
                collection,
                descriptor,
            } = options;

            let destination = store.insert(collection, &descriptor)?;
            if let Err(e) = store.write(&destination, &encoded.data) {
                store.discard(&destination);
                return Err(e.into());
            }

            debug!(
                name = %destination.display_name,
                width = encoded.width,
                height = encoded.height,
                "Photo written to media store"
            );
            Ok(destination)
        })
        .await
        .map_err(|e| CaptureError::Storage(format!("Save task error: {}", e)))?
    }

    fn encode_jpeg(image: &RgbImage, quality: EncodingQuality) -> Result<Vec<u8>, CaptureError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality.jpeg_quality());

        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| CaptureError::Encoding(format!("JPEG encoding failed: {}", e)))?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_jpeg_quality_values() {
        assert_eq!(EncodingQuality::Low.jpeg_quality(), 60);
        assert_eq!(EncodingQuality::Medium.jpeg_quality(), 80);
        assert_eq!(EncodingQuality::High.jpeg_quality(), 92);
        assert_eq!(EncodingQuality::Maximum.jpeg_quality(), 98);
    }

    #[tokio::test]
    async fn test_encode_produces_jpeg() {
        let frame = Arc::new(CameraFrame {
            width: 8,
            height: 8,
            data: Arc::from(vec![128u8; 8 * 8 * 4]),
            sequence: 0,
            captured_at: Instant::now(),
        });
        let encoded = PhotoEncoder::new(EncodingQuality::Medium)
            .encode(frame)
            .await
            .unwrap();
        assert_eq!(&encoded.data[..2], &[0xFF, 0xD8]);
        assert_eq!((encoded.width, encoded.height), (8, 8));
    }

    #[tokio::test]
    async fn test_encode_rejects_truncated_frame() {
        let frame = Arc::new(CameraFrame {
            width: 8,
            height: 8,
            data: Arc::from(vec![0u8; 16]),
            sequence: 0,
            captured_at: Instant::now(),
        });
        let result = PhotoEncoder::new(EncodingQuality::High).encode(frame).await;
        assert!(matches!(result, Err(CaptureError::Encoding(_))));
    }
}
