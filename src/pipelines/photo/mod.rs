// SPDX-License-Identifier: GPL-3.0-only

//! Async photo pipeline
//!
//! ```text
//! Camera frame (RGBA) → Encoding (JPEG) → Media store
//!       ↓
//! Preview continues uninterrupted
//! ```

pub mod encoding;

pub use encoding::{EncodedImage, EncodingQuality, PhotoEncoder};

use crate::backends::camera::types::CameraFrame;
use crate::errors::CaptureError;
use crate::session::OutputFileOptions;
use crate::storage::MediaDestination;
use std::sync::Arc;

/// Encode → save workflow for one still
pub struct PhotoPipeline {
    encoder: PhotoEncoder,
}

impl PhotoPipeline {
    pub fn new(quality: EncodingQuality) -> Self {
        Self {
            encoder: PhotoEncoder::new(quality),
        }
    }

    /// Encode `frame` and write it to the destination in `options`
    pub async fn capture_and_save(
        &self,
        frame: Arc<CameraFrame>,
        options: OutputFileOptions,
    ) -> Result<MediaDestination, CaptureError> {
        let encoded = self.encoder.encode(frame).await?;
        self.encoder.save(encoded, options).await
    }
}
