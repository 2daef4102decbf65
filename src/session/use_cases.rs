// SPDX-License-Identifier: GPL-3.0-only

//! Camera use cases bound by a [`CaptureSession`](super::CaptureSession)
//!
//! - [`LensSelector`]: picks the physical camera
//! - [`Preview`]: forwards live frames to an on-screen surface
//! - [`ImageCapture`]: takes stills once a provider has attached a frame source

use crate::backends::camera::types::{CameraDevice, CameraFrame, FrameSender, LensFacing};
use crate::errors::CaptureError;
use crate::pipelines::photo::{EncodingQuality, PhotoPipeline};
use crate::storage::{DestinationDescriptor, MediaCollection, MediaDestination, MediaStore};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// How the capture pipeline trades latency against freshness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureMode {
    /// Use the most recent preview frame
    #[default]
    MinimizeLatency,
    /// Wait for a frame produced after the shutter press
    MaximizeQuality,
}

/// Chooses which camera a session binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LensSelector {
    facing: LensFacing,
    allow_fallback: bool,
}

impl LensSelector {
    /// Require the rear-facing camera
    pub const BACK: LensSelector = LensSelector {
        facing: LensFacing::Back,
        allow_fallback: false,
    };

    /// Require a camera facing the given way
    pub fn require(facing: LensFacing) -> Self {
        Self {
            facing,
            allow_fallback: false,
        }
    }

    /// Fall back to the first camera when none faces the required way
    pub fn with_fallback(mut self, allow_fallback: bool) -> Self {
        self.allow_fallback = allow_fallback;
        self
    }

    pub fn facing(&self) -> LensFacing {
        self.facing
    }

    /// Pick a camera from the enumerated devices
    pub fn select<'a>(&self, cameras: &'a [CameraDevice]) -> Option<&'a CameraDevice> {
        if let Some(camera) = cameras.iter().find(|c| c.facing == Some(self.facing)) {
            return Some(camera);
        }

        if self.allow_fallback {
            let fallback = cameras.first();
            if let Some(camera) = fallback {
                info!(
                    required = %self.facing,
                    camera = %camera.name,
                    "No camera reports the required facing - falling back to first camera"
                );
            }
            return fallback;
        }

        None
    }
}

/// Live preview use case
///
/// The host installs a surface (a frame channel) with
/// [`set_surface_provider`](Preview::set_surface_provider); the provider
/// copies the sender when it binds.
#[derive(Clone, Default)]
pub struct Preview {
    surface: Arc<Mutex<Option<FrameSender>>>,
}

impl Preview {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the surface that receives preview frames
    pub fn set_surface_provider(&self, surface: FrameSender) {
        *self.surface.lock().unwrap() = Some(surface);
    }

    /// Sender for the current surface, if one is installed
    pub fn surface(&self) -> Option<FrameSender> {
        self.surface.lock().unwrap().clone()
    }

    pub fn has_surface(&self) -> bool {
        self.surface.lock().unwrap().is_some()
    }
}

impl std::fmt::Debug for Preview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preview")
            .field("has_surface", &self.has_surface())
            .finish()
    }
}

/// Source of still frames, attached to an [`ImageCapture`] by a provider
pub trait StillSource: Send + Sync {
    /// Produce one frame for a still capture
    fn grab(&self, mode: CaptureMode) -> BoxFuture<'static, Result<Arc<CameraFrame>, CaptureError>>;
}

/// Where a still should be written
#[derive(Clone)]
pub struct OutputFileOptions {
    pub store: Arc<dyn MediaStore>,
    pub collection: MediaCollection,
    pub descriptor: DestinationDescriptor,
}

/// Result of a successful still capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFileResults {
    pub saved: MediaDestination,
}

/// Still capture use case
///
/// Created before binding and shared by the session and the capture
/// handler. Until a provider attaches a [`StillSource`] every request fails
/// with [`CaptureError::NotBound`].
#[derive(Clone)]
pub struct ImageCapture {
    mode: CaptureMode,
    quality: EncodingQuality,
    source: Arc<Mutex<Option<Arc<dyn StillSource>>>>,
}

impl ImageCapture {
    pub fn new(mode: CaptureMode) -> Self {
        Self {
            mode,
            quality: EncodingQuality::High,
            source: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_quality(mut self, quality: EncodingQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Attach the frame source of a bound camera
    pub fn attach(&self, source: Arc<dyn StillSource>) {
        debug!(mode = ?self.mode, "Image capture attached to camera");
        *self.source.lock().unwrap() = Some(source);
    }

    /// Detach from the camera (binding released)
    pub fn detach(&self) {
        if self.source.lock().unwrap().take().is_some() {
            debug!("Image capture detached from camera");
        }
    }

    pub fn is_bound(&self) -> bool {
        self.source.lock().unwrap().is_some()
    }

    /// Capture one still and write it to the requested destination
    ///
    /// The returned future resolves exactly once, with either the saved
    /// destination or the reason the capture failed.
    pub async fn take_picture(
        &self,
        options: OutputFileOptions,
    ) -> Result<OutputFileResults, CaptureError> {
        let source = self
            .source
            .lock()
            .unwrap()
            .clone()
            .ok_or(CaptureError::NotBound)?;

        let frame = source.grab(self.mode).await?;
        debug!(
            width = frame.width,
            height = frame.height,
            sequence = frame.sequence,
            "Frame grabbed for still capture"
        );

        let saved = PhotoPipeline::new(self.quality)
            .capture_and_save(frame, options)
            .await?;

        Ok(OutputFileResults { saved })
    }
}

impl std::fmt::Debug for ImageCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCapture")
            .field("mode", &self.mode)
            .field("quality", &self.quality)
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(name: &str, facing: Option<LensFacing>) -> CameraDevice {
        CameraDevice {
            name: name.to_string(),
            path: format!("pipewire-{}", name),
            metadata_path: None,
            facing,
        }
    }

    #[test]
    fn test_selector_prefers_matching_facing() {
        let cameras = vec![
            camera("front", Some(LensFacing::Front)),
            camera("rear", Some(LensFacing::Back)),
        ];
        let selected = LensSelector::BACK.select(&cameras).unwrap();
        assert_eq!(selected.name, "rear");
    }

    #[test]
    fn test_selector_without_fallback_rejects_webcam() {
        let cameras = vec![camera("webcam", None)];
        assert!(LensSelector::BACK.select(&cameras).is_none());
        let selected = LensSelector::BACK.with_fallback(true).select(&cameras);
        assert_eq!(selected.map(|c| c.name.as_str()), Some("webcam"));
    }

    #[test]
    fn test_preview_surface_install() {
        let preview = Preview::new();
        assert!(!preview.has_surface());
        let (sender, _receiver) = futures::channel::mpsc::channel(1);
        preview.set_surface_provider(sender);
        assert!(preview.surface().is_some());
    }

    #[tokio::test]
    async fn test_unbound_capture_fails_fast() {
        let capture = ImageCapture::new(CaptureMode::MinimizeLatency);
        let options = OutputFileOptions {
            store: Arc::new(crate::storage::FileMediaStore::new(std::env::temp_dir())),
            collection: MediaCollection::Images,
            descriptor: DestinationDescriptor::new("unused.jpg", "image/jpeg"),
        };
        let result = capture.take_picture(options).await;
        assert!(matches!(result, Err(CaptureError::NotBound)));
    }
}
