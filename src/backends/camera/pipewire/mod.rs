// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer camera provider
//!
//! Enumerates cameras through PipeWire and binds preview and still capture to
//! a single GStreamer pipeline. The same provider drives `videotestsrc` for
//! [`CameraBackendType::TestPattern`].

mod enumeration;
mod pipeline;

pub use enumeration::{enumerate_pipewire_cameras, is_pipewire_available, parse_node_listing};
pub use pipeline::{CapturePipeline, LatestFrame, pipeline_description};

use super::types::*;
use super::{CameraProvider, ProviderSource};
use crate::constants::timing;
use crate::errors::CaptureError;
use crate::session::{
    CaptureMode, ImageCapture, LensSelector, LifecycleScope, Preview, ScopedResource, StillSource,
};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Device entry used by the test-pattern backend
pub fn test_pattern_device() -> CameraDevice {
    CameraDevice {
        name: "Test Pattern".to_string(),
        path: String::new(),
        metadata_path: None,
        facing: Some(LensFacing::Back),
    }
}

/// Acquires a [`GStreamerProvider`] off the async executor
pub struct GStreamerProviderSource {
    backend: CameraBackendType,
    format: Option<CameraFormat>,
}

impl GStreamerProviderSource {
    pub fn new(backend: CameraBackendType, format: Option<CameraFormat>) -> Self {
        Self { backend, format }
    }
}

impl ProviderSource for GStreamerProviderSource {
    fn acquire(&self) -> BoxFuture<'static, BackendResult<Arc<dyn CameraProvider>>> {
        let backend = self.backend;
        let format = self.format;
        Box::pin(async move {
            let provider =
                tokio::task::spawn_blocking(move || GStreamerProvider::connect(backend, format))
                    .await
                    .map_err(|e| BackendError::Other(format!("Provider task failed: {}", e)))??;
            Ok(Arc::new(provider) as Arc<dyn CameraProvider>)
        })
    }
}

/// Camera provider backed by GStreamer
pub struct GStreamerProvider {
    backend: CameraBackendType,
    format: Option<CameraFormat>,
    cameras: Vec<CameraDevice>,
}

impl GStreamerProvider {
    /// Initialize GStreamer and enumerate cameras
    pub fn connect(backend: CameraBackendType, format: Option<CameraFormat>) -> BackendResult<Self> {
        gstreamer::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let cameras = match backend {
            CameraBackendType::PipeWire => enumerate_pipewire_cameras().ok_or_else(|| {
                BackendError::NotAvailable("PipeWire camera source is not installed".to_string())
            })?,
            CameraBackendType::TestPattern => vec![test_pattern_device()],
        };

        info!(backend = %backend, count = cameras.len(), "Camera provider ready");
        Ok(Self {
            backend,
            format,
            cameras,
        })
    }
}

impl CameraProvider for GStreamerProvider {
    fn available_cameras(&self) -> Vec<CameraDevice> {
        self.cameras.clone()
    }

    fn bind_to_lifecycle(
        &self,
        scope: &LifecycleScope,
        selector: &LensSelector,
        preview: &Preview,
        capture: &ImageCapture,
    ) -> BackendResult<()> {
        if !scope.is_active() {
            return Err(BackendError::Other("Lifecycle scope has ended".to_string()));
        }

        let device = selector.select(&self.cameras).cloned().ok_or_else(|| {
            BackendError::DeviceNotFound(format!("No {} camera", selector.facing()))
        })?;

        let pipeline =
            CapturePipeline::start(self.backend, &device, self.format.as_ref(), preview.surface())?;

        capture.attach(Arc::new(LatestFrameSource {
            latest: pipeline.latest_frame(),
        }));

        let binding = SessionBinding {
            name: format!("camera binding ({})", device.name),
            pipeline,
            capture: capture.clone(),
        };

        if !scope.adopt(Box::new(binding)) {
            return Err(BackendError::Other(
                "Lifecycle scope ended during binding".to_string(),
            ));
        }

        info!(camera = %device.name, "Preview and image capture bound");
        Ok(())
    }
}

/// Bound preview + capture pipeline, owned by the lifecycle scope
struct SessionBinding {
    name: String,
    pipeline: CapturePipeline,
    capture: ImageCapture,
}

impl ScopedResource for SessionBinding {
    fn name(&self) -> &str {
        &self.name
    }

    fn release(self: Box<Self>) {
        let SessionBinding {
            pipeline, capture, ..
        } = *self;
        capture.detach();
        if let Err(e) = pipeline.stop() {
            error!(error = %e, "Failed to stop camera pipeline");
        }
    }
}

/// Serves stills from the pipeline's latest-frame channel
struct LatestFrameSource {
    latest: LatestFrame,
}

impl StillSource for LatestFrameSource {
    fn grab(&self, mode: CaptureMode) -> BoxFuture<'static, Result<Arc<CameraFrame>, CaptureError>> {
        let mut latest = self.latest.clone();
        Box::pin(async move {
            match mode {
                CaptureMode::MinimizeLatency => {
                    let current = latest.borrow_and_update().clone();
                    match current {
                        Some(frame) => Ok(frame),
                        None => next_frame(&mut latest, timing::FIRST_FRAME_TIMEOUT).await,
                    }
                }
                CaptureMode::MaximizeQuality => {
                    // Only frames produced after the trigger qualify
                    let _ = latest.borrow_and_update();
                    next_frame(&mut latest, timing::FRESH_FRAME_TIMEOUT).await
                }
            }
        })
    }
}

async fn next_frame(latest: &mut LatestFrame, limit: Duration) -> Result<Arc<CameraFrame>, CaptureError> {
    let wait = async {
        loop {
            latest
                .changed()
                .await
                .map_err(|_| CaptureError::Backend("Camera pipeline stopped".to_string()))?;
            let frame = latest.borrow_and_update().clone();
            if let Some(frame) = frame {
                return Ok(frame);
            }
        }
    };

    tokio::time::timeout(limit, wait).await.map_err(|_| {
        debug!(timeout_ms = limit.as_millis() as u64, "No frame within timeout");
        CaptureError::NoFrame
    })?
}
