// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// PipeWire backend (modern Linux standard)
    #[default]
    PipeWire,
    /// GStreamer test pattern, for machines without a camera
    TestPattern,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::PipeWire => write!(f, "PipeWire"),
            CameraBackendType::TestPattern => write!(f, "test pattern"),
        }
    }
}

/// Which way a camera faces, relative to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LensFacing {
    /// Rear camera, pointing away from the user
    #[default]
    Back,
    /// Front camera, pointing at the user
    Front,
    /// Detachable camera (USB webcams and the like)
    External,
}

impl LensFacing {
    /// Parse libcamera's `api.libcamera.location` property value
    pub fn from_location(location: &str) -> Option<Self> {
        match location.trim().to_ascii_lowercase().as_str() {
            "back" | "rear" => Some(LensFacing::Back),
            "front" => Some(LensFacing::Front),
            "external" => Some(LensFacing::External),
            _ => None,
        }
    }
}

impl std::fmt::Display for LensFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LensFacing::Back => write!(f, "back"),
            LensFacing::Front => write!(f, "front"),
            LensFacing::External => write!(f, "external"),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    pub path: String, // PipeWire target (serial or node ID), empty = auto-select
    pub metadata_path: Option<String>, // PipeWire node ID for `pw-cli info`
    pub facing: Option<LensFacing>, // None when the device does not report a location
}

/// Requested capture resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A single RGBA frame from the camera
///
/// Rows are tightly packed (`width * 4` bytes); padding from the GStreamer
/// buffer is removed when the frame is copied out of the pipeline.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    /// Monotonic frame number within one pipeline
    pub sequence: u64,
    /// Timestamp when frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Bytes per row of the packed RGBA data
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// Check whether the buffer holds a full frame
    pub fn is_complete(&self) -> bool {
        self.data.len() >= self.stride() * self.height as usize
    }

    /// Drop the alpha channel, producing an image ready for JPEG encoding
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        if !self.is_complete() {
            return None;
        }

        let pixels = self.width as usize * self.height as usize;
        let mut rgb = Vec::with_capacity(pixels * 3);
        for px in self.data.chunks_exact(4).take(pixels) {
            rgb.extend_from_slice(&px[..3]);
        }

        image::RgbImage::from_raw(self.width, self.height, rgb)
    }
}

/// Frame receiver type for preview streams
pub type FrameReceiver = futures::channel::mpsc::Receiver<Arc<CameraFrame>>;

/// Frame sender type for preview streams
pub type FrameSender = futures::channel::mpsc::Sender<Arc<CameraFrame>>;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to initialize backend
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}
