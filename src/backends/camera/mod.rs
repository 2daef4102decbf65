// SPDX-License-Identifier: GPL-3.0-only

//! Camera provider abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │   CaptureSession    │
//! └──────────┬──────────┘
//!            │ acquire (async)
//!            ▼
//! ┌─────────────────────┐
//! │   ProviderSource    │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │   CameraProvider    │  ← bind preview + capture to a lifecycle scope
//! └──────────┬──────────┘
//!            │
//!            ▼
//!   ┌──────────────────┐
//!   │ GStreamer (PW or │
//!   │  test pattern)   │
//!   └──────────────────┘
//! ```

pub mod pipewire;
pub mod types;

pub use types::*;

use crate::session::{ImageCapture, LensSelector, LifecycleScope, Preview};
use futures::future::BoxFuture;
use std::sync::Arc;

/// A connected camera stack
pub trait CameraProvider: Send + Sync {
    /// Cameras known to the provider
    fn available_cameras(&self) -> Vec<CameraDevice>;

    /// Bind preview and still capture to the camera chosen by `selector`
    ///
    /// On success the provider has attached a frame source to `capture` and
    /// handed the running binding to `scope`. Ending the scope unbinds.
    fn bind_to_lifecycle(
        &self,
        scope: &LifecycleScope,
        selector: &LensSelector,
        preview: &Preview,
        capture: &ImageCapture,
    ) -> BackendResult<()>;
}

/// Asynchronous access to a [`CameraProvider`]
pub trait ProviderSource: Send + Sync {
    /// Connect to the camera stack. Resolves exactly once.
    fn acquire(&self) -> BoxFuture<'static, BackendResult<Arc<dyn CameraProvider>>>;
}

/// Get the provider source for a backend
pub fn provider_source(
    backend: CameraBackendType,
    format: Option<CameraFormat>,
) -> Arc<dyn ProviderSource> {
    Arc::new(pipewire::GStreamerProviderSource::new(backend, format))
}
