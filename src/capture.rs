// SPDX-License-Identifier: GPL-3.0-only

//! Shutter handling
//!
//! [`CaptureRequestHandler`] turns a shutter trigger into exactly one
//! still-capture request and resolves it to a [`CaptureOutcome`].

use crate::constants::capture;
use crate::errors::CaptureError;
use crate::session::{ImageCapture, OutputFileOptions};
use crate::storage::{DestinationDescriptor, MediaCollection, MediaDestination, MediaStore};
use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Result of one capture request
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Success(MediaDestination),
    Failure(CaptureError),
}

impl From<Result<MediaDestination, CaptureError>> for CaptureOutcome {
    fn from(result: Result<MediaDestination, CaptureError>) -> Self {
        match result {
            Ok(destination) => CaptureOutcome::Success(destination),
            Err(e) => CaptureOutcome::Failure(e),
        }
    }
}

/// Descriptor for a still taken at `timestamp`: `YYYYMMDDHHMMSS.jpg`
pub fn capture_descriptor(timestamp: DateTime<Local>) -> DestinationDescriptor {
    let name = format!(
        "{}.{}",
        timestamp.format(capture::FILENAME_TIMESTAMP_FORMAT),
        capture::IMAGE_EXTENSION
    );
    DestinationDescriptor::new(name, capture::IMAGE_MIME_TYPE)
}

/// Drops shutter triggers that follow an accepted one too closely
///
/// A zero window accepts everything.
#[derive(Debug, Clone)]
pub struct ShutterGuard {
    window: Duration,
    last_accepted: Arc<Mutex<Option<Instant>>>,
}

impl ShutterGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: Arc::new(Mutex::new(None)),
        }
    }

    /// Guard that never drops triggers
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        !self.window.is_zero()
    }

    /// Decide whether a trigger at `now` may issue a request
    pub fn try_accept(&self, now: Instant) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let mut last = self.last_accepted.lock().unwrap();
        if let Some(previous) = *last
            && now.saturating_duration_since(previous) < self.window
        {
            return false;
        }

        *last = Some(now);
        true
    }
}

/// Issues still-capture requests into the shared image collection
#[derive(Clone)]
pub struct CaptureRequestHandler {
    capture: ImageCapture,
    store: Arc<dyn MediaStore>,
    guard: ShutterGuard,
}

impl CaptureRequestHandler {
    pub fn new(capture: ImageCapture, store: Arc<dyn MediaStore>) -> Self {
        Self {
            capture,
            store,
            guard: ShutterGuard::disabled(),
        }
    }

    pub fn with_guard(mut self, guard: ShutterGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Whether a trigger arriving now would be dropped by the guard
    pub fn accept_trigger(&self) -> bool {
        let accepted = self.guard.try_accept(Instant::now());
        if !accepted {
            debug!("Shutter trigger suppressed");
        }
        accepted
    }

    /// Capture a still named after the current local time
    pub async fn capture(&self) -> CaptureOutcome {
        self.capture_at(Local::now()).await
    }

    /// Capture a still named after `timestamp`
    pub async fn capture_at(&self, timestamp: DateTime<Local>) -> CaptureOutcome {
        let options = OutputFileOptions {
            store: Arc::clone(&self.store),
            collection: MediaCollection::Images,
            descriptor: capture_descriptor(timestamp),
        };
        info!(name = %options.descriptor.display_name, "Capture requested");

        let outcome: CaptureOutcome = self
            .capture
            .take_picture(options)
            .await
            .map(|results| results.saved)
            .into();

        match &outcome {
            CaptureOutcome::Success(destination) => {
                info!(path = %destination.path.display(), "Capture succeeded");
            }
            CaptureOutcome::Failure(e) => {
                error!(error = %e, "Capture failed");
            }
        }

        outcome
    }
}
