// SPDX-License-Identifier: GPL-3.0-only

//! Camera screen
//!
//! Wires the permission gate, the capture session, the shutter handler and
//! the notifier together and tracks the screen's state:
//!
//! ```text
//! Uninitialized ─▶ PermissionPending ─▶ SessionStarting ─▶ SessionActive { in_flight }
//!       │                 │                   │
//!       └─────────────────┼──────────────────▶│ (already granted)
//!                         ▼                   ▼
//!                    Terminated          Unavailable
//!
//! any state ─▶ Destroyed
//! ```

use crate::backends::camera::{self, CameraBackendType, ProviderSource};
use crate::capture::{CaptureOutcome, CaptureRequestHandler, ShutterGuard};
use crate::notify::{Notice, ResultNotifier};
use crate::config::Config;
use crate::permissions::{
    DesktopPermissionBroker, GateDecision, GrantResults, PermissionBroker, PermissionGate,
};
use crate::session::{CaptureSession, LifecycleScope, Preview, SessionOptions, StartOutcome};
use crate::storage::{FileMediaStore, MediaStore};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Whole-screen state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    Uninitialized,
    PermissionPending,
    SessionStarting,
    /// Camera bound; `in_flight` counts unresolved capture requests
    SessionActive { in_flight: usize },
    /// The camera could not be opened
    Unavailable,
    /// Permissions were refused
    Terminated,
    Destroyed,
}

impl ScreenState {
    /// The screen has ended and accepts no further input
    pub fn is_closed(&self) -> bool {
        matches!(self, ScreenState::Terminated | ScreenState::Destroyed)
    }

    /// Count a new capture request; false when the session is not active
    fn capture_started(&mut self) -> bool {
        match self {
            ScreenState::SessionActive { in_flight } => {
                *in_flight += 1;
                true
            }
            _ => false,
        }
    }

    /// Resolve a request previously counted by [`capture_started`](Self::capture_started)
    fn capture_finished(&mut self) {
        if let ScreenState::SessionActive { in_flight } = self {
            *in_flight = in_flight.saturating_sub(1);
        }
    }
}

/// Platform collaborators of a camera screen
#[derive(Clone)]
pub struct ScreenServices {
    pub broker: Arc<dyn PermissionBroker>,
    pub provider_source: Arc<dyn ProviderSource>,
    pub store: Arc<dyn MediaStore>,
    pub notifier: Arc<dyn ResultNotifier>,
}

impl ScreenServices {
    /// Desktop collaborators configured from `config`
    pub fn desktop(config: &Config, notifier: Arc<dyn ResultNotifier>) -> Self {
        Self::desktop_in(config, config.photo_dir(), notifier)
    }

    /// Desktop collaborators saving photos to `photo_dir`
    pub fn desktop_in(
        config: &Config,
        photo_dir: PathBuf,
        notifier: Arc<dyn ResultNotifier>,
    ) -> Self {
        let mut broker =
            DesktopPermissionBroker::new(photo_dir.clone(), config.platform_version_override);
        if config.backend == CameraBackendType::TestPattern {
            broker = broker.with_synthetic_camera();
        }

        Self {
            broker: Arc::new(broker),
            provider_source: camera::provider_source(config.backend, config.camera_format()),
            store: Arc::new(FileMediaStore::new(photo_dir)),
            notifier,
        }
    }
}

/// The single camera screen
#[derive(Clone)]
pub struct CameraScreen {
    gate: PermissionGate,
    session: CaptureSession,
    handler: CaptureRequestHandler,
    notifier: Arc<dyn ResultNotifier>,
    scope: LifecycleScope,
    state: Arc<Mutex<ScreenState>>,
}

impl CameraScreen {
    pub fn new(services: ScreenServices, options: SessionOptions, guard: ShutterGuard) -> Self {
        let scope = LifecycleScope::new("camera screen");
        let session = CaptureSession::new(services.provider_source, scope.clone(), options);
        let handler = CaptureRequestHandler::new(session.image_capture().clone(), services.store)
            .with_guard(guard);

        Self {
            gate: PermissionGate::new(services.broker),
            session,
            handler,
            notifier: services.notifier,
            scope,
            state: Arc::new(Mutex::new(ScreenState::Uninitialized)),
        }
    }

    pub fn state(&self) -> ScreenState {
        *self.state.lock().unwrap()
    }

    /// Preview use case; install the host surface before [`start`](Self::start)
    pub fn preview(&self) -> &Preview {
        self.session.preview()
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Move from `from` to `to`; false when the screen is elsewhere
    fn transition(&self, from: ScreenState, to: ScreenState) -> bool {
        let mut state = self.state.lock().unwrap();
        if *state != from {
            debug!(current = ?*state, expected = ?from, target = ?to, "Skipping state transition");
            return false;
        }
        debug!(from = ?from, to = ?to, "Screen state");
        *state = to;
        true
    }

    /// Screen start: check permissions, request them if needed, then open the camera
    pub async fn start(&self) -> ScreenState {
        let required = self.gate.required().clone();

        if self.gate.check_granted(&required) {
            info!("Permissions already granted");
            if self.transition(ScreenState::Uninitialized, ScreenState::SessionStarting) {
                self.start_session().await;
            }
            return self.state();
        }

        if !self.transition(ScreenState::Uninitialized, ScreenState::PermissionPending) {
            return self.state();
        }

        info!(permissions = ?required, "Requesting permissions");
        let results = self.gate.request(&required).await;
        self.on_permissions_result(results).await
    }

    /// Handle the asynchronous answer to a permission request
    pub async fn on_permissions_result(&self, results: GrantResults) -> ScreenState {
        let required = self.gate.required().clone();

        match PermissionGate::evaluate(&required, &results) {
            GateDecision::Granted => {
                if self.transition(ScreenState::PermissionPending, ScreenState::SessionStarting) {
                    self.start_session().await;
                }
            }
            GateDecision::Denied { denied } => {
                if self.transition(ScreenState::PermissionPending, ScreenState::Terminated) {
                    warn!(denied = ?denied, "Permissions not granted");
                    self.notifier.notify(Notice::permission_denied());
                    self.scope.end();
                }
            }
        }

        self.state()
    }

    async fn start_session(&self) {
        match self.session.start().await {
            Ok(StartOutcome::Bound) => {
                self.transition(
                    ScreenState::SessionStarting,
                    ScreenState::SessionActive { in_flight: 0 },
                );
            }
            Ok(StartOutcome::AlreadyStarted) => {}
            Err(e) => {
                error!(error = %e, "Camera unavailable");
                if self.transition(ScreenState::SessionStarting, ScreenState::Unavailable) {
                    self.notifier.notify(Notice::error());
                }
            }
        }
    }

    /// Shutter press
    ///
    /// Returns `None` when the trigger was ignored (screen closed, or
    /// suppressed by the shutter guard). Otherwise the outcome of exactly
    /// one capture request, already reported to the user.
    pub async fn shutter(&self) -> Option<CaptureOutcome> {
        if self.state().is_closed() {
            debug!("Shutter ignored - screen closed");
            return None;
        }

        if !self.handler.accept_trigger() {
            return None;
        }

        let counted = self.state.lock().unwrap().capture_started();
        let outcome = self.handler.capture().await;
        if counted {
            self.state.lock().unwrap().capture_finished();
        }

        if self.state() != ScreenState::Destroyed {
            let notice = match &outcome {
                CaptureOutcome::Success(_) => Notice::success(),
                CaptureOutcome::Failure(_) => Notice::error(),
            };
            self.notifier.notify(notice);
        }

        Some(outcome)
    }

    /// Screen destroyed: release the camera and every scoped resource
    pub fn destroy(&self) {
        let previous = std::mem::replace(&mut *self.state.lock().unwrap(), ScreenState::Destroyed);
        if previous != ScreenState::Destroyed {
            info!(previous = ?previous, "Destroying camera screen");
            self.scope.end();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_issued_while_starting_is_not_counted() {
        let mut state = ScreenState::SessionStarting;
        let early = state.capture_started();
        assert!(!early);

        state = ScreenState::SessionActive { in_flight: 0 };
        assert!(state.capture_started());

        // The early request resolves first and must leave the later one counted
        if early {
            state.capture_finished();
        }
        assert_eq!(state, ScreenState::SessionActive { in_flight: 1 });

        state.capture_finished();
        assert_eq!(state, ScreenState::SessionActive { in_flight: 0 });
    }

    #[test]
    fn test_closed_states() {
        assert!(ScreenState::Terminated.is_closed());
        assert!(ScreenState::Destroyed.is_closed());
        assert!(!ScreenState::Unavailable.is_closed());
    }
}
