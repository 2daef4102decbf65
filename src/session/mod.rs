// SPDX-License-Identifier: GPL-3.0-only

//! Camera session
//!
//! A [`CaptureSession`] acquires a camera provider and binds a [`Preview`] and
//! an [`ImageCapture`] to the screen's [`LifecycleScope`]. Starting is
//! guarded: only one binding is ever made per session, no matter how often
//! or how concurrently [`CaptureSession::start`] is called.

mod lifecycle;
mod use_cases;

pub use lifecycle::{LifecycleScope, ScopedResource};
pub use use_cases::{
    CaptureMode, ImageCapture, LensSelector, OutputFileOptions, OutputFileResults, Preview,
    StillSource,
};

use crate::backends::camera::{BackendError, CameraProvider, ProviderSource};
use crate::constants::worker;
use crate::errors::SessionError;
use crate::pipelines::photo::EncodingQuality;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tracing::{error, info, warn};

/// Where provider acquisition and binding run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraExecutor {
    /// The ambient tokio runtime
    #[default]
    PlatformDefault,
    /// A single-worker runtime owned by the lifecycle scope
    Dedicated,
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Active,
    Failed,
}

/// Result of a [`CaptureSession::start`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// This call performed the binding
    Bound,
    /// Another call already started (or is starting) the session
    AlreadyStarted,
}

/// Session settings
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub selector: LensSelector,
    pub capture_mode: CaptureMode,
    pub quality: EncodingQuality,
    pub executor: CameraExecutor,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            selector: LensSelector::BACK.with_fallback(true),
            capture_mode: CaptureMode::MinimizeLatency,
            quality: EncodingQuality::High,
            executor: CameraExecutor::PlatformDefault,
        }
    }
}

/// Single-worker runtime adopted by the lifecycle scope
struct CameraWorker {
    runtime: tokio::runtime::Runtime,
}

impl ScopedResource for CameraWorker {
    fn name(&self) -> &str {
        worker::THREAD_NAME
    }

    fn release(self: Box<Self>) {
        info!("Shutting down camera worker");
        self.runtime.shutdown_background();
    }
}

/// Preview + still capture bound to a lifecycle scope
#[derive(Clone)]
pub struct CaptureSession {
    source: Arc<dyn ProviderSource>,
    scope: LifecycleScope,
    options: SessionOptions,
    preview: Preview,
    image_capture: ImageCapture,
    state: Arc<Mutex<SessionState>>,
    worker: Arc<Mutex<Option<Handle>>>,
}

impl CaptureSession {
    pub fn new(
        source: Arc<dyn ProviderSource>,
        scope: LifecycleScope,
        options: SessionOptions,
    ) -> Self {
        let image_capture = ImageCapture::new(options.capture_mode).with_quality(options.quality);
        Self {
            source,
            scope,
            options,
            preview: Preview::new(),
            image_capture,
            state: Arc::new(Mutex::new(SessionState::Idle)),
            worker: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn image_capture(&self) -> &ImageCapture {
        &self.image_capture
    }

    pub fn scope(&self) -> &LifecycleScope {
        &self.scope
    }

    /// Handle of the dedicated camera worker, once created
    pub fn worker_handle(&self) -> Option<Handle> {
        self.worker.lock().unwrap().clone()
    }

    /// Acquire the provider and bind the use cases
    ///
    /// Only a call that finds the session `Idle` (or `Failed`, to retry)
    /// binds; every other call returns [`StartOutcome::AlreadyStarted`].
    pub async fn start(&self) -> Result<StartOutcome, SessionError> {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                SessionState::Starting | SessionState::Active => {
                    warn!(state = ?*state, "Camera session already started");
                    return Ok(StartOutcome::AlreadyStarted);
                }
                SessionState::Idle | SessionState::Failed => *state = SessionState::Starting,
            }
        }

        info!(executor = ?self.options.executor, "Starting camera session");
        let result = self.bind().await;

        let mut state = self.state.lock().unwrap();
        match result {
            Ok(()) => {
                *state = SessionState::Active;
                info!("Camera session active");
                Ok(StartOutcome::Bound)
            }
            Err(e) => {
                *state = SessionState::Failed;
                error!(error = %e, "Camera session failed to start");
                Err(e)
            }
        }
    }

    async fn bind(&self) -> Result<(), SessionError> {
        let runtime = match self.options.executor {
            CameraExecutor::PlatformDefault => None,
            CameraExecutor::Dedicated => Some(self.dedicated_worker()?),
        };

        let acquire = self.source.acquire();
        let provider = match &runtime {
            None => acquire.await,
            Some(handle) => handle
                .spawn(acquire)
                .await
                .map_err(|_| SessionError::ExecutorShutdown)?,
        }
        .map_err(SessionError::ProviderAcquisition)?;

        if !self.scope.is_active() {
            return Err(SessionError::ScopeEnded);
        }

        let scope = self.scope.clone();
        let selector = self.options.selector;
        let preview = self.preview.clone();
        let capture = self.image_capture.clone();
        let bind = move || bind_blocking(provider, &scope, &selector, &preview, &capture);

        let bound = match &runtime {
            None => tokio::task::spawn_blocking(bind).await,
            Some(handle) => handle.spawn_blocking(bind).await,
        };

        match bound {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) | Err(_) if !self.scope.is_active() => Err(SessionError::ScopeEnded),
            Ok(Err(e)) => Err(SessionError::Bind(e)),
            Err(e) if e.is_cancelled() => Err(SessionError::ExecutorShutdown),
            Err(e) => Err(SessionError::Bind(BackendError::Other(e.to_string()))),
        }
    }

    /// Get or create the dedicated worker runtime
    fn dedicated_worker(&self) -> Result<Handle, SessionError> {
        let mut worker = self.worker.lock().unwrap();
        if let Some(handle) = worker.as_ref() {
            return Ok(handle.clone());
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name(worker::THREAD_NAME)
            .enable_all()
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to create camera worker");
                SessionError::ExecutorShutdown
            })?;

        let handle = runtime.handle().clone();
        if !self.scope.adopt(Box::new(CameraWorker { runtime })) {
            return Err(SessionError::ScopeEnded);
        }

        *worker = Some(handle.clone());
        Ok(handle)
    }
}

fn bind_blocking(
    provider: Arc<dyn CameraProvider>,
    scope: &LifecycleScope,
    selector: &LensSelector,
    preview: &Preview,
    capture: &ImageCapture,
) -> Result<(), BackendError> {
    provider.bind_to_lifecycle(scope, selector, preview, capture)
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("state", &self.state())
            .field("options", &self.options)
            .field("scope", &self.scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{BackendResult, CameraDevice, LensFacing};
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Binding;

    impl ScopedResource for Binding {
        fn name(&self) -> &str {
            "binding"
        }

        fn release(self: Box<Self>) {}
    }

    struct CountingProvider {
        binds: Arc<AtomicUsize>,
    }

    impl CameraProvider for CountingProvider {
        fn available_cameras(&self) -> Vec<CameraDevice> {
            vec![CameraDevice {
                name: "rear".to_string(),
                path: String::new(),
                metadata_path: None,
                facing: Some(LensFacing::Back),
            }]
        }

        fn bind_to_lifecycle(
            &self,
            scope: &LifecycleScope,
            selector: &LensSelector,
            _preview: &Preview,
            _capture: &ImageCapture,
        ) -> BackendResult<()> {
            let cameras = self.available_cameras();
            selector
                .select(&cameras)
                .ok_or_else(|| BackendError::DeviceNotFound("rear".to_string()))?;
            self.binds.fetch_add(1, Ordering::SeqCst);
            scope.adopt(Box::new(Binding));
            Ok(())
        }
    }

    struct CountingSource {
        binds: Arc<AtomicUsize>,
        fail: bool,
    }

    impl ProviderSource for CountingSource {
        fn acquire(&self) -> BoxFuture<'static, BackendResult<Arc<dyn CameraProvider>>> {
            let binds = Arc::clone(&self.binds);
            let fail = self.fail;
            Box::pin(async move {
                tokio::task::yield_now().await;
                if fail {
                    return Err(BackendError::NotAvailable("no camera stack".to_string()));
                }
                Ok(Arc::new(CountingProvider { binds }) as Arc<dyn CameraProvider>)
            })
        }
    }

    fn session(fail: bool, executor: CameraExecutor) -> (CaptureSession, Arc<AtomicUsize>) {
        let binds = Arc::new(AtomicUsize::new(0));
        let source = Arc::new(CountingSource {
            binds: Arc::clone(&binds),
            fail,
        });
        let options = SessionOptions {
            executor,
            ..SessionOptions::default()
        };
        (
            CaptureSession::new(source, LifecycleScope::new("test"), options),
            binds,
        )
    }

    #[tokio::test]
    async fn test_concurrent_starts_bind_once() {
        let (session, binds) = session(false, CameraExecutor::PlatformDefault);
        let (a, b) = futures::join!(session.start(), session.start());

        let outcomes = [a.unwrap(), b.unwrap()];
        assert_eq!(
            outcomes.iter().filter(|o| **o == StartOutcome::Bound).count(),
            1
        );
        assert_eq!(binds.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.start().await.unwrap(), StartOutcome::AlreadyStarted);
    }

    #[tokio::test]
    async fn test_acquisition_failure_marks_failed() {
        let (session, binds) = session(true, CameraExecutor::PlatformDefault);
        let result = session.start().await;
        assert!(matches!(result, Err(SessionError::ProviderAcquisition(_))));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(binds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ended_scope_is_not_bound() {
        let (session, binds) = session(false, CameraExecutor::PlatformDefault);
        session.scope().end();
        let result = session.start().await;
        assert!(matches!(result, Err(SessionError::ScopeEnded)));
        assert_eq!(binds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dedicated_worker_stops_with_scope() {
        let (session, binds) = session(false, CameraExecutor::Dedicated);
        assert_eq!(session.start().await.unwrap(), StartOutcome::Bound);
        assert_eq!(binds.load(Ordering::SeqCst), 1);

        let handle = session.worker_handle().unwrap();
        assert!(handle.spawn(async { 1 }).await.is_ok());

        session.scope().end();
        assert!(handle.spawn(async { 1 }).await.is_err());
    }
}
