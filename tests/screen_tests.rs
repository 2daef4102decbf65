// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the camera screen
//!
//! Every host seam is replaced by an in-memory double: the permission broker
//! answers from a fixed table, the provider binds a still source that can be
//! told to fail, and the media store keeps photos in memory.

use chrono::{Local, NaiveDateTime};
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use viewfinder::backends::camera::{
    BackendError, BackendResult, CameraDevice, CameraFrame, CameraProvider, LensFacing,
    ProviderSource,
};
use viewfinder::capture::{CaptureOutcome, ShutterGuard};
use viewfinder::errors::{CaptureError, PermissionError, StorageError};
use viewfinder::notify::{Notice, ResultNotifier};
use viewfinder::permissions::{
    GrantResults, GrantStatus, Permission, PermissionBroker, PermissionSet, PlatformVersion,
};
use viewfinder::screen::{CameraScreen, ScreenServices, ScreenState};
use viewfinder::session::{
    CaptureMode, ImageCapture, LensSelector, LifecycleScope, Preview, ScopedResource,
    SessionOptions, StillSource,
};
use viewfinder::storage::{DestinationDescriptor, MediaCollection, MediaDestination, MediaStore};

// ===== Test doubles =====

struct TableBroker {
    version: PlatformVersion,
    granted: HashSet<Permission>,
    /// `None` makes the request fail
    answer: Option<GrantResults>,
    requests: AtomicUsize,
}

impl TableBroker {
    fn new(version: u32, granted: &[Permission], answer: Option<GrantResults>) -> Self {
        Self {
            version: PlatformVersion(version),
            granted: granted.iter().copied().collect(),
            answer,
            requests: AtomicUsize::new(0),
        }
    }
}

impl PermissionBroker for TableBroker {
    fn platform_version(&self) -> PlatformVersion {
        self.version
    }

    fn status(&self, permission: Permission) -> GrantStatus {
        if self.granted.contains(&permission) {
            GrantStatus::Granted
        } else {
            GrantStatus::Denied
        }
    }

    fn request(
        &self,
        _permissions: PermissionSet,
    ) -> BoxFuture<'static, Result<GrantResults, PermissionError>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let answer = self.answer.clone();
        Box::pin(async move {
            tokio::task::yield_now().await;
            answer.ok_or_else(|| PermissionError::RequestFailed("dialog dismissed".to_string()))
        })
    }
}

struct FakeStill {
    fail: Arc<AtomicBool>,
    sequence: AtomicUsize,
}

impl StillSource for FakeStill {
    fn grab(
        &self,
        _mode: CaptureMode,
    ) -> BoxFuture<'static, Result<Arc<CameraFrame>, CaptureError>> {
        let fail = self.fail.load(Ordering::SeqCst);
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) as u64;
        Box::pin(async move {
            tokio::task::yield_now().await;
            if fail {
                return Err(CaptureError::Backend("simulated sensor error".to_string()));
            }
            Ok(Arc::new(CameraFrame {
                width: 4,
                height: 4,
                data: [200u8, 100, 50, 255].repeat(16).into(),
                sequence,
                captured_at: Instant::now(),
            }))
        })
    }
}

struct Binding {
    capture: ImageCapture,
    releases: Arc<AtomicUsize>,
}

impl ScopedResource for Binding {
    fn name(&self) -> &str {
        "fake camera binding"
    }

    fn release(self: Box<Self>) {
        self.capture.detach();
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CameraStats {
    binds: AtomicUsize,
    releases: Arc<AtomicUsize>,
    fail_capture: Arc<AtomicBool>,
}

struct FakeProvider {
    stats: Arc<CameraStats>,
}

impl CameraProvider for FakeProvider {
    fn available_cameras(&self) -> Vec<CameraDevice> {
        vec![CameraDevice {
            name: "Rear".to_string(),
            path: "rear".to_string(),
            metadata_path: None,
            facing: Some(LensFacing::Back),
        }]
    }

    fn bind_to_lifecycle(
        &self,
        scope: &LifecycleScope,
        selector: &LensSelector,
        _preview: &Preview,
        capture: &ImageCapture,
    ) -> BackendResult<()> {
        let cameras = self.available_cameras();
        selector
            .select(&cameras)
            .ok_or_else(|| BackendError::DeviceNotFound("rear".to_string()))?;

        self.stats.binds.fetch_add(1, Ordering::SeqCst);
        capture.attach(Arc::new(FakeStill {
            fail: Arc::clone(&self.stats.fail_capture),
            sequence: AtomicUsize::new(0),
        }));
        scope.adopt(Box::new(Binding {
            capture: capture.clone(),
            releases: Arc::clone(&self.stats.releases),
        }));
        Ok(())
    }
}

struct FakeSource {
    stats: Arc<CameraStats>,
    available: bool,
}

impl ProviderSource for FakeSource {
    fn acquire(&self) -> BoxFuture<'static, BackendResult<Arc<dyn CameraProvider>>> {
        let stats = Arc::clone(&self.stats);
        let available = self.available;
        Box::pin(async move {
            tokio::task::yield_now().await;
            if !available {
                return Err(BackendError::NotAvailable("camera stack missing".to_string()));
            }
            Ok(Arc::new(FakeProvider { stats }) as Arc<dyn CameraProvider>)
        })
    }
}

#[derive(Default)]
struct MemoryStore {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MediaStore for MemoryStore {
    fn insert(
        &self,
        collection: MediaCollection,
        descriptor: &DestinationDescriptor,
    ) -> Result<MediaDestination, StorageError> {
        Ok(MediaDestination {
            collection,
            display_name: descriptor.display_name.clone(),
            path: PathBuf::from("/memory").join(&descriptor.display_name),
        })
    }

    fn write(&self, destination: &MediaDestination, data: &[u8]) -> Result<(), StorageError> {
        self.saved
            .lock()
            .unwrap()
            .push((destination.display_name.clone(), data.to_vec()));
        Ok(())
    }

    fn discard(&self, _destination: &MediaDestination) {}
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }
}

impl ResultNotifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

struct Harness {
    screen: CameraScreen,
    broker: Arc<TableBroker>,
    stats: Arc<CameraStats>,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
}

fn harness(broker: TableBroker, camera_available: bool) -> Harness {
    let broker = Arc::new(broker);
    let stats = Arc::new(CameraStats::default());
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let services = ScreenServices {
        broker: broker.clone(),
        provider_source: Arc::new(FakeSource {
            stats: Arc::clone(&stats),
            available: camera_available,
        }),
        store: store.clone(),
        notifier: notifier.clone(),
    };
    let screen = CameraScreen::new(services, SessionOptions::default(), ShutterGuard::disabled());

    Harness {
        screen,
        broker,
        stats,
        store,
        notifier,
    }
}

fn all_granted(version: u32) -> TableBroker {
    TableBroker::new(
        version,
        &[
            Permission::Camera,
            Permission::ReadMediaImages,
            Permission::WriteExternalStorage,
        ],
        None,
    )
}

async fn active(version: u32) -> Harness {
    let h = harness(all_granted(version), true);
    assert_eq!(
        h.screen.start().await,
        ScreenState::SessionActive { in_flight: 0 }
    );
    h
}

// ===== Startup =====

#[tokio::test]
async fn test_granted_permissions_bind_without_request() {
    let h = active(33).await;
    assert_eq!(h.broker.requests.load(Ordering::SeqCst), 0);
    assert_eq!(h.stats.binds.load(Ordering::SeqCst), 1);
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_granted_request_starts_session() {
    let answer: GrantResults = [
        (Permission::Camera, GrantStatus::Granted),
        (Permission::WriteExternalStorage, GrantStatus::Granted),
    ]
    .into_iter()
    .collect();
    let h = harness(TableBroker::new(32, &[], Some(answer)), true);

    assert_eq!(
        h.screen.start().await,
        ScreenState::SessionActive { in_flight: 0 }
    );
    assert_eq!(h.broker.requests.load(Ordering::SeqCst), 1);
    assert_eq!(h.stats.binds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_any_single_denial_terminates() {
    for version in [32, 33] {
        let required = PermissionSet::required_for(PlatformVersion(version));
        for refused in required.iter() {
            let answer: GrantResults = required
                .iter()
                .map(|p| {
                    let status = if p == refused {
                        GrantStatus::Denied
                    } else {
                        GrantStatus::Granted
                    };
                    (p, status)
                })
                .collect();
            let h = harness(TableBroker::new(version, &[], Some(answer)), true);

            assert_eq!(h.screen.start().await, ScreenState::Terminated);
            assert_eq!(
                h.notifier.messages(),
                vec!["Permissions not granted by the user.".to_string()]
            );
            assert_eq!(h.stats.binds.load(Ordering::SeqCst), 0);
            assert!(!h.screen.session().scope().is_active());
        }
    }
}

#[tokio::test]
async fn test_failed_request_counts_as_denial() {
    let h = harness(TableBroker::new(33, &[Permission::Camera], None), true);
    assert_eq!(h.screen.start().await, ScreenState::Terminated);
    assert_eq!(h.stats.binds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_racing_starts_bind_once() {
    let h = harness(all_granted(33), true);
    let (a, b) = futures::join!(h.screen.start(), h.screen.start());

    let active = [a, b]
        .iter()
        .filter(|s| matches!(s, ScreenState::SessionActive { .. }))
        .count();
    assert_eq!(active, 1);
    assert_eq!(h.stats.binds.load(Ordering::SeqCst), 1);

    // A direct session restart does not bind again either
    h.screen.session().start().await.unwrap();
    assert_eq!(h.stats.binds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_camera_unavailable_is_reported() {
    let h = harness(all_granted(33), false);
    assert_eq!(h.screen.start().await, ScreenState::Unavailable);
    assert_eq!(h.notifier.messages(), vec!["error".to_string()]);

    let outcome = h.screen.shutter().await;
    assert!(matches!(
        outcome,
        Some(CaptureOutcome::Failure(CaptureError::NotBound))
    ));
    assert_eq!(h.screen.state(), ScreenState::Unavailable);
}

// ===== Capture =====

#[tokio::test]
async fn test_capture_names_photo_after_capture_time() {
    let h = active(33).await;

    let before = Local::now().format("%Y%m%d%H%M%S").to_string();
    let outcome = h.screen.shutter().await;
    let after = Local::now().format("%Y%m%d%H%M%S").to_string();

    let Some(CaptureOutcome::Success(saved)) = outcome else {
        panic!("capture failed: {:?}", outcome);
    };

    let stem = saved.display_name.strip_suffix(".jpg").unwrap();
    assert_eq!(stem.len(), 14);
    assert!(stem.chars().all(|c| c.is_ascii_digit()));
    assert!(NaiveDateTime::parse_from_str(stem, "%Y%m%d%H%M%S").is_ok());
    assert!(before.as_str() <= stem && stem <= after.as_str());

    assert_eq!(h.notifier.messages(), vec!["success".to_string()]);

    let saved_bytes = h.store.saved.lock().unwrap();
    assert_eq!(saved_bytes.len(), 1);
    assert_eq!(&saved_bytes[0].1[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_failed_capture_keeps_session_usable() {
    let h = active(33).await;
    h.stats.fail_capture.store(true, Ordering::SeqCst);

    let outcome = h.screen.shutter().await;
    assert!(matches!(outcome, Some(CaptureOutcome::Failure(_))));
    assert_eq!(h.notifier.messages(), vec!["error".to_string()]);
    assert_eq!(h.screen.state(), ScreenState::SessionActive { in_flight: 0 });

    h.stats.fail_capture.store(false, Ordering::SeqCst);
    let outcome = h.screen.shutter().await;
    assert!(matches!(outcome, Some(CaptureOutcome::Success(_))));
    assert_eq!(
        h.notifier.messages(),
        vec!["error".to_string(), "success".to_string()]
    );
}

#[tokio::test]
async fn test_back_to_back_triggers_resolve_independently() {
    let h = active(33).await;

    let (first, second) = futures::join!(h.screen.shutter(), h.screen.shutter());
    assert!(matches!(first, Some(CaptureOutcome::Success(_))));
    assert!(matches!(second, Some(CaptureOutcome::Success(_))));

    assert_eq!(
        h.notifier.messages(),
        vec!["success".to_string(), "success".to_string()]
    );
    assert_eq!(h.store.saved.lock().unwrap().len(), 2);
    assert_eq!(h.screen.state(), ScreenState::SessionActive { in_flight: 0 });
}

#[tokio::test]
async fn test_shutter_guard_drops_rapid_presses() {
    let broker = Arc::new(all_granted(33));
    let stats = Arc::new(CameraStats::default());
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let services = ScreenServices {
        broker,
        provider_source: Arc::new(FakeSource {
            stats,
            available: true,
        }),
        store: store.clone(),
        notifier: notifier.clone(),
    };
    let screen = CameraScreen::new(
        services,
        SessionOptions::default(),
        ShutterGuard::new(std::time::Duration::from_secs(60)),
    );
    screen.start().await;

    assert!(screen.shutter().await.is_some());
    assert!(screen.shutter().await.is_none());
    assert_eq!(notifier.messages(), vec!["success".to_string()]);
    assert_eq!(store.saved.lock().unwrap().len(), 1);
}

// ===== Teardown =====

#[tokio::test]
async fn test_destroy_releases_camera() {
    let h = active(33).await;
    assert!(h.screen.session().image_capture().is_bound());

    h.screen.destroy();
    assert_eq!(h.screen.state(), ScreenState::Destroyed);
    assert_eq!(h.stats.releases.load(Ordering::SeqCst), 1);
    assert!(!h.screen.session().image_capture().is_bound());
    assert!(h.screen.shutter().await.is_none());

    // Idempotent
    h.screen.destroy();
    assert_eq!(h.stats.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_destroy_before_start_prevents_binding() {
    let h = harness(all_granted(33), true);
    h.screen.destroy();
    assert_eq!(h.screen.start().await, ScreenState::Destroyed);
    assert_eq!(h.stats.binds.load(Ordering::SeqCst), 0);
}
