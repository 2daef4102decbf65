// SPDX-License-Identifier: GPL-3.0-only

//! Desktop permission broker
//!
//! Inside a Flatpak sandbox camera access goes through the xdg-desktop-portal
//! Camera interface. On the host the camera is usable when a video device node
//! is accessible or PipeWire is running. Storage permissions map to access
//! checks on the Pictures directory and the photo folder.

use super::{GrantResults, GrantStatus, Permission, PermissionBroker, PermissionSet, PlatformVersion};
use crate::constants::permissions;
use crate::errors::PermissionError;
use futures::StreamExt;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

const PORTAL_DESTINATION: &str = "org.freedesktop.portal.Desktop";
const PORTAL_PATH: &str = "/org/freedesktop/portal/desktop";
const CAMERA_INTERFACE: &str = "org.freedesktop.portal.Camera";
const REQUEST_INTERFACE: &str = "org.freedesktop.portal.Request";

/// Permission broker for the Linux desktop
#[derive(Debug, Clone)]
pub struct DesktopPermissionBroker {
    sandboxed: bool,
    version: PlatformVersion,
    pictures_dir: PathBuf,
    photo_dir: PathBuf,
    camera_granted: Arc<AtomicBool>,
    synthetic_camera: bool,
}

impl DesktopPermissionBroker {
    /// Broker for this process; `version_override` replaces the detected version
    pub fn new(photo_dir: PathBuf, version_override: Option<u32>) -> Self {
        let sandboxed = Path::new(permissions::FLATPAK_INFO_PATH).exists();
        let detected = if sandboxed {
            permissions::SCOPED_MEDIA_MIN_VERSION
        } else {
            permissions::LEGACY_PLATFORM_VERSION
        };
        let version = PlatformVersion(version_override.unwrap_or(detected));
        // Relative paths have an empty parent
        let photo_dir = std::path::absolute(&photo_dir).unwrap_or(photo_dir);
        let pictures_dir = photo_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| photo_dir.clone());

        info!(
            sandboxed,
            version = version.0,
            photo_dir = %photo_dir.display(),
            "Desktop permission broker"
        );

        Self {
            sandboxed,
            version,
            pictures_dir,
            photo_dir,
            camera_granted: Arc::new(AtomicBool::new(false)),
            synthetic_camera: false,
        }
    }

    /// The camera is a generated test source; camera access is not needed
    pub fn with_synthetic_camera(mut self) -> Self {
        self.synthetic_camera = true;
        self
    }

    fn camera_status(&self) -> GrantStatus {
        let granted = if self.synthetic_camera {
            true
        } else if self.sandboxed {
            self.camera_granted.load(Ordering::Acquire)
        } else {
            host_camera_accessible()
        };
        grant(granted)
    }
}

impl PermissionBroker for DesktopPermissionBroker {
    fn platform_version(&self) -> PlatformVersion {
        self.version
    }

    fn status(&self, permission: Permission) -> GrantStatus {
        match permission {
            Permission::Camera => self.camera_status(),
            Permission::ReadMediaImages => grant(path_access(&self.pictures_dir, libc::R_OK)),
            Permission::WriteExternalStorage => grant(
                self.photo_dir.is_dir() && path_access(&self.photo_dir, libc::W_OK | libc::X_OK),
            ),
        }
    }

    fn request(
        &self,
        permissions: PermissionSet,
    ) -> BoxFuture<'static, Result<GrantResults, PermissionError>> {
        let broker = self.clone();
        Box::pin(async move {
            let mut results = GrantResults::new();
            for permission in permissions.iter() {
                let status = match permission {
                    Permission::Camera if broker.sandboxed && !broker.synthetic_camera => {
                        let granted = request_portal_camera_access().await?;
                        broker.camera_granted.store(granted, Ordering::Release);
                        grant(granted)
                    }
                    Permission::WriteExternalStorage => {
                        if let Err(e) = std::fs::create_dir_all(&broker.photo_dir) {
                            warn!(
                                path = %broker.photo_dir.display(),
                                error = %e,
                                "Cannot create photo directory"
                            );
                        }
                        broker.status(permission)
                    }
                    other => broker.status(other),
                };
                debug!(permission = %permission, status = ?status, "Permission result");
                results.insert(permission, status);
            }
            Ok(results)
        })
    }
}

fn grant(granted: bool) -> GrantStatus {
    if granted {
        GrantStatus::Granted
    } else {
        GrantStatus::Denied
    }
}

/// access(2) check for the real user
fn path_access(path: &Path, mode: libc::c_int) -> bool {
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(c_path.as_ptr(), mode) == 0 }
}

/// Any `/dev/video*` node we can open, or a running PipeWire daemon
fn host_camera_accessible() -> bool {
    let device_accessible = std::fs::read_dir("/dev")
        .map(|entries| {
            entries.flatten().any(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with(permissions::VIDEO_DEVICE_PREFIX)
                    && path_access(&entry.path(), libc::R_OK | libc::W_OK)
            })
        })
        .unwrap_or(false);

    device_accessible
        || std::env::var_os("XDG_RUNTIME_DIR")
            .map(|dir| Path::new(&dir).join("pipewire-0").exists())
            .unwrap_or(false)
}

/// Run the portal's AccessCamera request and wait for the user's answer
async fn request_portal_camera_access() -> Result<bool, PermissionError> {
    let connection = zbus::Connection::session().await?;

    let camera = zbus::Proxy::new(&connection, PORTAL_DESTINATION, PORTAL_PATH, CAMERA_INTERFACE)
        .await?;

    let present: bool = camera.get_property("IsCameraPresent").await?;
    if !present {
        info!("Portal reports no camera");
        return Ok(false);
    }

    let token = format!("viewfinder_{}", uuid::Uuid::new_v4().simple());
    let sender = connection
        .unique_name()
        .ok_or_else(|| PermissionError::PortalUnavailable("No unique bus name".to_string()))?
        .as_str()
        .trim_start_matches(':')
        .replace('.', "_");
    let request_path = format!("{}/request/{}/{}", PORTAL_PATH, sender, token);

    // Subscribe before calling so the response cannot be missed
    let request = zbus::Proxy::new(
        &connection,
        PORTAL_DESTINATION,
        request_path.as_str(),
        REQUEST_INTERFACE,
    )
    .await?;
    let mut responses = request.receive_signal("Response").await?;

    let mut options: HashMap<&str, Value> = HashMap::new();
    options.insert("handle_token", Value::new(token.as_str()));

    let handle: OwnedObjectPath = camera
        .call("AccessCamera", &(options,))
        .await
        .map_err(|e| PermissionError::RequestFailed(e.to_string()))?;
    debug!(handle = %handle.as_str(), "Camera access requested");

    let message = responses.next().await.ok_or_else(|| {
        PermissionError::RequestFailed("Portal closed the request".to_string())
    })?;
    let (response, _results): (u32, HashMap<String, OwnedValue>) = message
        .body()
        .deserialize()
        .map_err(|e| PermissionError::RequestFailed(e.to_string()))?;

    info!(response, "Portal camera access response");
    Ok(response == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("viewfinder-perm-{}-{}", tag, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_version_override() {
        let broker = DesktopPermissionBroker::new(temp_dir("version"), Some(34));
        assert_eq!(broker.platform_version(), PlatformVersion(34));
    }

    #[tokio::test]
    async fn test_storage_request_creates_photo_dir() {
        let photo_dir = temp_dir("storage");
        let broker = DesktopPermissionBroker::new(photo_dir.clone(), Some(32));
        assert_eq!(
            broker.status(Permission::WriteExternalStorage),
            GrantStatus::Denied
        );

        let set = PermissionSet::new([Permission::WriteExternalStorage]);
        let results = broker.request(set).await.unwrap();
        assert_eq!(
            results.status(Permission::WriteExternalStorage),
            GrantStatus::Granted
        );
        assert!(photo_dir.is_dir());
        let _ = std::fs::remove_dir_all(&photo_dir);
    }

    #[test]
    fn test_relative_photo_dir_checks_its_real_parent() {
        // Parent is the working directory, which the test can read
        let broker = DesktopPermissionBroker::new(PathBuf::from("shots"), Some(33));
        assert!(broker.photo_dir.is_absolute());
        assert_eq!(
            broker.status(Permission::ReadMediaImages),
            GrantStatus::Granted
        );
    }

    #[test]
    fn test_synthetic_camera_is_granted() {
        let broker =
            DesktopPermissionBroker::new(temp_dir("synthetic"), None).with_synthetic_camera();
        assert_eq!(broker.status(Permission::Camera), GrantStatus::Granted);
    }

    #[test]
    fn test_missing_path_is_not_accessible() {
        assert!(!path_access(&temp_dir("missing"), libc::R_OK));
    }
}
