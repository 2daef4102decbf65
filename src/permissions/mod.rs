// SPDX-License-Identifier: GPL-3.0-only

//! Runtime permission gate
//!
//! The camera screen may only open the camera after every permission in the
//! required [`PermissionSet`] is granted. Which permissions are required
//! depends on the [`PlatformVersion`]: hosts using the scoped media model need
//! image read access, older hosts need broad storage write access.

mod portal;

pub use portal::DesktopPermissionBroker;

use crate::constants::permissions;
use crate::errors::PermissionError;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// A runtime permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Open the camera
    Camera,
    /// Read images from the shared collection (scoped media model)
    ReadMediaImages,
    /// Write to shared storage (legacy model)
    WriteExternalStorage,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::Camera => write!(f, "camera"),
            Permission::ReadMediaImages => write!(f, "read media images"),
            Permission::WriteExternalStorage => write!(f, "write external storage"),
        }
    }
}

/// Host platform version used to pick the storage permission model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlatformVersion(pub u32);

impl PlatformVersion {
    pub fn uses_scoped_media(self) -> bool {
        self.0 >= permissions::SCOPED_MEDIA_MIN_VERSION
    }
}

/// Ordered, duplicate-free set of permissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSet(Arc<[Permission]>);

impl PermissionSet {
    pub fn new(permissions: impl IntoIterator<Item = Permission>) -> Self {
        let mut unique: Vec<Permission> = Vec::new();
        for permission in permissions {
            if !unique.contains(&permission) {
                unique.push(permission);
            }
        }
        Self(unique.into())
    }

    /// Permissions the camera screen needs on `version`
    pub fn required_for(version: PlatformVersion) -> Self {
        let storage = if version.uses_scoped_media() {
            Permission::ReadMediaImages
        } else {
            Permission::WriteExternalStorage
        };
        Self::new([Permission::Camera, storage])
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Grant state of one permission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantStatus {
    Granted,
    Denied,
}

/// Per-permission results of a request
///
/// Permissions missing from the results count as denied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantResults(HashMap<Permission, GrantStatus>);

impl GrantResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, permission: Permission, status: GrantStatus) {
        self.0.insert(permission, status);
    }

    pub fn status(&self, permission: Permission) -> GrantStatus {
        self.0
            .get(&permission)
            .copied()
            .unwrap_or(GrantStatus::Denied)
    }

    /// Permissions of `set` that were not granted, in set order
    pub fn denied(&self, set: &PermissionSet) -> Vec<Permission> {
        set.iter()
            .filter(|p| self.status(*p) != GrantStatus::Granted)
            .collect()
    }
}

impl FromIterator<(Permission, GrantStatus)> for GrantResults {
    fn from_iter<I: IntoIterator<Item = (Permission, GrantStatus)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Host permission mechanism
pub trait PermissionBroker: Send + Sync {
    /// Platform version that decides the storage permission model
    fn platform_version(&self) -> PlatformVersion;

    /// Current grant state, without prompting
    fn status(&self, permission: Permission) -> GrantStatus;

    /// Ask the user (or the host) for `permissions`. Resolves exactly once.
    fn request(
        &self,
        permissions: PermissionSet,
    ) -> BoxFuture<'static, Result<GrantResults, PermissionError>>;
}

/// Outcome of evaluating grant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Granted,
    Denied { denied: Vec<Permission> },
}

/// Checks and requests the permissions the camera screen needs
#[derive(Clone)]
pub struct PermissionGate {
    broker: Arc<dyn PermissionBroker>,
    required: PermissionSet,
}

impl PermissionGate {
    pub fn new(broker: Arc<dyn PermissionBroker>) -> Self {
        let version = broker.platform_version();
        let required = PermissionSet::required_for(version);
        info!(
            version = version.0,
            scoped_media = version.uses_scoped_media(),
            "Required permissions: {:?}",
            required
        );
        Self { broker, required }
    }

    /// The set required on this platform
    pub fn required(&self) -> &PermissionSet {
        &self.required
    }

    /// Whether every permission in `set` is already granted
    pub fn check_granted(&self, set: &PermissionSet) -> bool {
        set.iter()
            .all(|p| self.broker.status(p) == GrantStatus::Granted)
    }

    /// Request `set` from the host
    ///
    /// A broker failure is logged and reported as an empty result, which
    /// denies every permission.
    pub async fn request(&self, set: &PermissionSet) -> GrantResults {
        match self.broker.request(set.clone()).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "Permission request failed");
                GrantResults::new()
            }
        }
    }

    /// All-or-nothing decision for `set`
    pub fn evaluate(set: &PermissionSet, results: &GrantResults) -> GateDecision {
        let denied = results.denied(set);
        if denied.is_empty() {
            GateDecision::Granted
        } else {
            GateDecision::Denied { denied }
        }
    }
}
