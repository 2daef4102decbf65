// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the camera application
//!
//! The taxonomy follows the screen's failure modes: permission problems end
//! the screen, session problems leave it without a camera, and capture
//! problems are reported per request while the session stays usable.

use crate::backends::camera::types::BackendError;
use crate::constants::notices;
use std::fmt;

/// Result type for the command-line entry points
pub type AppResult<T> = Result<T, AppError>;

/// Errors that end a run of one of the binaries' commands
#[derive(Debug, Clone)]
pub enum AppError {
    /// The user did not grant the required permissions
    PermissionDenied,
    /// The screen could not bind a camera
    CameraUnavailable(String),
    /// The camera backend could not be reached
    Backend(BackendError),
    /// A capture request failed
    Capture(CaptureError),
    /// Media store errors
    Storage(StorageError),
    /// Terminal or runtime I/O
    Io(String),
    /// Generic error with message
    Other(String),
}

/// Permission broker errors
///
/// These describe failures of the request mechanism itself. A user refusing
/// a permission is not an error; it is reported as a denied grant.
#[derive(Debug, Clone)]
pub enum PermissionError {
    /// The desktop portal could not be reached
    PortalUnavailable(String),
    /// The portal answered but the request did not complete
    RequestFailed(String),
}

/// Camera session errors
#[derive(Debug, Clone)]
pub enum SessionError {
    /// The camera provider could not be acquired
    ProviderAcquisition(BackendError),
    /// The provider was acquired but binding the use cases failed
    Bind(BackendError),
    /// The lifecycle scope ended before the binding completed
    ScopeEnded,
    /// The dedicated camera worker was shut down while work was pending
    ExecutorShutdown,
}

/// Capture request errors
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// The capture pipeline has not been bound to a camera yet
    NotBound,
    /// No frame arrived from the camera in time
    NoFrame,
    /// Encoding the frame failed
    Encoding(String),
    /// Writing to the media store failed
    Storage(String),
    /// The camera backend reported an error
    Backend(String),
}

/// Media store errors
#[derive(Debug, Clone)]
pub enum StorageError {
    /// The target collection does not exist and could not be created
    CollectionUnavailable(String),
    /// Filesystem error
    Io(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::PermissionDenied => write!(f, "{}", notices::PERMISSION_DENIED),
            AppError::CameraUnavailable(msg) => write!(f, "Camera unavailable: {}", msg),
            AppError::Backend(e) => write!(f, "Camera backend error: {}", e),
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Storage(e) => write!(f, "Storage error: {}", e),
            AppError::Io(msg) => write!(f, "I/O error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionError::PortalUnavailable(msg) => write!(f, "Portal unavailable: {}", msg),
            PermissionError::RequestFailed(msg) => write!(f, "Permission request failed: {}", msg),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::ProviderAcquisition(e) => {
                write!(f, "Failed to acquire camera provider: {}", e)
            }
            SessionError::Bind(e) => write!(f, "Failed to bind camera: {}", e),
            SessionError::ScopeEnded => write!(f, "Screen lifecycle ended during binding"),
            SessionError::ExecutorShutdown => write!(f, "Camera worker was shut down"),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NotBound => write!(f, "Capture pipeline is not bound to a camera"),
            CaptureError::NoFrame => write!(f, "No frame available for capture"),
            CaptureError::Encoding(msg) => write!(f, "Encoding failed: {}", msg),
            CaptureError::Storage(msg) => write!(f, "Save failed: {}", msg),
            CaptureError::Backend(msg) => write!(f, "Camera error: {}", msg),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::CollectionUnavailable(msg) => {
                write!(f, "Media collection unavailable: {}", msg)
            }
            StorageError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for PermissionError {}
impl std::error::Error for SessionError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for StorageError {}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<StorageError> for CaptureError {
    fn from(err: StorageError) -> Self {
        CaptureError::Storage(err.to_string())
    }
}

impl From<BackendError> for CaptureError {
    fn from(err: BackendError) -> Self {
        CaptureError::Backend(err.to_string())
    }
}

impl From<zbus::Error> for PermissionError {
    fn from(err: zbus::Error) -> Self {
        PermissionError::PortalUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_maps_into_capture_error() {
        let err: CaptureError = StorageError::Io("disk full".to_string()).into();
        assert!(matches!(err, CaptureError::Storage(ref msg) if msg.contains("disk full")));
    }

    #[test]
    fn test_app_error_display_prefixes() {
        let err: AppError = CaptureError::NotBound.into();
        assert!(err.to_string().starts_with("Capture error:"));
    }

    #[test]
    fn test_permission_denied_reads_like_the_notice() {
        assert_eq!(
            AppError::PermissionDenied.to_string(),
            "Permissions not granted by the user."
        );
    }

    #[test]
    fn test_io_error_maps_into_app_error() {
        let err: AppError = std::io::Error::other("tty gone").into();
        assert!(matches!(err, AppError::Io(ref msg) if msg.contains("tty gone")));
    }
}
