// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Permission model constants
pub mod permissions {
    /// First platform version that uses the scoped media model
    /// (fine-grained image read access instead of broad storage write access)
    pub const SCOPED_MEDIA_MIN_VERSION: u32 = 33;

    /// Platform version reported for unsandboxed hosts
    pub const LEGACY_PLATFORM_VERSION: u32 = 32;

    /// Present inside every Flatpak sandbox
    pub const FLATPAK_INFO_PATH: &str = "/.flatpak-info";

    /// Device node prefix probed for direct camera access outside the sandbox
    pub const VIDEO_DEVICE_PREFIX: &str = "video";
}

/// User-facing notice texts
///
/// These are fixed strings; the application is not localized.
pub mod notices {
    /// Shown after a photo has been written to the media store
    pub const SUCCESS: &str = "success";

    /// Shown for any capture failure, and when the camera cannot be opened
    pub const ERROR: &str = "error";

    /// Shown right before the screen closes because permissions were refused
    pub const PERMISSION_DENIED: &str = "Permissions not granted by the user.";

    /// Distance between the bottom edge of the window and capture notices
    pub const BOTTOM_OFFSET_PX: f32 = 320.0;
}

/// Capture destination naming
pub mod capture {
    /// chrono format for the display name: 4-digit year, then 2-digit
    /// month, day, hour, minute and second with no separators
    pub const FILENAME_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

    /// Extension for captured stills
    pub const IMAGE_EXTENSION: &str = "jpg";

    /// MIME type recorded for captured stills
    pub const IMAGE_MIME_TYPE: &str = "image/jpeg";

    /// Subfolder of the user's Pictures directory that receives photos
    pub const DEFAULT_PHOTO_FOLDER: &str = "viewfinder";
}

/// GStreamer pipeline settings
pub mod pipeline {
    /// Maximum buffer queue size (keep small for low latency)
    pub const MAX_BUFFERS: u32 = 2;

    /// Pixel format requested from videoconvert for both preview and stills
    pub const OUTPUT_FORMAT: &str = "RGBA";

    /// Preview frames buffered towards the UI before new ones are dropped
    pub const PREVIEW_CHANNEL_CAPACITY: usize = 4;

    /// Get number of threads for videoconvert based on available CPU threads
    pub fn videoconvert_threads() -> u32 {
        std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(4)
    }
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Pipeline playing state timeout on start
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// How long a short notice stays on screen
    pub const NOTICE_SHORT: Duration = Duration::from_millis(2000);

    /// How long a long notice stays on screen
    pub const NOTICE_LONG: Duration = Duration::from_millis(3500);

    /// Upper bound for waiting on a frame newer than the shutter press
    pub const FRESH_FRAME_TIMEOUT: Duration = Duration::from_secs(2);

    /// Upper bound for the first frame after the pipeline starts playing
    pub const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);
}

/// Dedicated camera worker
pub mod worker {
    /// Thread name of the single-worker runtime used for camera startup
    pub const THREAD_NAME: &str = "camera-worker";
}

/// UI layout constants
pub mod ui {
    /// Outer diameter of the shutter button
    pub const CAPTURE_BUTTON_OUTER: f32 = 72.0;

    /// Inner diameter of the shutter button
    pub const CAPTURE_BUTTON_INNER: f32 = 60.0;

    /// Corner radius that turns the inner square into a circle
    pub const CAPTURE_BUTTON_RADIUS: f32 = 30.0;

    /// Background alpha for overlays drawn on top of the preview
    pub const OVERLAY_BACKGROUND_ALPHA: f32 = 0.6;

    /// Corner radius of notice bubbles
    pub const NOTICE_RADIUS: f32 = 16.0;

    /// Minimum window size
    pub const MIN_WIDTH: f32 = 360.0;
    pub const MIN_HEIGHT: f32 = 240.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_durations_ordered() {
        assert!(timing::NOTICE_SHORT < timing::NOTICE_LONG);
    }

    #[test]
    fn test_legacy_version_below_threshold() {
        assert!(permissions::LEGACY_PLATFORM_VERSION < permissions::SCOPED_MEDIA_MIN_VERSION);
    }
}
