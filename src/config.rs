// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{CameraBackendType, CameraFormat, LensFacing};
use crate::capture::ShutterGuard;
use crate::constants::capture;
use crate::pipelines::photo::EncodingQuality;
use crate::session::{CameraExecutor, CaptureMode, LensSelector, SessionOptions};
use cosmic::cosmic_config::{self, CosmicConfigEntry, cosmic_config_derive::CosmicConfigEntry};
use cosmic::{Theme, theme};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::error;

/// Application ID, also the cosmic-config namespace
pub const APP_ID: &str = "io.github.viewfinder-app.Viewfinder";

/// Application theme preference
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum AppTheme {
    /// Follow system theme (dark or light based on system setting)
    #[default]
    System,
    /// Always use dark theme
    Dark,
    /// Always use light theme
    Light,
}

impl AppTheme {
    /// Get the COSMIC theme for this app theme preference
    pub fn theme(&self) -> Theme {
        match self {
            Self::Dark => {
                let mut theme = theme::system_dark();
                theme.theme_type.prefer_dark(Some(true));
                theme
            }
            Self::Light => {
                let mut theme = theme::system_light();
                theme.theme_type.prefer_dark(Some(false));
                theme
            }
            Self::System => theme::system_preference(),
        }
    }
}

/// Requested preview/capture resolution
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct FormatSettings {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, CosmicConfigEntry, Eq, PartialEq, Serialize, Deserialize)]
#[version = 1]
pub struct Config {
    /// Application theme preference (System, Dark, Light)
    pub app_theme: AppTheme,
    /// Camera backend to use (PipeWire or test pattern)
    pub backend: CameraBackendType,
    /// Which camera the session binds to
    pub lens_facing: LensFacing,
    /// Use the first camera when none reports `lens_facing`
    pub lens_fallback: bool,
    /// Latency/freshness trade-off for stills
    pub capture_mode: CaptureMode,
    /// JPEG quality
    pub photo_quality: EncodingQuality,
    /// Folder under the Pictures directory that receives photos
    pub photo_folder: String,
    /// Run camera startup on a dedicated worker owned by the screen
    pub dedicated_camera_worker: bool,
    /// Drop shutter presses closer than this to the previous one (0 = off)
    pub shutter_debounce_ms: u64,
    /// Replace the detected platform version (permission model selection)
    pub platform_version_override: Option<u32>,
    /// Requested resolution; `None` lets the camera decide
    pub preview_format: Option<FormatSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_theme: AppTheme::default(),
            backend: CameraBackendType::default(),
            lens_facing: LensFacing::Back,
            lens_fallback: true, // Desktop webcams rarely report a location
            capture_mode: CaptureMode::MinimizeLatency,
            photo_quality: EncodingQuality::High,
            photo_folder: capture::DEFAULT_PHOTO_FOLDER.to_string(),
            dedicated_camera_worker: false,
            shutter_debounce_ms: 0,
            platform_version_override: None,
            preview_format: None,
        }
    }
}

impl Config {
    /// Load the stored configuration
    ///
    /// Falls back to defaults (and no handler) when the config store is
    /// unavailable; entries that fail to parse keep their default.
    pub fn load() -> (Option<cosmic_config::Config>, Self) {
        match cosmic_config::Config::new(APP_ID, Self::VERSION) {
            Ok(handler) => {
                let config = match Self::get_entry(&handler) {
                    Ok(config) => config,
                    Err((errors, config)) => {
                        error!(?errors, "Errors loading config");
                        config
                    }
                };
                (Some(handler), config)
            }
            Err(err) => {
                error!(%err, "Failed to create config handler");
                (None, Self::default())
            }
        }
    }

    /// Directory photos are written to
    pub fn photo_dir(&self) -> PathBuf {
        crate::storage::default_photo_dir(&self.photo_folder)
    }

    pub fn camera_format(&self) -> Option<CameraFormat> {
        self.preview_format
            .filter(|f| f.width > 0 && f.height > 0)
            .map(|f| CameraFormat {
                width: f.width,
                height: f.height,
            })
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            selector: LensSelector::require(self.lens_facing).with_fallback(self.lens_fallback),
            capture_mode: self.capture_mode,
            quality: self.photo_quality,
            executor: if self.dedicated_camera_worker {
                CameraExecutor::Dedicated
            } else {
                CameraExecutor::PlatformDefault
            },
        }
    }

    pub fn shutter_guard(&self) -> ShutterGuard {
        ShutterGuard::new(Duration::from_millis(self.shutter_debounce_ms))
    }
}
