// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use viewfinder::Config;
use viewfinder::backends::camera::{CameraBackendType, LensFacing};
use viewfinder::config::FormatSettings;
use viewfinder::pipelines::photo::EncodingQuality;
use viewfinder::session::{CameraExecutor, CaptureMode};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.lens_facing, LensFacing::Back);
    assert!(
        config.lens_fallback,
        "Webcams without a location should still be usable by default"
    );
    assert_eq!(config.capture_mode, CaptureMode::MinimizeLatency);
    assert_eq!(config.photo_quality, EncodingQuality::High);
    assert_eq!(config.backend, CameraBackendType::PipeWire);
}

#[test]
fn test_default_session_options() {
    let options = Config::default().session_options();

    assert_eq!(options.selector.facing(), LensFacing::Back);
    assert_eq!(options.capture_mode, CaptureMode::MinimizeLatency);
    assert_eq!(options.executor, CameraExecutor::PlatformDefault);
}

#[test]
fn test_dedicated_worker_option() {
    let config = Config {
        dedicated_camera_worker: true,
        ..Config::default()
    };
    assert_eq!(config.session_options().executor, CameraExecutor::Dedicated);
}

#[test]
fn test_shutter_guard_follows_debounce() {
    assert!(!Config::default().shutter_guard().is_enabled());

    let config = Config {
        shutter_debounce_ms: 250,
        ..Config::default()
    };
    assert!(config.shutter_guard().is_enabled());
}

#[test]
fn test_camera_format_ignores_empty_resolution() {
    let mut config = Config::default();
    assert_eq!(config.camera_format(), None);

    config.preview_format = Some(FormatSettings {
        width: 0,
        height: 720,
    });
    assert_eq!(config.camera_format(), None);

    config.preview_format = Some(FormatSettings {
        width: 1280,
        height: 720,
    });
    let format = config.camera_format().unwrap();
    assert_eq!((format.width, format.height), (1280, 720));
}

#[test]
fn test_photo_dir_uses_folder() {
    let config = Config {
        photo_folder: "viewfinder-test".to_string(),
        ..Config::default()
    };
    assert!(config.photo_dir().ends_with("viewfinder-test"));
}
