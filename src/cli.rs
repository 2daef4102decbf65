// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! - Listing available cameras
//! - Taking a photo through the same camera screen the GUI hosts

use std::path::PathBuf;
use std::sync::Arc;
use viewfinder::backends::camera::{CameraBackendType, CameraProvider};
use viewfinder::backends::camera::pipewire::GStreamerProvider;
use viewfinder::capture::CaptureOutcome;
use viewfinder::config::Config;
use viewfinder::errors::{AppError, AppResult, StorageError};
use viewfinder::notify::LogNotifier;
use viewfinder::screen::{CameraScreen, ScreenServices, ScreenState};

/// List all available cameras
pub fn list_cameras(config: &Config) -> AppResult<()> {
    let provider = GStreamerProvider::connect(config.backend, None)?;
    let cameras = provider.available_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        match camera.facing {
            Some(facing) => println!("      Facing: {}", facing),
            None => println!("      Facing: unknown"),
        }
        if !camera.path.is_empty() {
            println!("      Target: {}", camera.path);
        }
        println!();
    }

    Ok(())
}

/// Take a photo with the configured camera
///
/// Runs the full screen flow: permissions, session binding, one shutter
/// press. The photo lands in `output` when given, else the configured folder.
pub fn take_photo(
    config: &Config,
    output: Option<PathBuf>,
    test_pattern: bool,
) -> AppResult<()> {
    let mut config = config.clone();
    if test_pattern {
        config.backend = CameraBackendType::TestPattern;
    }

    let photo_dir = match output {
        Some(dir) if dir.exists() && !dir.is_dir() => {
            return Err(StorageError::CollectionUnavailable(format!(
                "Not a directory: {}",
                dir.display()
            ))
            .into());
        }
        Some(dir) => dir,
        None => config.photo_dir(),
    };
    let services = ScreenServices::desktop_in(&config, photo_dir, Arc::new(LogNotifier));

    let screen = CameraScreen::new(services, config.session_options(), config.shutter_guard());

    let runtime = tokio::runtime::Runtime::new()?;
    println!("Using backend: {}", config.backend);
    let result = runtime.block_on(capture_once(&screen));

    screen.destroy();
    result
}

async fn capture_once(screen: &CameraScreen) -> AppResult<()> {
    match screen.start().await {
        ScreenState::SessionActive { .. } => {}
        ScreenState::Terminated => return Err(AppError::PermissionDenied),
        other => return Err(AppError::CameraUnavailable(format!("{:?}", other))),
    }

    println!("Capturing...");
    match screen.shutter().await {
        Some(CaptureOutcome::Success(saved)) => {
            println!("Photo saved: {}", saved.path.display());
            Ok(())
        }
        Some(CaptureOutcome::Failure(e)) => Err(e.into()),
        None => Err(AppError::Other("Shutter press was ignored".to_string())),
    }
}
