// SPDX-License-Identifier: GPL-3.0-only

//! PipeWire camera enumeration
//!
//! Cameras are discovered with `pw-cli ls Node`. The lens location is not part
//! of the listing, so each camera is queried with `pw-cli info <id>` for
//! `api.libcamera.location`.

use super::super::types::{CameraDevice, LensFacing};
use tracing::{debug, info, warn};

/// Check whether the GStreamer PipeWire source is installed
pub fn is_pipewire_available() -> bool {
    if gstreamer::init().is_err() {
        warn!("GStreamer init failed");
        return false;
    }

    gstreamer::ElementFactory::make("pipewiresrc")
        .build()
        .is_ok()
}

/// Enumerate cameras using PipeWire
///
/// Returns `None` when PipeWire is not usable. When PipeWire works but
/// `pw-cli` is missing, a single auto-selected default camera is returned.
pub fn enumerate_pipewire_cameras() -> Option<Vec<CameraDevice>> {
    debug!("Attempting to enumerate cameras via PipeWire");

    if !is_pipewire_available() {
        debug!("pipewiresrc not available");
        return None;
    }

    if let Some(cameras) = try_enumerate_with_pw_cli() {
        debug!(count = cameras.len(), "Found PipeWire cameras");
        return Some(cameras);
    }

    info!("Using PipeWire auto-selection (default camera)");
    Some(vec![CameraDevice {
        name: "Default Camera (PipeWire)".to_string(),
        path: String::new(),
        metadata_path: None,
        facing: None,
    }])
}

fn try_enumerate_with_pw_cli() -> Option<Vec<CameraDevice>> {
    let output = std::process::Command::new("pw-cli")
        .args(["ls", "Node"])
        .output()
        .ok()?;

    if !output.status.success() {
        debug!("pw-cli command failed");
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut cameras = parse_node_listing(&stdout);

    for camera in cameras.iter_mut().filter(|c| c.facing.is_none()) {
        if let Some(id) = camera.metadata_path.as_deref() {
            camera.facing = query_node_location(id);
        }
    }

    if cameras.is_empty() {
        debug!("No cameras found via pw-cli");
        None
    } else {
        Some(cameras)
    }
}

#[derive(Default)]
struct NodeBlock {
    id: Option<String>,
    serial: Option<String>,
    name: Option<String>,
    location: Option<String>,
    is_video_source: bool,
}

impl NodeBlock {
    fn into_camera(self) -> Option<CameraDevice> {
        if !self.is_video_source {
            return None;
        }
        let id = self.id?;
        let name = self.name?;
        let path = self.serial.unwrap_or_else(|| id.clone());
        let facing = self.location.as_deref().and_then(LensFacing::from_location);

        debug!(id = %id, name = %name, path = %path, facing = ?facing, "Found video camera");
        Some(CameraDevice {
            name,
            path,
            metadata_path: Some(id),
            facing,
        })
    }
}

/// Parse the output of `pw-cli ls Node` into video source devices
pub fn parse_node_listing(listing: &str) -> Vec<CameraDevice> {
    let mut cameras = Vec::new();
    let mut current = NodeBlock::default();

    for line in listing.lines() {
        let trimmed = line.trim();

        // "id 76, type PipeWire:Interface:Node/3"
        if trimmed.starts_with("id ") && trimmed.contains("type PipeWire:Interface:Node") {
            let finished = std::mem::take(&mut current);
            cameras.extend(finished.into_camera());

            if let Some(id_str) = trimmed.strip_prefix("id ")
                && let Some(id_num) = id_str.split(',').next()
            {
                current.id = Some(id_num.trim().to_string());
            }
            continue;
        }

        if trimmed.contains("media.class") && trimmed.contains("\"Video/Source\"") {
            current.is_video_source = true;
        } else if trimmed.contains("object.serial") {
            current.serial = extract_quoted_value(trimmed);
        } else if trimmed.contains("node.description") {
            current.name = extract_quoted_value(trimmed);
        } else if trimmed.contains("api.libcamera.location") {
            current.location = extract_quoted_value(trimmed);
        }
    }

    cameras.extend(current.into_camera());
    cameras
}

/// Extract quoted value from a property line (e.g., 'property = "value"' -> "value")
fn extract_quoted_value(line: &str) -> Option<String> {
    let start = line.find('"')?;
    let end = line[start + 1..].find('"')?;
    Some(line[start + 1..start + 1 + end].to_string())
}

fn query_node_location(node_id: &str) -> Option<LensFacing> {
    let output = match std::process::Command::new("pw-cli")
        .args(["info", node_id])
        .output()
    {
        Ok(output) if output.status.success() => output,
        _ => {
            debug!(node_id, "Failed to query node info for location");
            return None;
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.contains("api.libcamera.location"))
        .find_map(extract_quoted_value)
        .and_then(|value| {
            debug!(node_id, location = %value, "Found location from pw-cli info");
            LensFacing::from_location(&value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
	id 31, type PipeWire:Interface:Node/3
 		object.serial = "31"
 		node.description = "Dummy-Driver"
 		media.class = "Audio/Sink"
	id 76, type PipeWire:Interface:Node/3
 		object.serial = "2146"
 		node.description = "Integrated Camera (V4L2)"
 		media.class = "Video/Source"
	id 80, type PipeWire:Interface:Node/3
 		node.description = "imx363"
 		api.libcamera.location = "back"
 		media.class = "Video/Source"
"#;

    #[test]
    fn test_parse_node_listing_keeps_video_sources() {
        let cameras = parse_node_listing(LISTING);
        assert_eq!(cameras.len(), 2);

        assert_eq!(cameras[0].name, "Integrated Camera (V4L2)");
        assert_eq!(cameras[0].path, "2146");
        assert_eq!(cameras[0].metadata_path.as_deref(), Some("76"));
        assert_eq!(cameras[0].facing, None);

        assert_eq!(cameras[1].path, "80");
        assert_eq!(cameras[1].facing, Some(LensFacing::Back));
    }

    #[test]
    fn test_extract_quoted_value() {
        assert_eq!(
            extract_quoted_value(r#"node.nick = "Webcam""#).as_deref(),
            Some("Webcam")
        );
        assert_eq!(extract_quoted_value("no quotes"), None);
    }
}
