// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer pipeline for camera capture
//!
//! `pipewiresrc` (or `videotestsrc`) → `videoconvert` → RGBA `appsink`.
//! Every frame is offered to the preview surface and published as the latest
//! frame for still capture.

use super::super::types::*;
use crate::constants::{pipeline, timing};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Latest frame published by a running pipeline
pub type LatestFrame = watch::Receiver<Option<Arc<CameraFrame>>>;

/// Build the `gst-launch` description for a device
pub fn pipeline_description(
    backend: CameraBackendType,
    device: &CameraDevice,
    format: Option<&CameraFormat>,
) -> String {
    let source = match backend {
        CameraBackendType::PipeWire if device.path.is_empty() => "pipewiresrc".to_string(),
        CameraBackendType::PipeWire => format!("pipewiresrc target-object={}", device.path),
        CameraBackendType::TestPattern => "videotestsrc is-live=true pattern=smpte".to_string(),
    };

    let size = format
        .map(|f| format!(",width=(int){},height=(int){}", f.width, f.height))
        .unwrap_or_default();

    format!(
        "{source} ! videoconvert n-threads={threads} ! videoscale ! \
         video/x-raw,format={fmt}{size} ! appsink name=sink",
        threads = pipeline::videoconvert_threads(),
        fmt = pipeline::OUTPUT_FORMAT,
    )
}

/// Running camera pipeline
pub struct CapturePipeline {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
    latest: LatestFrame,
}

impl CapturePipeline {
    /// Create and start a pipeline for `device`
    ///
    /// `surface` receives preview frames; when it is full frames are dropped.
    pub fn start(
        backend: CameraBackendType,
        device: &CameraDevice,
        format: Option<&CameraFormat>,
        surface: Option<FrameSender>,
    ) -> BackendResult<Self> {
        info!(device = %device.name, backend = %backend, "Creating camera pipeline");

        gstreamer::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let description = pipeline_description(backend, device, format);
        debug!(pipeline = %description, "Parsing pipeline");

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| {
                BackendError::InitializationFailed("Parsed element is not a pipeline".to_string())
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| BackendError::InitializationFailed("Failed to get appsink".to_string()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| {
                BackendError::InitializationFailed("Failed to cast appsink".to_string())
            })?;

        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", pipeline::MAX_BUFFERS);
        appsink.set_property("drop", true);
        appsink.set_property("enable-last-sample", false);

        let (publisher, latest) = watch::channel(None);
        let counter = Arc::new(AtomicU64::new(0));

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let frame_start = Instant::now();
                    let frame_num = counter.fetch_add(1, Ordering::Relaxed);

                    let sample = appsink.pull_sample().map_err(|e| {
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            error!(frame = frame_num, error = ?e, "Failed to pull sample");
                        }
                        gstreamer::FlowError::Eos
                    })?;

                    let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                    if buffer.flags().contains(gstreamer::BufferFlags::CORRUPTED) {
                        warn!(frame = frame_num, "Buffer marked as corrupted, skipping frame");
                        return Ok(gstreamer::FlowSuccess::Ok);
                    }

                    let caps = sample.caps().ok_or(gstreamer::FlowError::Error)?;
                    let video_info =
                        VideoInfo::from_caps(caps).map_err(|_| gstreamer::FlowError::Error)?;
                    let map = buffer
                        .map_readable()
                        .map_err(|_| gstreamer::FlowError::Error)?;

                    let Some(data) = pack_rows(
                        map.as_slice(),
                        video_info.width(),
                        video_info.height(),
                        video_info.stride()[0] as usize,
                    ) else {
                        warn!(frame = frame_num, "Short buffer, skipping frame");
                        return Ok(gstreamer::FlowSuccess::Ok);
                    };

                    let frame = Arc::new(CameraFrame {
                        width: video_info.width(),
                        height: video_info.height(),
                        data: Arc::from(data),
                        sequence: frame_num,
                        captured_at: frame_start,
                    });

                    if let Some(surface) = &surface {
                        let mut sender = surface.clone();
                        if let Err(e) = sender.try_send(Arc::clone(&frame))
                            && frame_num % timing::FRAME_LOG_INTERVAL == 0
                        {
                            debug!(frame = frame_num, error = ?e, "Frame dropped (channel full)");
                        }
                    }

                    publisher.send_replace(Some(frame));

                    if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                        debug!(
                            frame = frame_num,
                            width = video_info.width(),
                            height = video_info.height(),
                            copy_us = frame_start.elapsed().as_micros(),
                            "Frame performance"
                        );
                    }

                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        pipeline.set_state(gstreamer::State::Playing).map_err(|e| {
            BackendError::InitializationFailed(format!("Failed to start pipeline: {}", e))
        })?;

        let (result, state, pending) = pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::START_TIMEOUT_SECS,
        ));
        debug!(result = ?result, state = ?state, pending = ?pending, "Pipeline state");
        if result.is_err() {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(BackendError::InitializationFailed(format!(
                "Pipeline for {} did not start",
                device.name
            )));
        }
        if state != gstreamer::State::Playing {
            warn!("Pipeline is not in PLAYING state yet");
        }

        info!(device = %device.name, "Camera pipeline running");

        Ok(Self {
            pipeline,
            appsink,
            latest,
        })
    }

    /// Receiver for the most recent frame
    pub fn latest_frame(&self) -> LatestFrame {
        self.latest.clone()
    }

    /// Stop the pipeline and release the camera
    pub fn stop(self) -> BackendResult<()> {
        info!("Stopping camera pipeline");
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());

        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| BackendError::Other(format!("Failed to stop pipeline: {}", e)))?;

        let (result, state, _) = self.pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::STOP_TIMEOUT_SECS,
        ));
        match result {
            Ok(_) => info!(state = ?state, "Camera pipeline stopped"),
            Err(e) => debug!(error = ?e, state = ?state, "Pipeline state change had issues"),
        }

        Ok(())
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        let _ = self.pipeline.set_state(gstreamer::State::Null);
    }
}

/// Copy RGBA rows out of a strided buffer
fn pack_rows(src: &[u8], width: u32, height: u32, stride: usize) -> Option<Vec<u8>> {
    let row = width as usize * 4;
    let height = height as usize;
    if height == 0 || stride < row || src.len() < stride * (height - 1) + row {
        return None;
    }

    if stride == row {
        return Some(src[..row * height].to_vec());
    }

    let mut packed = Vec::with_capacity(row * height);
    for y in 0..height {
        let start = y * stride;
        packed.extend_from_slice(&src[start..start + row]);
    }
    Some(packed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(path: &str) -> CameraDevice {
        CameraDevice {
            name: "cam".to_string(),
            path: path.to_string(),
            metadata_path: None,
            facing: None,
        }
    }

    #[test]
    fn test_description_targets_device() {
        let desc = pipeline_description(CameraBackendType::PipeWire, &device("42"), None);
        assert!(desc.starts_with("pipewiresrc target-object=42 !"));
        assert!(desc.contains("format=RGBA"));
        assert!(desc.ends_with("appsink name=sink"));
    }

    #[test]
    fn test_description_test_pattern_with_size() {
        let format = CameraFormat {
            width: 640,
            height: 480,
        };
        let desc =
            pipeline_description(CameraBackendType::TestPattern, &device(""), Some(&format));
        assert!(desc.starts_with("videotestsrc"));
        assert!(desc.contains("width=(int)640,height=(int)480"));
    }

    #[test]
    fn test_pack_rows_removes_padding() {
        // 1x2 image, stride 8 (4 bytes padding per row)
        let src = [1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8];
        let packed = pack_rows(&src, 1, 2, 8).unwrap();
        assert_eq!(packed, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(pack_rows(&src[..6], 1, 2, 8).is_none());
    }
}
