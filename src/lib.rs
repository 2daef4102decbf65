// SPDX-License-Identifier: GPL-3.0-only

//! Viewfinder - a single-screen camera application
//!
//! One camera screen shows a live preview and takes still photos on a
//! shutter press. The screen checks and requests the permissions it needs,
//! binds a camera session to its own lifetime, and reports every capture
//! outcome as a transient notice.
//!
//! # Architecture
//!
//! - [`screen`]: The camera screen and its state machine
//! - [`permissions`]: Permission gate and the desktop permission broker
//! - [`session`]: Capture session, use cases and lifecycle scope
//! - [`capture`]: Shutter handling and destination naming
//! - [`notify`]: User notices
//! - [`backends`]: Camera provider abstraction (GStreamer/PipeWire)
//! - [`pipelines`]: Frame to JPEG encoding
//! - [`storage`]: Media store
//! - [`config`]: User configuration handling
//! - [`app`], [`terminal`]: GUI and terminal hosts

pub mod app;
pub mod backends;
pub mod capture;
pub mod config;
pub mod constants;
pub mod errors;
pub mod notify;
pub mod permissions;
pub mod pipelines;
pub mod screen;
pub mod session;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{AppModel, Message};
pub use config::Config;
pub use screen::{CameraScreen, ScreenServices, ScreenState};
