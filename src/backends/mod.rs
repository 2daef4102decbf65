// SPDX-License-Identifier: GPL-3.0-only

//! Platform backends
//!
//! - [`camera`]: camera provider traits and the GStreamer implementation

pub mod camera;
