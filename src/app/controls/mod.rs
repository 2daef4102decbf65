// SPDX-License-Identifier: GPL-3.0-only

//! Capture controls

pub mod capture_button;
