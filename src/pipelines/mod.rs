// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines for captured media
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera Frame │ ──▶ │  Photo Pipeline   │ ──▶ │ Media store  │
//! │   (RGBA)     │     │  - JPEG encoding  │     │  (Pictures)  │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! All heavy work runs in background tasks so the preview never stalls.

pub mod photo;
