// SPDX-License-Identifier: GPL-3.0-only

//! Transient user notices
//!
//! Notices are fire-and-forget: the notifier never reports back and never
//! blocks the caller.

use crate::constants::{notices, timing};
use futures::channel::mpsc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long a notice stays visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeDuration {
    Short,
    Long,
}

impl NoticeDuration {
    pub fn as_duration(&self) -> Duration {
        match self {
            NoticeDuration::Short => timing::NOTICE_SHORT,
            NoticeDuration::Long => timing::NOTICE_LONG,
        }
    }
}

/// Where a notice is placed on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoticeAnchor {
    /// Host default placement
    Default,
    /// Bottom edge, raised by `offset` pixels
    Bottom { offset: f32 },
}

/// A transient message for the user
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub duration: NoticeDuration,
    pub anchor: NoticeAnchor,
}

impl Notice {
    /// Photo was written to the media store
    pub fn success() -> Self {
        Self::capture_result(notices::SUCCESS)
    }

    /// Capture failed, or the camera could not be opened
    pub fn error() -> Self {
        Self::capture_result(notices::ERROR)
    }

    /// Required permissions were refused
    pub fn permission_denied() -> Self {
        Self {
            message: notices::PERMISSION_DENIED.to_string(),
            duration: NoticeDuration::Short,
            anchor: NoticeAnchor::Default,
        }
    }

    fn capture_result(message: &str) -> Self {
        Self {
            message: message.to_string(),
            duration: NoticeDuration::Long,
            anchor: NoticeAnchor::Bottom {
                offset: notices::BOTTOM_OFFSET_PX,
            },
        }
    }
}

/// Displays notices to the user
pub trait ResultNotifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log; used by the CLI
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl ResultNotifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        info!(
            message = %notice.message,
            duration_ms = notice.duration.as_duration().as_millis() as u64,
            "Notice"
        );
    }
}

/// Forwards notices to a host UI
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (sender, receiver) = mpsc::unbounded();
        (Self { sender }, receiver)
    }
}

impl ResultNotifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        debug!(message = %notice.message, "Forwarding notice");
        if self.sender.unbounded_send(notice).is_err() {
            warn!("Notice receiver dropped");
        }
    }
}
