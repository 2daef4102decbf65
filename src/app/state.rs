// SPDX-License-Identifier: GPL-3.0-only

//! Application state types

use crate::backends::camera::{CameraFrame, FrameReceiver};
use crate::capture::CaptureOutcome;
use crate::config::Config;
use crate::notify::Notice;
use crate::screen::{CameraScreen, ScreenState};
use cosmic::cosmic_config;
use futures::channel::mpsc::UnboundedReceiver;
use std::sync::{Arc, Mutex};

/// Receiver handed to a subscription exactly once
pub type Handoff<T> = Arc<Mutex<Option<T>>>;

/// The application model stores app-specific state used to describe its interface and
/// drive its logic.
pub struct AppModel {
    /// Application state which is managed by the COSMIC runtime.
    pub core: cosmic::Core,
    /// Configuration data that persists between application runs.
    pub config: Config,
    /// Configuration handler for saving settings
    pub config_handler: Option<cosmic_config::Config>,
    /// The camera screen this window hosts
    pub screen: CameraScreen,
    /// Last reported screen state
    pub screen_state: ScreenState,
    /// Preview frames from the bound camera
    pub preview_frames: Handoff<FrameReceiver>,
    /// Notices raised by the screen
    pub notices: Handoff<UnboundedReceiver<Notice>>,
    /// Current camera frame
    pub current_frame: Option<Arc<CameraFrame>>,
    /// Image handle for the current frame
    pub preview_handle: Option<cosmic::widget::image::Handle>,
    /// Notice currently on screen
    pub notice: Option<Notice>,
    /// Incremented per notice so stale dismiss timers are ignored
    pub notice_serial: u64,
    /// Unresolved shutter presses issued from this window
    pub captures_pending: usize,
}

/// Messages emitted by the application and its widgets.
#[derive(Debug, Clone)]
pub enum Message {
    /// Screen start finished (permissions resolved, camera bound or not)
    ScreenStarted(ScreenState),
    /// New preview frame
    CameraFrame(Arc<CameraFrame>),
    /// Shutter button pressed
    Shutter,
    /// A shutter press resolved; `None` when it was ignored
    CaptureDone(Option<CaptureOutcome>),
    /// Show a notice
    Notice(Notice),
    /// Hide the notice with this serial
    ClearNotice(u64),
    /// Switch System → Dark → Light and persist the choice
    CycleTheme,
    /// Configuration changed on disk
    UpdateConfig(Config),
    /// Window close requested
    CloseRequested,
    /// Quit the application
    Exit,
}
