// SPDX-License-Identifier: GPL-3.0-only

//! Desktop host for the camera screen
//!
//! - `state`: AppModel and Message
//! - `update`: Message handling
//! - `view`: Preview, notice overlay and shutter
//! - `controls`: Shutter button

mod controls;
mod state;
mod update;
mod view;

use crate::backends::camera::FrameReceiver;
use crate::config::Config;
use crate::constants::pipeline;
use crate::notify::ChannelNotifier;
use crate::screen::{CameraScreen, ScreenServices, ScreenState};
use cosmic::iced::{Subscription, window};
use cosmic::widget;
use cosmic::{Element, Task};
use futures::channel::mpsc;
pub use state::{AppModel, Handoff, Message};
use std::sync::{Arc, Mutex};
use tracing::info;

impl cosmic::Application for AppModel {
    /// The async executor that will be used to run your application's commands.
    type Executor = cosmic::executor::Default;

    /// Data that your application receives to its init method.
    type Flags = ();

    /// Messages which the application and its widgets will emit.
    type Message = Message;

    /// Unique identifier in RDNN (reverse domain name notation) format.
    const APP_ID: &'static str = crate::config::APP_ID;

    fn core(&self) -> &cosmic::Core {
        &self.core
    }

    fn core_mut(&mut self) -> &mut cosmic::Core {
        &mut self.core
    }

    /// Builds the camera screen and starts it.
    fn init(
        core: cosmic::Core,
        _flags: Self::Flags,
    ) -> (Self, Task<cosmic::Action<Self::Message>>) {
        let (config_handler, config) = Config::load();

        info!(
            backend = %config.backend,
            facing = %config.lens_facing,
            photo_dir = %config.photo_dir().display(),
            "Starting camera screen"
        );

        let (notifier, notices) = ChannelNotifier::new();
        let services = ScreenServices::desktop(&config, Arc::new(notifier));
        let screen = CameraScreen::new(services, config.session_options(), config.shutter_guard());

        // The preview surface must be installed before the session binds
        let (surface, frames): (_, FrameReceiver) =
            mpsc::channel(pipeline::PREVIEW_CHANNEL_CAPACITY);
        screen.preview().set_surface_provider(surface);

        let app = AppModel {
            core,
            config,
            config_handler,
            screen: screen.clone(),
            screen_state: ScreenState::Uninitialized,
            preview_frames: Arc::new(Mutex::new(Some(frames))),
            notices: Arc::new(Mutex::new(Some(notices))),
            current_frame: None,
            preview_handle: None,
            notice: None,
            notice_serial: 0,
            captures_pending: 0,
        };

        let start_task = Task::perform(async move { screen.start().await }, |state| {
            cosmic::Action::App(Message::ScreenStarted(state))
        });

        (app, start_task)
    }

    /// Elements to pack at the end of the header bar.
    fn header_end(&self) -> Vec<Element<'_, Self::Message>> {
        let mut elements = Vec::new();

        let status = match self.screen_state {
            ScreenState::Uninitialized | ScreenState::SessionStarting => Some("Starting camera"),
            ScreenState::PermissionPending => Some("Waiting for permission"),
            ScreenState::SessionActive { .. } => None,
            ScreenState::Unavailable => Some("Camera unavailable"),
            ScreenState::Terminated | ScreenState::Destroyed => Some("Closing"),
        };
        if let Some(status) = status {
            elements.push(widget::text::body(status).into());
        }

        elements.push(
            widget::button::icon(widget::icon::from_name("weather-clear-night-symbolic"))
                .on_press(Message::CycleTheme)
                .into(),
        );
        elements
    }

    fn on_close_requested(&self, _id: window::Id) -> Option<Self::Message> {
        Some(Message::CloseRequested)
    }

    /// Describes the interface based on the current state of the application model.
    fn view(&self) -> Element<'_, Self::Message> {
        self.view()
    }

    /// Register subscriptions for this application.
    fn subscription(&self) -> Subscription<Self::Message> {
        let config_sub = self
            .core()
            .watch_config::<Config>(Self::APP_ID)
            .map(|update| Message::UpdateConfig(update.config));

        let frames = Arc::clone(&self.preview_frames);
        let preview_sub = Subscription::run_with_id(
            "preview",
            cosmic::iced::stream::channel(pipeline::PREVIEW_CHANNEL_CAPACITY, move |output| async move {
                forward(frames, output, Message::CameraFrame, true).await;
            }),
        );

        let notices = Arc::clone(&self.notices);
        let notice_sub = Subscription::run_with_id(
            "notices",
            cosmic::iced::stream::channel(8, move |output| async move {
                forward(notices, output, Message::Notice, false).await;
            }),
        );

        Subscription::batch([config_sub, preview_sub, notice_sub])
    }

    /// Handles messages emitted by the application and its widgets.
    fn update(&mut self, message: Self::Message) -> Task<cosmic::Action<Self::Message>> {
        self.update(message)
    }
}

impl Drop for AppModel {
    fn drop(&mut self) {
        self.screen.destroy();
    }
}

/// Drain a handed-off receiver into a subscription's output
///
/// Preview frames are dropped while the UI is busy (`lossy`); notices are
/// always delivered.
async fn forward<T, S>(
    handoff: Handoff<S>,
    mut output: cosmic::iced::futures::channel::mpsc::Sender<Message>,
    wrap: fn(T) -> Message,
    lossy: bool,
) where
    S: futures::Stream<Item = T> + Unpin,
{
    use cosmic::iced::futures::{SinkExt, StreamExt};

    let taken = handoff.lock().unwrap().take();
    let Some(mut receiver) = taken else {
        // Already handed to an earlier subscription instance
        futures::future::pending::<()>().await;
        return;
    };

    while let Some(item) = receiver.next().await {
        let message = wrap(item);
        if lossy {
            if let Err(e) = output.try_send(message)
                && e.is_disconnected()
            {
                break;
            }
        } else if output.send(message).await.is_err() {
            break;
        }
    }
    info!("Subscription source closed");
}
