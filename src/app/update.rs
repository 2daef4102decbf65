// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling

use crate::app::state::{AppModel, Message};
use crate::capture::CaptureOutcome;
use crate::config::{AppTheme, Config};
use crate::notify::Notice;
use crate::screen::ScreenState;
use cosmic::Task;
use cosmic::cosmic_config::CosmicConfigEntry;
use cosmic::widget::image;
use std::time::Duration;
use tracing::{debug, error, info, warn};

impl AppModel {
    /// Main message handler
    pub fn update(&mut self, message: Message) -> Task<cosmic::Action<Message>> {
        match message {
            Message::ScreenStarted(state) => self.handle_screen_started(state),
            Message::CameraFrame(frame) => {
                // Frames arrive once the session is active; the start task may still be pending
                if self.screen_state != ScreenState::Destroyed {
                    self.screen_state = self.screen.state();
                }
                self.preview_handle = Some(image::Handle::from_rgba(
                    frame.width,
                    frame.height,
                    frame.data.to_vec(),
                ));
                self.current_frame = Some(frame);
                Task::none()
            }
            Message::Shutter => self.handle_shutter(),
            Message::CaptureDone(outcome) => self.handle_capture_done(outcome),
            Message::Notice(notice) => self.handle_notice(notice),
            Message::ClearNotice(serial) => {
                if serial == self.notice_serial {
                    self.notice = None;
                }
                Task::none()
            }
            Message::CycleTheme => self.handle_cycle_theme(),
            Message::UpdateConfig(config) => self.handle_update_config(config),
            Message::CloseRequested => {
                self.screen.destroy();
                self.screen_state = ScreenState::Destroyed;
                Task::none()
            }
            Message::Exit => {
                self.screen.destroy();
                self.screen_state = ScreenState::Destroyed;
                cosmic::iced::exit()
            }
        }
    }

    /// Create a task that emits `message` after `delay`
    pub(crate) fn delay_task(delay: Duration, message: Message) -> Task<cosmic::Action<Message>> {
        Task::perform(
            async move {
                tokio::time::sleep(delay).await;
                message
            },
            cosmic::Action::App,
        )
    }

    fn handle_screen_started(&mut self, state: ScreenState) -> Task<cosmic::Action<Message>> {
        info!(state = ?state, "Camera screen started");
        if self.screen_state != ScreenState::Destroyed {
            self.screen_state = state;
        }

        if state == ScreenState::Terminated {
            // Leave the permission notice on screen before closing
            let linger = Notice::permission_denied().duration.as_duration();
            return Self::delay_task(linger, Message::Exit);
        }
        Task::none()
    }

    fn handle_shutter(&mut self) -> Task<cosmic::Action<Message>> {
        if self.screen_state.is_closed() {
            debug!("Shutter ignored - screen closed");
            return Task::none();
        }

        self.captures_pending += 1;
        let screen = self.screen.clone();
        Task::perform(async move { screen.shutter().await }, |outcome| {
            cosmic::Action::App(Message::CaptureDone(outcome))
        })
    }

    fn handle_capture_done(
        &mut self,
        outcome: Option<CaptureOutcome>,
    ) -> Task<cosmic::Action<Message>> {
        self.captures_pending = self.captures_pending.saturating_sub(1);
        match outcome {
            Some(CaptureOutcome::Success(saved)) => {
                info!(path = %saved.path.display(), "Photo saved");
            }
            Some(CaptureOutcome::Failure(e)) => warn!(error = %e, "Photo capture failed"),
            None => debug!("Shutter press was not handled"),
        }
        Task::none()
    }

    fn handle_notice(&mut self, notice: Notice) -> Task<cosmic::Action<Message>> {
        self.notice_serial += 1;
        let duration = notice.duration.as_duration();
        self.notice = Some(notice);
        Self::delay_task(duration, Message::ClearNotice(self.notice_serial))
    }

    fn handle_cycle_theme(&mut self) -> Task<cosmic::Action<Message>> {
        let app_theme = match self.config.app_theme {
            AppTheme::System => AppTheme::Dark,
            AppTheme::Dark => AppTheme::Light,
            AppTheme::Light => AppTheme::System,
        };

        info!(?app_theme, "Setting application theme");
        self.config.app_theme = app_theme;

        if let Some(handler) = self.config_handler.as_ref()
            && let Err(err) = self.config.write_entry(handler)
        {
            error!(?err, "Failed to save app theme setting");
        }

        cosmic::command::set_theme(app_theme.theme())
    }

    fn handle_update_config(&mut self, config: Config) -> Task<cosmic::Action<Message>> {
        if config == self.config {
            return Task::none();
        }

        let theme_changed = config.app_theme != self.config.app_theme;
        let camera_changed = Config {
            app_theme: self.config.app_theme,
            ..config.clone()
        } != self.config;
        if camera_changed {
            info!("Camera settings changed; they apply the next time the screen starts");
        }

        self.config = config;
        if theme_changed {
            cosmic::command::set_theme(self.config.app_theme.theme())
        } else {
            Task::none()
        }
    }
}
