// SPDX-License-Identifier: GPL-3.0-only

//! Main application view
//!
//! Preview fills the window; the notice overlay and the shutter are stacked
//! on top of it.

use crate::app::state::{AppModel, Message};
use crate::constants::ui;
use crate::notify::{Notice, NoticeAnchor};
use crate::screen::ScreenState;
use cosmic::Element;
use cosmic::iced::{Alignment, Background, Color, ContentFit, Length};
use cosmic::widget;

impl AppModel {
    /// Build the main application view
    pub fn view(&self) -> Element<'_, Message> {
        let mut layers: Vec<Element<'_, Message>> = vec![self.build_camera_preview()];

        if let Some(notice) = &self.notice {
            layers.push(build_notice_overlay(notice));
        }

        layers.push(
            widget::column()
                .push(widget::Space::new(Length::Fill, Length::Fill))
                .push(self.build_capture_button())
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
        );

        widget::container(
            cosmic::iced::widget::Stack::with_children(layers)
                .width(Length::Fill)
                .height(Length::Fill),
        )
        .width(Length::Fill)
        .height(Length::Fill)
        .style(|_theme| widget::container::Style {
            background: Some(Background::Color(Color::BLACK)),
            ..Default::default()
        })
        .into()
    }

    fn build_camera_preview(&self) -> Element<'_, Message> {
        if let Some(handle) = &self.preview_handle {
            return widget::image::Image::new(handle.clone())
                .content_fit(ContentFit::Contain)
                .width(Length::Fill)
                .height(Length::Fill)
                .into();
        }

        let placeholder = match self.screen_state {
            ScreenState::Unavailable => "Camera unavailable",
            ScreenState::PermissionPending => "Waiting for camera permission",
            ScreenState::Terminated | ScreenState::Destroyed => "",
            _ => "Starting camera…",
        };

        widget::container(widget::text::body(placeholder))
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }
}

/// Rounded bubble placed by the notice anchor
fn build_notice_overlay(notice: &Notice) -> Element<'_, Message> {
    let spacing = cosmic::theme::spacing();

    let bubble = widget::container(widget::text::body(notice.message.as_str()))
        .padding([spacing.space_xs, spacing.space_m])
        .style(|_theme| widget::container::Style {
            background: Some(Background::Color(Color::from_rgba(
                0.0,
                0.0,
                0.0,
                ui::OVERLAY_BACKGROUND_ALPHA,
            ))),
            text_color: Some(Color::WHITE),
            border: cosmic::iced::Border {
                radius: [ui::NOTICE_RADIUS; 4].into(),
                ..Default::default()
            },
            ..Default::default()
        });

    let bottom = match notice.anchor {
        NoticeAnchor::Default => f32::from(spacing.space_xxl),
        NoticeAnchor::Bottom { offset } => offset,
    };

    widget::container(bubble)
        .width(Length::Fill)
        .height(Length::Fill)
        .align_x(Alignment::Center)
        .align_y(Alignment::End)
        .padding(cosmic::iced::Padding {
            bottom,
            ..Default::default()
        })
        .into()
}
