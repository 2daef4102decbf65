// SPDX-License-Identifier: GPL-3.0-only

//! Shutter button widget

use crate::app::state::{AppModel, Message};
use crate::constants::ui;
use crate::screen::ScreenState;
use cosmic::Element;
use cosmic::iced::{Background, Color, Length};
use cosmic::widget;

impl AppModel {
    /// Build the shutter button
    ///
    /// White circle while the camera is live, gray and slightly pressed while
    /// captures are pending. The button stays pressable during a capture;
    /// every press issues its own request.
    pub fn build_capture_button(&self) -> Element<'_, Message> {
        let spacing = cosmic::theme::spacing();
        let is_disabled = self.screen_state.is_closed();
        let is_capturing = self.captures_pending > 0;

        let color = if is_disabled {
            Color::from_rgba(0.5, 0.5, 0.5, 0.3)
        } else if matches!(self.screen_state, ScreenState::SessionActive { .. }) {
            if is_capturing {
                Color::from_rgb(0.7, 0.7, 0.7)
            } else {
                Color::WHITE
            }
        } else {
            Color::from_rgba(1.0, 1.0, 1.0, 0.6)
        };

        let (inner_size, outer_size) = if is_capturing {
            (
                ui::CAPTURE_BUTTON_INNER * 0.85,
                ui::CAPTURE_BUTTON_OUTER * 0.85,
            )
        } else {
            (ui::CAPTURE_BUTTON_INNER, ui::CAPTURE_BUTTON_OUTER)
        };

        let button_inner = widget::container(widget::Space::new(
            Length::Fixed(inner_size),
            Length::Fixed(inner_size),
        ))
        .style(move |_theme| widget::container::Style {
            background: Some(Background::Color(color)),
            border: cosmic::iced::Border {
                radius: [ui::CAPTURE_BUTTON_RADIUS * (inner_size / ui::CAPTURE_BUTTON_INNER); 4]
                    .into(),
                ..Default::default()
            },
            ..Default::default()
        });

        let mut button = widget::button::custom(button_inner)
            .padding(0)
            .width(Length::Fixed(outer_size))
            .height(Length::Fixed(outer_size));
        if !is_disabled {
            button = button.on_press(Message::Shutter);
        }

        // Fixed-size wrapper so the press effect does not shift the layout
        let button_wrapper = widget::container(button)
            .width(Length::Fixed(ui::CAPTURE_BUTTON_OUTER))
            .height(Length::Fixed(ui::CAPTURE_BUTTON_OUTER))
            .center_x(ui::CAPTURE_BUTTON_OUTER)
            .center_y(ui::CAPTURE_BUTTON_OUTER);

        widget::container(button_wrapper)
            .width(Length::Fill)
            .center_x(Length::Fill)
            .padding([spacing.space_xs, 0])
            .into()
    }
}
