// SPDX-License-Identifier: GPL-3.0-only

//! Terminal camera screen
//!
//! Hosts a [`CameraScreen`] in the terminal. The preview is rendered with
//! Unicode half-block characters for improved vertical resolution; notices
//! replace the key help in the status bar while they are visible.

use crate::backends::camera::{CameraFrame, FrameReceiver};
use crate::config::Config;
use crate::constants::pipeline;
use crate::errors::AppResult;
use crate::notify::{ChannelNotifier, Notice};
use crate::screen::{CameraScreen, ScreenServices, ScreenState};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::channel::mpsc;
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

const KEY_HELP: &str = "'p' picture | 'q' quit";

/// Run the terminal camera screen
pub fn run(config: &Config) -> AppResult<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let (notifier, notices) = ChannelNotifier::new();
    let services = ScreenServices::desktop(config, Arc::new(notifier));
    let screen = CameraScreen::new(services, config.session_options(), config.shutter_guard());

    let (surface, frames): (_, FrameReceiver) = mpsc::channel(pipeline::PREVIEW_CHANNEL_CAPACITY);
    screen.preview().set_surface_provider(surface);

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let starting = screen.clone();
    runtime.spawn(async move {
        let state = starting.start().await;
        info!(state = ?state, "Camera screen started");
    });

    let result = run_app(&mut terminal, &runtime, &screen, frames, notices);
    screen.destroy();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    runtime: &tokio::runtime::Runtime,
    screen: &CameraScreen,
    mut frames: FrameReceiver,
    mut notices: mpsc::UnboundedReceiver<Notice>,
) -> AppResult<()> {
    let mut frame_widget = FrameWidget::new();
    let mut status = StatusLine::default();
    let mut terminated_at: Option<Instant> = None;

    loop {
        // Drain all available frames to get the latest
        while let Ok(frame) = frames.try_recv() {
            frame_widget.update_frame(frame);
        }
        while let Ok(notice) = notices.try_recv() {
            status.show(notice, Instant::now());
        }

        let state = screen.state();
        if state == ScreenState::Terminated {
            // Leave the permission notice up for its duration
            let since = *terminated_at.get_or_insert_with(Instant::now);
            if since.elapsed() >= Notice::permission_denied().duration.as_duration() {
                break;
            }
        }

        let message = status.text(state, Instant::now());
        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let camera_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(1),
            };
            f.render_widget(&frame_widget, camera_area);

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            f.render_widget(StatusBar { message: &message }, status_area);
        })?;

        // Handle input with timeout for frame updates
        if event::poll(Duration::from_millis(16))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                KeyCode::Char('q') => break,
                KeyCode::Char('p') if !state.is_closed() => {
                    // Outcome arrives as a notice
                    let shutter = screen.clone();
                    runtime.spawn(async move { shutter.shutter().await });
                }
                _ => {}
            }
        }
    }

    Ok(())
}

/// Status bar text: the visible notice, else screen state and key help
#[derive(Default)]
struct StatusLine {
    notice: Option<(Notice, Instant)>,
}

impl StatusLine {
    fn show(&mut self, notice: Notice, now: Instant) {
        self.notice = Some((notice, now));
    }

    fn text(&mut self, state: ScreenState, now: Instant) -> String {
        if let Some((notice, shown_at)) = &self.notice {
            if now.duration_since(*shown_at) < notice.duration.as_duration() {
                return notice.message.clone();
            }
            self.notice = None;
        }

        match state {
            ScreenState::Uninitialized | ScreenState::SessionStarting => {
                format!("Starting camera... | {}", KEY_HELP)
            }
            ScreenState::PermissionPending => format!("Waiting for permission | {}", KEY_HELP),
            ScreenState::SessionActive { in_flight: 0 } => KEY_HELP.to_string(),
            ScreenState::SessionActive { in_flight } => {
                format!("Capturing ({}) | {}", in_flight, KEY_HELP)
            }
            ScreenState::Unavailable => format!("Camera unavailable | {}", KEY_HELP),
            ScreenState::Terminated | ScreenState::Destroyed => "Closing".to_string(),
        }
    }
}

/// Widget that renders a camera frame using half-block characters
struct FrameWidget {
    frame: Option<Arc<CameraFrame>>,
}

impl FrameWidget {
    fn new() -> Self {
        Self { frame: None }
    }

    fn update_frame(&mut self, frame: Arc<CameraFrame>) {
        self.frame = Some(frame);
    }
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.as_deref().filter(|f| f.width > 0 && f.height > 0) else {
            let msg = "Waiting for camera...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };

        let (display_width, display_height) = fit_half_blocks(frame, area);
        if display_width == 0 || display_height == 0 {
            return;
        }

        // Center the image
        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        // Upper half (▀) takes the fg color, lower half the bg color
        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(sample_pixel(frame, src_x, src_y_top));
                    cell.set_bg(sample_pixel(frame, src_x, src_y_bottom));
                }
            }
        }
    }
}

/// Cells covered by `frame` scaled into `area`, keeping the aspect ratio
///
/// Each cell shows two vertical pixels.
fn fit_half_blocks(frame: &CameraFrame, area: Rect) -> (u16, u16) {
    let frame_aspect = frame.width as f64 / frame.height as f64;
    let term_width = area.width as f64;
    let term_height = (area.height as f64) * 2.0;

    if term_height == 0.0 {
        return (0, 0);
    }

    if term_width / term_height > frame_aspect {
        // Terminal is wider - fit to height
        let w = term_height * frame_aspect;
        (w as u16, (term_height / 2.0) as u16)
    } else {
        // Terminal is taller - fit to width
        let h = term_width / frame_aspect;
        (term_width as u16, (h / 2.0) as u16)
    }
}

fn sample_pixel(frame: &CameraFrame, x: u32, y: u32) -> Color {
    let x = x.min(frame.width - 1) as usize;
    let y = y.min(frame.height - 1) as usize;
    let idx = y * frame.stride() + x * 4;

    match frame.data.get(idx..idx + 3) {
        Some(rgb) => Color::Rgb(rgb[0], rgb[1], rgb[2]),
        None => Color::Black,
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> CameraFrame {
        CameraFrame {
            width,
            height,
            data: rgba.repeat((width * height) as usize).into(),
            sequence: 0,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_fit_keeps_aspect_ratio() {
        let frame = solid_frame(640, 480, [0, 0, 0, 255]);
        // 80x24 cells = 80x48 half-block pixels, wider than 4:3
        let (w, h) = fit_half_blocks(&frame, Rect::new(0, 0, 80, 24));
        assert_eq!(h, 24);
        assert_eq!(w, 64);
    }

    #[test]
    fn test_sample_pixel_clamps_to_frame() {
        let frame = solid_frame(2, 2, [10, 20, 30, 255]);
        assert_eq!(sample_pixel(&frame, 100, 100), Color::Rgb(10, 20, 30));
    }

    #[test]
    fn test_status_line_shows_notice_until_expired() {
        let mut status = StatusLine::default();
        let start = Instant::now();
        status.show(Notice::success(), start);

        let active = ScreenState::SessionActive { in_flight: 0 };
        assert_eq!(status.text(active, start), "success");
        assert_eq!(
            status.text(active, start + Notice::success().duration.as_duration()),
            KEY_HELP
        );
    }

    #[test]
    fn test_render_fills_cells() {
        let widget = FrameWidget {
            frame: Some(Arc::new(solid_frame(4, 4, [255, 0, 0, 255]))),
        };
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        (&widget).render(area, &mut buf);
        let cell = &buf[(0, 0)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
    }
}
