// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use viewfinder::app::AppModel;
use viewfinder::config::Config;
use viewfinder::constants::ui;
use viewfinder::errors::{AppError, AppResult};

mod cli;

#[derive(Parser)]
#[command(name = "viewfinder")]
#[command(about = "Camera with live preview and still capture for the COSMIC desktop")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run in terminal mode (renders camera to terminal)
    Terminal,

    /// List available cameras
    List,

    /// Take a photo
    Photo {
        /// Output directory (default: ~/Pictures/viewfinder)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Capture from the GStreamer test pattern instead of a camera
        #[arg(long)]
        test_pattern: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control the log level, e.g. RUST_LOG=viewfinder=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Terminal) => viewfinder::terminal::run(&Config::load().1),
        Some(Commands::List) => cli::list_cameras(&Config::load().1),
        Some(Commands::Photo {
            output,
            test_pattern,
        }) => cli::take_photo(&Config::load().1, output, test_pattern),
        None => run_gui(),
    };

    Ok(result?)
}

fn run_gui() -> AppResult<()> {
    let settings = cosmic::app::Settings::default().size_limits(
        cosmic::iced::Limits::NONE
            .min_width(ui::MIN_WIDTH)
            .min_height(ui::MIN_HEIGHT),
    );

    cosmic::app::run::<AppModel>(settings, ()).map_err(|e| AppError::Other(e.to_string()))
}
