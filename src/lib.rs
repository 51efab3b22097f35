//! Handpilot - hands-free pointer, click and dictation control
//!
//! Consumes per-frame hand and face landmarks and drives the desktop pointer,
//! mouse buttons and keyboard. See [`controller`] for the frame loop.

pub mod app;
pub mod assistant;
pub mod blink;
pub mod click;
pub mod config;
pub mod controller;
pub mod cursor;
pub mod gaze;
pub mod geometry;
pub mod gesture;
pub mod injection;
pub mod landmarks;
pub mod mode;
pub mod source;
pub mod transcription;
pub mod voice;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line interface
#[derive(Debug, Parser)]
#[command(name = "handpilot", version, about)]
pub struct Cli {
    /// Config file (defaults to ~/.handpilot/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log injected input instead of performing it
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the frame loop on landmark frames from stdin (default)
    Run,
    /// Collect a nine-point gaze calibration from stdin frames
    Calibrate,
}

/// Set up stdout and file logging with local timestamps
pub fn init_logging() {
    use tracing_subscriber::prelude::*;

    /// Format timestamps using the system's local time via chrono
    struct LocalTimer;
    impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
        fn format_time(
            &self,
            w: &mut tracing_subscriber::fmt::format::Writer<'_>,
        ) -> std::fmt::Result {
            write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
        }
    }

    let log_dir = config::get_data_dir().join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("handpilot.log"))
        .ok();

    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    // Landmark frames arrive on stdin, so logs go to stderr
    if let Some(file) = log_file {
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_timer(LocalTimer)
            .with_ansi(false);
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(LocalTimer);
        tracing_subscriber::registry()
            .with(filter())
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .with_timer(LocalTimer)
            .init();
    }
}

/// Entry point for the `handpilot` binary
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    tracing::info!("Handpilot {} starting", env!("CARGO_PKG_VERSION"));

    let mut cfg = config::init(cli.config.clone());
    if cli.dry_run {
        cfg.injection.dry_run = true;
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => app::run_controller(&cfg),
        Command::Calibrate => app::run_calibration(&cfg),
    }
}
