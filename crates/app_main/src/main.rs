//! PhotoCuller - folder-at-a-time photo browser and culler
//!
//! Main entry point.

mod app;
mod command;

use anyhow::Result;
use app_core::{AppConfig, AppState};
use clap::Parser;
use std::path::PathBuf;

/// Browse a folder of photos, mark favorites, make quick edits.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Folder to open, or an image to open its folder at.
    ///
    /// Defaults to the folder of the previous session.
    path: Option<PathBuf>,

    /// Configuration file (TOML).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Delete files permanently instead of moving them to the trash.
    #[arg(long)]
    no_trash: bool,

    /// Downscale decoded images so neither side exceeds this many pixels.
    #[arg(long, value_name = "PIXELS")]
    max_dimension: Option<u32>,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("Fatal error: {:#}", e);
        let body = format!("PhotoCuller stopped with a fatal error:\n\n{:?}\n", e);
        match app_log::write_error_report(&body) {
            Ok(path) => eprintln!("Fatal error: {:#} (report: {})", e, path.display()),
            Err(_) => eprintln!("Fatal error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    // Initialize logging and panic hook first
    app_log::init()?;

    // Clean up old logs (7 days)
    if let Err(e) = app_log::cleanup_old_logs(7) {
        tracing::warn!("Failed to cleanup old logs: {}", e);
    }

    tracing::info!("PhotoCuller starting...");

    // Load configuration
    let config_path = args.config.unwrap_or_else(AppConfig::config_path);
    let mut config = AppConfig::load_from(&config_path).unwrap_or_else(|e| {
        tracing::warn!("Using default configuration: {:#}", e);
        AppConfig::default()
    });
    if args.no_trash {
        config.library.use_recycle_bin = false;
    }
    if args.max_dimension.is_some() {
        config.viewer.max_dimension = args.max_dimension;
    }

    // Initialize application state
    let state = AppState::new(config)?;

    let stdin = std::io::stdin();
    app::run(&state, args.path, stdin.lock(), std::io::stdout())?;

    if let Err(e) = state.config.read().save_to(&config_path) {
        tracing::warn!("Failed to save configuration: {:#}", e);
    }

    tracing::info!("PhotoCuller exiting");
    Ok(())
}
