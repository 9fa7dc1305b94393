//! mindwatch - live mind-map preview for markdown outlines.

mod cli;
mod config;
mod core;
mod embed;
mod logger;
mod sync;
mod transform;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::PreviewConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = PreviewConfig::load(&cli)?;

    match &cli.command {
        Commands::Render { common, output } => {
            cli::render::render(&config, &common.input, output.as_deref(), common.should_open())
                .map(|_| ())
        }
        Commands::Serve { common, .. } => {
            cli::serve::serve(&config, &common.input, common.should_open())
        }
    }
}
