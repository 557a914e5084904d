//! Kestrel - an incremental build daemon for mixed-source front-end projects.

mod actor;
mod build;
mod cli;
mod config;
mod core;
mod logger;
mod project;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::ProjectConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = Arc::new(ProjectConfig::load(cli)?);
    logger::set_verbose(config.verbose);

    match &cli.command {
        Commands::Watch { .. } => cli::watch::run_watch(&config),
        Commands::Build { .. } => cli::build::run_build(&config),
    }
}
