//! inpack - bundle one HTML entry into a single self-contained page.

mod cli;
mod compile;
mod config;
mod document;
mod embed;
mod error;
mod logger;
mod minify;
mod pipeline;
mod reload;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::Config;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    cli::serve::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = Config::load(&cli)?;

    let entry = cli.command.entry();
    match &cli.command {
        Commands::Build { .. } => cli::build::build(entry, &config),
        Commands::Serve { .. } => cli::serve::serve(entry, &config),
    }
}
