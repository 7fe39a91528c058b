//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Config file looked up when `-C` is not given.
pub const DEFAULT_CONFIG: &str = "inpack.toml";

/// inpack single-page bundler CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Print debug logs, including relay traffic
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: inpack.toml)
    #[arg(short = 'C', long, global = true, default_value = DEFAULT_CONFIG, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Bundle an HTML entry into one self-contained file
    #[command(visible_alias = "b")]
    Build {
        /// Entry HTML file
        #[arg(value_hint = clap::ValueHint::FilePath)]
        entry: PathBuf,

        /// Output directory (default: `dist` beside the entry's directory)
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        output: Option<PathBuf>,

        /// Minify html, css and js
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        minify: Option<bool>,
    },

    /// Serve the entry with live reload
    #[command(visible_alias = "s")]
    Serve {
        /// Entry HTML file
        #[arg(value_hint = clap::ValueHint::FilePath)]
        entry: PathBuf,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable change detection and live reload
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },
}

impl Commands {
    pub fn entry(&self) -> &PathBuf {
        match self {
            Self::Build { entry, .. } | Self::Serve { entry, .. } => entry,
        }
    }
}
