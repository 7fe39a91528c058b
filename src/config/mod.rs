//! Project configuration from `inpack.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [build] and [serve]
//! ├── error          # ConfigError
//! └── mod.rs         # Config (this file)
//! ```
//!
//! A missing default config file means defaults; a missing file named with
//! `-C` is an error. Command-line flags override file values.

mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{BuildConfig, ServeConfig, WatcherKind};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::cli::{Cli, Commands, DEFAULT_CONFIG};
use crate::utils::path::normalize_path;

/// Root configuration structure representing inpack.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl Config {
    /// Load the config file named by the CLI and apply command options.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = normalize_path(&cli.config);

        let mut config = if config_path.is_file() {
            Self::from_path(&config_path)?
        } else if cli.config != Path::new(DEFAULT_CONFIG) {
            bail!("config file `{}` not found", cli.config.display());
        } else {
            Self::default()
        };

        config.config_path = config_path;
        config.resolve_output();
        config.apply_command_options(&cli.command);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Directory holding the config file.
    pub fn root(&self) -> &Path {
        self.config_path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// `build.output` in the file is relative to the file's directory.
    fn resolve_output(&mut self) {
        if let Some(output) = &self.build.output
            && output.is_relative()
        {
            self.build.output = Some(self.root().join(output));
        }
    }

    fn apply_command_options(&mut self, command: &Commands) {
        match command {
            Commands::Build { output, minify, .. } => {
                if let Some(output) = output {
                    self.build.output = Some(output.clone());
                }
                if let Some(minify) = minify {
                    self.build.minify = *minify;
                }
            }
            Commands::Serve {
                interface,
                port,
                watch,
                ..
            } => {
                if let Some(interface) = interface {
                    self.serve.interface = *interface;
                }
                if let Some(port) = port {
                    self.serve.port = *port;
                }
                if let Some(watch) = watch {
                    self.serve.watch = *watch;
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.serve.validate()
    }
}

#[cfg(test)]
pub fn test_parse_config(content: &str) -> Config {
    Config::from_str(content).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_wrong_type_is_rejected() {
        let err = Config::from_str("[build]\nminify = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_load_with_overrides() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("site.toml");
        fs::write(&file, "[build]\noutput = \"public\"\n[serve]\nport = 4000").unwrap();

        let cli = Cli::parse_from([
            "inpack",
            "-C",
            file.to_str().unwrap(),
            "serve",
            "index.html",
            "-p",
            "5000",
        ]);
        let config = Config::load(&cli).unwrap();

        assert_eq!(config.serve.port, 5000);
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.build.output, Some(root.join("public")));
    }

    #[test]
    fn test_load_build_overrides() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("site.toml");
        fs::write(&file, "[build]\nminify = true").unwrap();

        let cli = Cli::parse_from([
            "inpack",
            "-C",
            file.to_str().unwrap(),
            "build",
            "index.html",
            "--minify",
            "false",
            "-o",
            "/tmp/out",
        ]);
        let config = Config::load(&cli).unwrap();
        assert!(!config.build.minify);
        assert_eq!(config.build.output, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn test_explicit_missing_config() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let cli = Cli::parse_from(["inpack", "-C", missing.to_str().unwrap(), "build", "index.html"]);
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("site.toml");
        fs::write(&file, "").unwrap();
        let cli = Cli::parse_from([
            "inpack",
            "-C",
            file.to_str().unwrap(),
            "serve",
            "index.html",
            "--port",
            "65535",
        ]);
        assert!(Config::load(&cli).is_err());
    }
}
