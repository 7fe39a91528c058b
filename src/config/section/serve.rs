//! `[serve]` section configuration.
//!
//! Contains development server settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 9527                 # HTTP port; the reload relay takes port + 1
//! watch = true                # Reload browsers on file changes
//! watcher = "poll"            # "poll" rescans every tick, "notify" only after fs events
//! poll_interval_ms = 300      # Change detector tick
//! heartbeat_secs = 55         # Keep-alive interval for relay connections
//! reconnect_ms = 1000         # Browser reconnect delay
//! bundle = true               # Serve `/` through the bundling pipeline
//!
//! [serve.vars]
//! title = "Preview"           # Replaces {{ title }} in served pages
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// How the change detector decides when to rescan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatcherKind {
    #[default]
    Poll,
    Notify,
}

/// Development server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Enable change detection and live reload.
    pub watch: bool,

    pub watcher: WatcherKind,

    pub poll_interval_ms: u64,

    pub heartbeat_secs: u64,

    pub reconnect_ms: u64,

    /// Render `/` through the bundling pipeline instead of as written.
    pub bundle: bool,

    /// Values for `{{ name }}` placeholders in served pages.
    pub vars: BTreeMap<String, String>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 9527,
            watch: true,
            watcher: WatcherKind::Poll,
            poll_interval_ms: 300,
            heartbeat_secs: 55,
            reconnect_ms: 1000,
            bundle: true,
            vars: BTreeMap::new(),
        }
    }
}

impl ServeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == u16::MAX {
            return Err(ConfigError::Validation(format!(
                "serve.port {} leaves no port for the reload relay",
                self.port
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "serve.poll_interval_ms must be greater than 0".into(),
            ));
        }
        if self.heartbeat_secs == 0 {
            return Err(ConfigError::Validation(
                "serve.heartbeat_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
