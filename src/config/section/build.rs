//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! minify = true               # Minify html, css and js
//! output = "dist"             # Output directory (relative to this file)
//! ```
//!
//! Without `output`, the bundle goes to `dist/` next to the entry's directory.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineOptions;

/// Bundle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Run the minifiers. Inlining happens either way.
    pub minify: bool,

    /// Output directory override.
    pub output: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            minify: true,
            output: None,
        }
    }
}

impl BuildConfig {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            minify: self.minify,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;
    use std::path::PathBuf;

    #[test]
    fn test_build_config() {
        let config = test_parse_config("[build]\nminify = false\noutput = \"public\"");
        assert!(!config.build.minify);
        assert_eq!(config.build.output, Some(PathBuf::from("public")));
        assert!(!config.build.pipeline_options().minify);
    }

    #[test]
    fn test_build_config_defaults() {
        let config = test_parse_config("");
        assert!(config.build.minify);
        assert!(config.build.output.is_none());
    }
}
