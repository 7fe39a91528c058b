//! `build` command: bundle an entry into the output directory.

use std::path::Path;

use anyhow::{Context, Result};

use crate::compile::compile;
use crate::config::Config;
use crate::log;

/// Bundle `entry` into the configured output directory.
pub fn build(entry: &Path, config: &Config) -> Result<()> {
    let output = compile(entry, config.build.output.as_deref(), config.build.pipeline_options())
        .with_context(|| format!("failed to bundle {}", entry.display()))?;

    log!("build"; "wrote {}", output.display());
    Ok(())
}
