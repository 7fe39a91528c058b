//! Bundling error types.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions that abort a bundle.
///
/// Missing or empty stylesheets and scripts are not errors: the shake stage
/// drops them before anything reads them.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("cannot read entry file `{0}`")]
    EntryRead(PathBuf, #[source] std::io::Error),

    #[error("image `{key}` not found at `{path}`")]
    MissingImage { key: String, path: PathBuf },

    #[error("cannot read `{0}`")]
    DependencyRead(PathBuf, #[source] std::io::Error),

    #[error("`url({url})` in `{stylesheet}` points to missing file `{path}`")]
    CssAsset {
        stylesheet: PathBuf,
        url: String,
        path: PathBuf,
    },

    #[error("no `{anchor}` to inject into")]
    MissingAnchor { anchor: &'static str },

    #[error("output path `{0}` exists and is not a directory")]
    OutputNotDir(PathBuf),

    #[error("output directory `{output}` contains the entry file `{entry}`")]
    OutputContainsEntry { output: PathBuf, entry: PathBuf },

    #[error("cannot write output `{0}`")]
    Write(PathBuf, #[source] std::io::Error),
}

impl BundleError {
    pub fn missing_head() -> Self {
        Self::MissingAnchor { anchor: "</head>" }
    }

    pub fn missing_body() -> Self {
        Self::MissingAnchor { anchor: "</body>" }
    }
}

pub type Result<T, E = BundleError> = std::result::Result<T, E>;
