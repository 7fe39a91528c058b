//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::utils::path::is_within;

/// Where a request URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The bundled entry page.
    Entry,
    /// A file inside the project root.
    File(PathBuf),
    /// Resolves outside the project root.
    Forbidden,
    NotFound,
}

/// Resolve `url` against `root`. `entry` is canonical.
///
/// Directories serve their `index.html`.
pub fn resolve(url: &str, root: &Path, entry: &Path) -> Target {
    let clean = normalize_url(url);
    if clean.is_empty() {
        return Target::Entry;
    }

    let Ok(canonical) = root.join(&clean).canonicalize() else {
        return Target::NotFound;
    };
    if !is_within(root, &canonical) {
        return Target::Forbidden;
    }

    let file = if canonical.is_dir() {
        canonical.join("index.html")
    } else {
        canonical
    };

    if !file.is_file() {
        Target::NotFound
    } else if file == entry {
        Target::Entry
    } else {
        Target::File(file)
    }
}

/// Normalize URL: decode, strip query string and fragment, trim slashes
fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    decoded.trim_matches('/').to_string()
}

/// `.html` and `.htm` files get placeholders rendered and the client injected.
pub fn is_page(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}
