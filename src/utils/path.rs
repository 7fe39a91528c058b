//! Path and URL reference utilities.
//!
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `is_external_link` / `is_data_uri` - references that never touch the disk
//! - `resolve_reference` - attribute or `url()` value to an absolute path
//! - `is_within` - containment check for served files

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Check if a link is external (has a URL scheme like http:, mailto:, etc.)
/// or is protocol-relative (`//cdn.example.com/x.js`).
///
/// A valid scheme must:
/// - Have at least 1 character before the colon
/// - Only contain ASCII alphanumeric or `+`, `-`, `.`
///
/// Single-letter schemes are treated as Windows drive letters, not URLs.
#[inline]
pub fn is_external_link(link: &str) -> bool {
    if link.starts_with("//") {
        return true;
    }
    link.find(':').is_some_and(|pos| {
        pos > 1
            && link[..pos]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Check if a value is already an inline `data:` URI.
#[inline]
pub fn is_data_uri(value: &str) -> bool {
    value
        .trim_start()
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Whether a reference points at a file on disk.
#[inline]
pub fn is_local_reference(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.starts_with('#') && !is_data_uri(value) && !is_external_link(value)
}

/// Drop `?query` and `#fragment` suffixes.
#[inline]
pub fn strip_query_fragment(value: &str) -> &str {
    value
        .find(['?', '#'])
        .map_or(value, |pos| &value[..pos])
}

/// Resolve a local reference against `base_dir`.
///
/// Query and fragment are ignored, percent escapes decoded, and a leading
/// `/` is taken relative to `base_dir` rather than the filesystem root.
/// Returns `None` for external, `data:` and empty references.
pub fn resolve_reference(base_dir: &Path, value: &str) -> Option<PathBuf> {
    if !is_local_reference(value) {
        return None;
    }
    let path = strip_query_fragment(value.trim());
    if path.is_empty() {
        return None;
    }
    let decoded: Cow<'_, str> = percent_decode_str(path).decode_utf8_lossy();
    let relative = decoded.trim_start_matches('/');
    Some(clean(&base_dir.join(relative)))
}

/// Lexically remove `.` and `..` components.
///
/// Unlike `canonicalize()`, works for paths that do not exist yet.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Check that `path` stays inside `root` after canonicalization.
///
/// Both paths must exist; a missing path is never considered contained.
pub fn is_within(root: &Path, path: &Path) -> bool {
    match (root.canonicalize(), path.canonicalize()) {
        (Ok(root), Ok(path)) => path.starts_with(root),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_relative() {
        let normalized = normalize_path(Path::new("relative/path/file.txt"));
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_is_external_link() {
        assert!(is_external_link("https://example.com/a.css"));
        assert!(is_external_link("//cdn.example.com/x.js"));
        assert!(is_external_link("mailto:user@example.com"));
        assert!(!is_external_link("css/a.css"));
        assert!(!is_external_link("./a.css"));
        assert!(!is_external_link("/abs/a.css"));
        assert!(!is_external_link("C:/site/a.css"));
    }

    #[test]
    fn test_is_data_uri() {
        assert!(is_data_uri("data:image/png;base64,AAAA"));
        assert!(is_data_uri("  DATA:text/plain,x"));
        assert!(!is_data_uri("img/data.png"));
        assert!(!is_data_uri("dat"));
    }

    #[test]
    fn test_strip_query_fragment() {
        assert_eq!(strip_query_fragment("a.css?v=1"), "a.css");
        assert_eq!(strip_query_fragment("font.svg#icon"), "font.svg");
        assert_eq!(strip_query_fragment("a.css"), "a.css");
    }

    #[test]
    fn test_resolve_reference() {
        let base = Path::new("/site/src");
        assert_eq!(
            resolve_reference(base, "css/a.css?v=2"),
            Some(PathBuf::from("/site/src/css/a.css"))
        );
        assert_eq!(
            resolve_reference(base, "/img/my%20logo.png"),
            Some(PathBuf::from("/site/src/img/my logo.png"))
        );
        assert_eq!(
            resolve_reference(base, "../shared/x.js"),
            Some(PathBuf::from("/site/shared/x.js"))
        );
        assert_eq!(resolve_reference(base, "https://x.dev/a.css"), None);
        assert_eq!(resolve_reference(base, "data:image/png;base64,AA"), None);
        assert_eq!(resolve_reference(base, "   "), None);
        assert_eq!(resolve_reference(base, "?v=1"), None);
    }

    #[test]
    fn test_is_within() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("secret.txt"), "s").unwrap();

        assert!(is_within(&root, &root.join("a.txt")));
        assert!(!is_within(&root, &root.join("../secret.txt")));
        assert!(!is_within(&root, &root.join("missing.txt")));
    }
}
