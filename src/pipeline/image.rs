//! Inline `<img>` sources as `data:` URIs.

use std::fs;
use std::io;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rustc_hash::FxHashMap;

use crate::document::{Dependency, DependencyKind, Document, Edit, image_src};
use crate::error::{BundleError, Result};
use crate::utils::mime;
use crate::utils::path::{is_data_uri, resolve_reference};

/// `data:<mime>;base64,<bytes>` for a file.
pub fn data_uri(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let mime = mime::essence(mime::from_path(path));
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

/// Replace the `src` of every `<img>` that references an image dependency.
///
/// Every image dependency must be an existing file; images are not shaken,
/// so a missing one fails the bundle before any markup changes. An `<img>`
/// takes the dependency its `src` resolves to; failing that, the first
/// dependency whose key its `src` contains.
pub fn inline_images(doc: &mut Document) -> Result<()> {
    let deps = doc.deps(DependencyKind::Image);
    if deps.is_empty() {
        return Ok(());
    }

    if let Some(missing) = deps.iter().find(|dep| !dep.val.is_file()) {
        return Err(BundleError::MissingImage {
            key: missing.key.clone(),
            path: missing.val.clone(),
        });
    }

    let mut encoded: FxHashMap<&Path, String> = FxHashMap::default();
    let mut edits = Vec::new();

    for el in doc.tree().select(|el| image_src(el).is_some()) {
        let Some(src) = el.attr("src") else { continue };
        if is_data_uri(src) {
            continue;
        }
        let Some(dep) = match_dependency(deps, doc.dir(), src) else {
            continue;
        };

        if !encoded.contains_key(dep.val.as_path()) {
            let uri = data_uri(&dep.val).map_err(|e| BundleError::DependencyRead(dep.val.clone(), e))?;
            encoded.insert(dep.val.as_path(), uri);
        }
        let uri = &encoded[dep.val.as_path()];
        edits.push(Edit::replace(el.span(), el.with_attr("src", uri)));
    }

    crate::debug!("image"; "inlined {} <img> from {} files", edits.len(), encoded.len());
    doc.splice(edits);
    doc.deps_mut(DependencyKind::Image).clear();
    Ok(())
}

fn match_dependency<'a>(deps: &'a [Dependency], dir: &Path, src: &str) -> Option<&'a Dependency> {
    let resolved = resolve_reference(dir, src);
    deps.iter()
        .find(|dep| dep.key == src || resolved.as_ref() == Some(&dep.val))
        .or_else(|| deps.iter().find(|dep| src.contains(dep.key.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_data_uri_known_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dot.png");
        fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        assert_eq!(data_uri(&path).unwrap(), "data:image/png;base64,iVBORw==");
    }

    #[test]
    fn test_data_uri_strips_charset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("icon.svg");
        fs::write(&path, "<svg/>").unwrap();
        assert!(data_uri(&path).unwrap().starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn test_overlapping_keys_keep_their_own_bytes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("logo.png"), "AAAA").unwrap();
        fs::write(dir.path().join("footer-logo.png"), "BBBB").unwrap();
        let mut doc = Document::from_html(
            dir.path().join("index.html"),
            r#"<body><img src="logo.png"><img src="footer-logo.png"></body>"#,
        );

        inline_images(&mut doc).unwrap();
        let srcs: Vec<_> = doc.tree().select(|el| el.name() == "img").filter_map(|el| el.attr("src")).collect();
        assert_eq!(
            srcs,
            ["data:image/png;base64,QUFBQQ==", "data:image/png;base64,QkJCQg=="]
        );
    }

    #[test]
    fn test_src_with_query_matches_its_dependency() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("logo.png"), "AAAA").unwrap();
        let mut doc = Document::from_html(
            dir.path().join("index.html"),
            r#"<body><img src="./logo.png?v=2"></body>"#,
        );

        inline_images(&mut doc).unwrap();
        assert!(doc.html().contains(r#"src="data:image/png;base64,QUFBQQ==""#));
    }
}
