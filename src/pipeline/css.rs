//! Merge stylesheets into `<style>` blocks in `<head>`.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::values::url::Url;
use lightningcss::visit_types;
use lightningcss::visitor::{Visit, VisitTypes, Visitor};
use regex::Regex;

use super::PipelineOptions;
use super::image::data_uri;
use crate::document::{DependencyKind, Document, Edit, find_ascii_ci, is_stylesheet_link};
use crate::error::{BundleError, Result};
use crate::minify::{compress_css, strip_charset};
use crate::utils::path::resolve_reference;

static STYLE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</style").expect("style close pattern is valid"));

/// Rewrites local `url()` targets to `data:` URIs.
struct UrlInliner<'a> {
    stylesheet: &'a Path,
    dir: &'a Path,
}

impl<'i> Visitor<'i> for UrlInliner<'_> {
    type Error = BundleError;

    fn visit_types(&self) -> VisitTypes {
        visit_types!(URLS)
    }

    fn visit_url(&mut self, url: &mut Url<'i>) -> Result<(), Self::Error> {
        // data: and external URLs resolve to nothing and stay as written
        let Some(path) = resolve_reference(self.dir, &url.url) else {
            return Ok(());
        };
        if !path.is_file() {
            return Err(BundleError::CssAsset {
                stylesheet: self.stylesheet.to_path_buf(),
                url: url.url.to_string(),
                path,
            });
        }
        let uri = data_uri(&path).map_err(|e| BundleError::DependencyRead(path.clone(), e))?;
        url.url = uri.into();
        Ok(())
    }
}

/// Turn one stylesheet file into inlineable CSS.
///
/// Strips `@charset`, inlines `url()` targets relative to the stylesheet,
/// then prints minified when `minify` is set. A stylesheet lightningcss
/// cannot parse goes through the textual compressor with its URLs as-is.
pub fn inline_stylesheet(path: &Path, minify: bool) -> Result<String> {
    let raw = fs::read(path).map_err(|e| BundleError::DependencyRead(path.to_path_buf(), e))?;
    let raw = String::from_utf8_lossy(&raw);
    let source = strip_charset(&raw);
    let dir = path.parent().unwrap_or(Path::new(""));

    let options = ParserOptions {
        filename: path.display().to_string(),
        ..ParserOptions::default()
    };

    let fallback = || {
        if minify {
            compress_css(source)
        } else {
            source.trim().to_string()
        }
    };

    let mut sheet = match StyleSheet::parse(source, options) {
        Ok(sheet) => sheet,
        Err(e) => {
            crate::log!("css"; "{}: {}, inlining without url rewrite", path.display(), e);
            return Ok(fallback());
        }
    };

    sheet.visit(&mut UrlInliner {
        stylesheet: path,
        dir,
    })?;

    match sheet.to_css(PrinterOptions {
        minify,
        ..PrinterOptions::default()
    }) {
        Ok(out) => Ok(out.code),
        Err(e) => {
            crate::log!("css"; "{}: {}, inlining without url rewrite", path.display(), e);
            Ok(fallback())
        }
    }
}

/// Inline every stylesheet dependency before the first `</head>`, then
/// remove all local stylesheet `<link>` tags.
///
/// With no stylesheet dependencies nothing is injected and `</head>` is not
/// required.
pub fn merge_css(doc: &mut Document, options: &PipelineOptions) -> Result<()> {
    let mut styles = String::new();
    for dep in doc.deps(DependencyKind::Style) {
        let css = inline_stylesheet(&dep.val, options.minify)?;
        if css.trim().is_empty() {
            continue;
        }
        styles.push_str("<style>");
        styles.push_str(&STYLE_CLOSE.replace_all(&css, r"<\/style"));
        styles.push_str("</style>");
    }

    let mut edits: Vec<Edit> = doc
        .tree()
        .select(is_stylesheet_link)
        .map(|el| Edit::remove(el.outer_span(doc.html())))
        .collect();
    let removed = edits.len();

    if !styles.is_empty() {
        let anchor =
            find_ascii_ci(doc.html(), "</head>", 0).ok_or_else(BundleError::missing_head)?;
        edits.push(Edit::insert(anchor, styles));
    }

    crate::debug!(
        "css";
        "merged {} stylesheets, removed {} links",
        doc.deps(DependencyKind::Style).len(),
        removed
    );
    doc.splice(edits);
    doc.deps_mut(DependencyKind::Style).clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_inline_stylesheet_rewrites_relative_urls() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("img")).unwrap();
        fs::write(dir.path().join("img/bg.gif"), b"GIF89a").unwrap();
        let css = dir.path().join("a.css");
        fs::write(
            &css,
            "@charset \"utf-8\";\nbody { background: url(img/bg.gif); }\n.x { background: url(data:image/png;base64,AAAA); }\n.y { background: url(https://cdn.example.com/z.png); }",
        )
        .unwrap();

        let out = inline_stylesheet(&css, true).unwrap();
        assert!(!out.contains("@charset"));
        assert!(out.contains("data:image/gif;base64,R0lGODlh"));
        assert!(out.contains("data:image/png;base64,AAAA"));
        assert!(out.contains("https://cdn.example.com/z.png"));
        assert!(!out.contains("img/bg.gif"));
    }

    #[test]
    fn test_inline_stylesheet_missing_url_target() {
        let dir = TempDir::new().unwrap();
        let css = dir.path().join("a.css");
        fs::write(&css, "body { background: url(missing.png) }").unwrap();

        let err = inline_stylesheet(&css, true).unwrap_err();
        assert!(matches!(err, BundleError::CssAsset { ref url, .. } if url == "missing.png"));
    }

    #[test]
    fn test_inline_stylesheet_minify_off_keeps_rules() {
        let dir = TempDir::new().unwrap();
        let css = dir.path().join("a.css");
        fs::write(&css, "body{color:red}").unwrap();

        let out = inline_stylesheet(&css, false).unwrap();
        assert!(out.contains("color: red"));
    }
}
