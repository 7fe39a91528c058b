//! Dependency discovery.
//!
//! Element predicates are shared with the pipeline so that what gets
//! analyzed is exactly what gets removed.

use super::{Dependency, Document, Element};
use crate::utils::path::{is_local_reference, resolve_reference, strip_query_fragment};

fn has_extension(value: &str, ext: &str) -> bool {
    let path = strip_query_fragment(value.trim());
    path.len() > ext.len()
        && path
            .get(path.len() - ext.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(ext))
}

/// `href` of a local stylesheet `<link>`.
///
/// Matches `rel="stylesheet"`, or a `.css` href on a link without `rel`.
pub fn stylesheet_href(el: &Element) -> Option<&str> {
    if el.name() != "link" {
        return None;
    }
    let href = el.attr("href").filter(|href| is_local_reference(href))?;
    match el.attr("rel") {
        Some(rel) if rel.split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")) => {
            Some(href)
        }
        None if has_extension(href, ".css") => Some(href),
        _ => None,
    }
}

pub fn is_stylesheet_link(el: &Element) -> bool {
    stylesheet_href(el).is_some()
}

/// `src` of a local `<script src="*.js">`.
pub fn script_src(el: &Element) -> Option<&str> {
    if el.name() != "script" {
        return None;
    }
    el.attr("src")
        .filter(|src| is_local_reference(src) && has_extension(src, ".js"))
}

pub fn is_script_ref(el: &Element) -> bool {
    script_src(el).is_some()
}

/// Non-empty `src` of a local `<img>`.
pub fn image_src(el: &Element) -> Option<&str> {
    if el.name() != "img" {
        return None;
    }
    el.attr("src").filter(|src| is_local_reference(src))
}

impl Document {
    /// Rebuild the three dependency lists from the current tree.
    ///
    /// Lists are replaced, never appended to.
    pub fn analyze(&mut self) {
        self.styles.clear();
        self.scripts.clear();
        self.images.clear();

        for el in self.tree.elements() {
            let (list, value) = if let Some(href) = stylesheet_href(el) {
                (&mut self.styles, href)
            } else if let Some(src) = script_src(el) {
                (&mut self.scripts, src)
            } else if let Some(src) = image_src(el) {
                (&mut self.images, src)
            } else {
                continue;
            };

            if let Some(path) = resolve_reference(&self.dir, value) {
                list.push(Dependency::new(value, path));
            }
        }

        crate::debug!(
            "analyze";
            "{}: {} css, {} js, {} img",
            self.path.display(),
            self.styles.len(),
            self.scripts.len(),
            self.images.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DependencyKind;
    use std::path::PathBuf;

    const PAGE: &str = r#"<!doctype html>
<html>
<head>
  <link rel="stylesheet" href="css/a.css">
  <link rel="icon" href="favicon.ico">
  <link href="b.css?v=3">
  <link rel="stylesheet" href="https://cdn.example.com/x.css">
  <script src="https://cdn.example.com/lib.js"></script>
</head>
<body>
  <img src="img/logo.png">
  <img>
  <img src="">
  <img src="data:image/png;base64,AAAA">
  <script src="js/app.js"></script>
  <script src="js/app.js"></script>
  <script>inline()</script>
</body>
</html>"#;

    fn keys(doc: &Document, kind: DependencyKind) -> Vec<&str> {
        doc.deps(kind).iter().map(|d| d.key.as_str()).collect()
    }

    #[test]
    fn test_analyze_collects_local_refs_in_order() {
        let doc = Document::from_html("/site/src/index.html", PAGE);
        assert_eq!(keys(&doc, DependencyKind::Style), ["css/a.css", "b.css?v=3"]);
        assert_eq!(keys(&doc, DependencyKind::Script), ["js/app.js", "js/app.js"]);
        assert_eq!(keys(&doc, DependencyKind::Image), ["img/logo.png"]);
    }

    #[test]
    fn test_analyze_resolves_against_document_dir() {
        let doc = Document::from_html("/site/src/index.html", PAGE);
        assert_eq!(
            doc.deps(DependencyKind::Style)[1].val,
            PathBuf::from("/site/src/b.css")
        );
        assert_eq!(
            doc.deps(DependencyKind::Image)[0].val,
            PathBuf::from("/site/src/img/logo.png")
        );
    }

    #[test]
    fn test_analyze_is_repeatable() {
        let mut doc = Document::from_html("/site/src/index.html", PAGE);
        doc.analyze();
        doc.analyze();
        assert_eq!(doc.deps(DependencyKind::Style).len(), 2);
        assert_eq!(doc.deps(DependencyKind::Script).len(), 2);
        assert_eq!(doc.deps(DependencyKind::Image).len(), 1);
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("a.JS", ".js"));
        assert!(has_extension("a.css?x#y", ".css"));
        assert!(!has_extension(".js", ".js"));
        assert!(!has_extension("a.json", ".js"));
    }
}
