//! Merge scripts into `<script>` blocks before `</body>`.

use std::fs;
use std::sync::LazyLock;

use regex::Regex;

use super::PipelineOptions;
use crate::document::{DependencyKind, Document, Edit, is_script_ref, rfind_ascii_ci};
use crate::error::{BundleError, Result};
use crate::minify::minify_js;

static SCRIPT_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</script").expect("script close pattern is valid"));

/// Make script text safe to embed inside `<script>...</script>`.
pub fn escape_script(js: &str) -> std::borrow::Cow<'_, str> {
    SCRIPT_CLOSE.replace_all(js, r"<\/script")
}

/// Inline every script dependency before the last `</body>`, then remove
/// all local `<script src>` tags.
///
/// A script that fails to parse is inlined unminified.
pub fn merge_js(doc: &mut Document, options: &PipelineOptions) -> Result<()> {
    let mut scripts = String::new();
    for dep in doc.deps(DependencyKind::Script) {
        let raw = fs::read(&dep.val).map_err(|e| BundleError::DependencyRead(dep.val.clone(), e))?;
        let source = String::from_utf8_lossy(&raw);

        let js = if options.minify {
            minify_js(&source).unwrap_or_else(|| {
                crate::log!("js"; "{}: parse failed, inlining unminified", dep.val.display());
                source.trim().to_string()
            })
        } else {
            source.trim().to_string()
        };

        scripts.push_str("<script>");
        scripts.push_str(&escape_script(&js));
        scripts.push_str("</script>");
    }

    let mut edits: Vec<Edit> = doc
        .tree()
        .select(is_script_ref)
        .map(|el| Edit::remove(el.outer_span(doc.html())))
        .collect();
    let removed = edits.len();

    if !scripts.is_empty() {
        let anchor = rfind_ascii_ci(doc.html(), "</body>").ok_or_else(BundleError::missing_body)?;
        edits.push(Edit::insert(anchor, scripts));
    }

    crate::debug!(
        "js";
        "merged {} scripts, removed {} tags",
        doc.deps(DependencyKind::Script).len(),
        removed
    );
    doc.splice(edits);
    doc.deps_mut(DependencyKind::Script).clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_script() {
        assert_eq!(escape_script("var s='</script>';"), r"var s='<\/script>';");
        assert_eq!(escape_script("a</SCRIPT b"), r"a<\/script b");
        assert_eq!(escape_script("plain"), "plain");
    }
}
