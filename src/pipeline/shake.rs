//! Drop stylesheet and script references that point nowhere useful.

use std::fs;
use std::path::Path;

use crate::document::{Document, DependencyKind};

/// Keep only stylesheet and script dependencies whose file exists and has
/// non-whitespace content. Images are left alone.
///
/// Never fails; a dropped dependency's tag is still removed by the merge
/// stages, so the reference disappears from the output.
pub fn shake(doc: &mut Document) {
    for kind in [DependencyKind::Style, DependencyKind::Script] {
        doc.deps_mut(kind).retain(|dep| {
            let keep = has_content(&dep.val);
            if !keep {
                crate::debug!("shake"; "drop {} `{}`", kind, dep.key);
            }
            keep
        });
    }
}

fn has_content(path: &Path) -> bool {
    path.is_file()
        && fs::read(path).is_ok_and(|bytes| bytes.iter().any(|b| !b.is_ascii_whitespace()))
}
