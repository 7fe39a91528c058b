//! Whole-document HTML minification stage.

use super::PipelineOptions;
use crate::document::Document;

/// Minify the markup in place and resync the tree. No-op with minify off.
pub fn minify_html(doc: &mut Document, options: &PipelineOptions) {
    if !options.minify {
        return;
    }
    let before = doc.html().len();
    let html = crate::minify::minify_html(doc.html());
    crate::debug!("html"; "minified {} -> {} bytes", before, html.len());
    doc.set_html_and_resync(html);
}
