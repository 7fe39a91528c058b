//! Page rendering for the dev server.
//!
//! `/` goes through the bundling pipeline, then placeholders, then client
//! injection. Other `.html` files skip the pipeline.

use std::collections::BTreeMap;
use std::path::Path;

use crate::document::{Document, rfind_ascii_ci};
use crate::embed::render_placeholders;
use crate::embed::serve::{LivereloadVars, livereload_tag};
use crate::error::BundleError;
use crate::logger::status_error;
use crate::pipeline::Pipeline;
use crate::utils::html::escape;

use super::ServeState;

/// Body of the 500 sent when a page has nowhere to take the client.
pub const INVALID_HTML: &str = "Invalid HTML format.";

/// Outcome of rendering one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Serve with 200.
    Page(String),
    /// Bundle failed; an error page that still reloads on the next change.
    Failed(String),
    /// No `</body>` to inject the client before.
    Invalid,
}

/// Render the entry page.
pub fn render_entry(state: &ServeState) -> Rendered {
    match bundle_entry(&state.entry, state) {
        Ok(html) => render_page(&html, &state.vars, state.client.as_ref()),
        Err(e) => {
            let detail = error_chain(&e);
            status_error("bundle failed", &detail);
            Rendered::Failed(error_page(&detail, state.client.as_ref()))
        }
    }
}

/// Render a non-entry `.html` file as written.
pub fn render_file(html: &str, state: &ServeState) -> Rendered {
    render_page(html, &state.vars, state.client.as_ref())
}

fn bundle_entry(entry: &Path, state: &ServeState) -> Result<String, BundleError> {
    let mut doc = Document::load(entry)?;
    if state.bundle {
        Pipeline::new(state.options).run(&mut doc)?;
    }
    Ok(doc.into_html())
}

/// Substitute placeholders, then inject the client when live reload is on.
pub fn render_page(
    html: &str,
    vars: &BTreeMap<String, String>,
    client: Option<&LivereloadVars>,
) -> Rendered {
    let html = render_placeholders(html, vars);
    let Some(client) = client else {
        return Rendered::Page(html.into_owned());
    };
    match inject_client(&html, &livereload_tag(client)) {
        Some(page) => Rendered::Page(page),
        None => Rendered::Invalid,
    }
}

/// Insert `tag` before the last `</body>`.
pub fn inject_client(html: &str, tag: &str) -> Option<String> {
    let pos = rfind_ascii_ci(html, "</body>")?;
    let mut out = String::with_capacity(html.len() + tag.len());
    out.push_str(&html[..pos]);
    out.push_str(tag);
    out.push_str(&html[pos..]);
    Some(out)
}

fn error_chain(err: &BundleError) -> String {
    let mut detail = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

fn error_page(detail: &str, client: Option<&LivereloadVars>) -> String {
    let script = client.map(livereload_tag).unwrap_or_default();
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Bundle Error</title></head>\
         <body><h1>Bundle Error</h1><pre>{}</pre>{script}</body></html>",
        escape(detail)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> BTreeMap<String, String> {
        BTreeMap::from([("title".to_string(), "Demo".to_string())])
    }

    #[test]
    fn test_inject_before_last_body() {
        let out = inject_client("<body><pre></body></pre></BODY>", "<script>x</script>").unwrap();
        assert_eq!(out, "<body><pre></body></pre><script>x</script></BODY>");
        assert!(inject_client("<p>no body</p>", "<script></script>").is_none());
    }

    #[test]
    fn test_render_page_with_client() {
        let client = LivereloadVars::default();
        let Rendered::Page(html) = render_page("<body><h1>{{ title }}</h1></body>", &vars(), Some(&client)) else {
            panic!("expected page");
        };
        assert!(html.starts_with("<body><h1>Demo</h1><script>"));
        assert!(html.ends_with("</script></body>"));
    }

    #[test]
    fn test_render_page_without_body() {
        let client = LivereloadVars::default();
        assert_eq!(render_page("<p>x</p>", &vars(), Some(&client)), Rendered::Invalid);
        // Without live reload nothing needs injecting
        assert_eq!(
            render_page("<p>{{title}}</p>", &vars(), None),
            Rendered::Page("<p>Demo</p>".into())
        );
    }

    #[test]
    fn test_error_page_escapes_and_reloads() {
        let client = LivereloadVars::default();
        let page = error_page("image `<x>` not found", Some(&client));
        assert!(page.contains("image `&lt;x&gt;` not found"));
        assert!(page.contains("<script>"));
        assert!(inject_client(&page, "").is_some());
    }
}
