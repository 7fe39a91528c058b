//! HTTP response handlers.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result, anyhow};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::ServeState;
use super::render::{INVALID_HTML, Rendered, render_file};
use crate::utils::date::http_date;
use crate::utils::mime::{self, types};

/// Respond with a rendered page.
pub fn respond_rendered(request: Request, rendered: Rendered) -> Result<()> {
    match rendered {
        Rendered::Page(html) => send_body(request, 200, types::HTML, html.into_bytes(), &[]),
        Rendered::Failed(html) => send_body(request, 500, types::HTML, html.into_bytes(), &[]),
        Rendered::Invalid => respond_text(request, 500, INVALID_HTML),
    }
}

/// Respond with a file under the project root.
///
/// Pages are rendered; everything else is sent as bytes with
/// `Last-Modified`, answering a matching `If-Modified-Since` with 304.
pub fn respond_file(request: Request, path: &Path, state: &ServeState) -> Result<()> {
    if super::path::is_page(path) {
        let html = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        return respond_rendered(request, render_file(&html, state));
    }

    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map(http_date)
        .unwrap_or_else(|_| http_date(SystemTime::UNIX_EPOCH));

    if header_value(&request, "If-Modified-Since").is_some_and(|since| since.trim() == modified) {
        let response = Response::empty(StatusCode(304)).with_header(header("Last-Modified", &modified)?);
        request.respond(response)?;
        return Ok(());
    }

    let content_type = mime::from_path(path);
    let extra = [("Last-Modified", modified.as_str())];
    if is_head_request(&request) {
        return send_head(request, 200, content_type, &extra);
    }

    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    send_body(request, 200, content_type, body, &extra)
}

/// Plain-text status response.
pub fn respond_text(request: Request, status: u16, text: &str) -> Result<()> {
    send_body(request, status, types::PLAIN, text.as_bytes().to_vec(), &[])
}

pub fn respond_not_found(request: Request) -> Result<()> {
    respond_text(request, 404, "404 Not Found")
}

pub fn respond_bad_request(request: Request) -> Result<()> {
    respond_text(request, 400, "400 Bad Request")
}

pub fn respond_method_not_allowed(request: Request) -> Result<()> {
    respond_text(request, 405, "405 Method Not Allowed")
}

pub fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn header_value<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

fn send_head(request: Request, status: u16, content_type: &str, extra: &[(&str, &str)]) -> Result<()> {
    let mut response = Response::empty(StatusCode(status)).with_header(header("Content-Type", content_type)?);
    for (key, value) in extra {
        response.add_header(header(key, value)?);
    }
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &str,
    body: Vec<u8>,
    extra: &[(&str, &str)],
) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, status, content_type, extra);
    }
    let mut response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(header("Content-Type", content_type)?);
    for (key, value) in extra {
        response.add_header(header(key, value)?);
    }
    request.respond(response)?;
    Ok(())
}

fn header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes()).map_err(|()| anyhow!("invalid header {key}: {value}"))
}
