use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use tiny_http::Server;

use super::*;
use crate::embed::serve::LivereloadVars;
use crate::utils::date::http_date;

const PAGE: &str = "<html><head><link rel=\"stylesheet\" href=\"a.css\"></head><body><h1>{{ title }}</h1></body></html>";

fn project(index: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/index.html"), index).unwrap();
    fs::write(dir.path().join("src/a.css"), "h1 { color: red }").unwrap();
    fs::write(dir.path().join("src/about.html"), "<body>{{title}} about</body>").unwrap();
    fs::write(dir.path().join("secret.txt"), "s").unwrap();
    dir
}

fn state(dir: &Path, client: bool) -> ServeState {
    let entry = dir.join("src/index.html").canonicalize().unwrap();
    ServeState {
        root: entry.parent().unwrap().to_path_buf(),
        entry,
        options: PipelineOptions { minify: false },
        bundle: true,
        vars: BTreeMap::from([("title".to_string(), "Preview".to_string())]),
        client: client.then(LivereloadVars::default),
    }
}

/// Serve requests on an ephemeral port until the test ends.
fn start(state: ServeState) -> SocketAddr {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let state = Arc::new(state);
    thread::spawn(move || {
        for request in server.incoming_requests() {
            let _ = handle_request(request, &state);
        }
    });
    addr
}

/// Raw HTTP/1.1 exchange; returns (status, head, body).
fn fetch(addr: SocketAddr, method: &str, path: &str, headers: &[(&str, &str)]) -> (u16, String, String) {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n");
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    req.push_str("\r\n");
    stream.write_all(req.as_bytes()).unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).unwrap();
    let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw.as_str(), ""));
    let status = head.split(' ').nth(1).unwrap().parse().unwrap();
    (status, head.to_string(), body.to_string())
}

#[test]
fn test_entry_is_bundled_and_rendered() {
    let dir = project(PAGE);
    let addr = start(state(dir.path(), true));

    let (status, head, body) = fetch(addr, "GET", "/", &[]);
    assert_eq!(status, 200);
    assert!(head.to_ascii_lowercase().contains("content-type: text/html"));
    assert!(body.contains("<style>"));
    assert!(body.contains("color: red"));
    assert!(!body.contains("<link"));
    assert!(body.contains("<h1>Preview</h1>"));
    assert!(body.contains("<script>"));
    assert!(body.find("<script>").unwrap() < body.rfind("</body>").unwrap());
}

#[test]
fn test_entry_without_body_is_invalid() {
    let dir = project("<p>{{ title }}</p>");
    let addr = start(state(dir.path(), true));

    let (status, _, body) = fetch(addr, "GET", "/", &[]);
    assert_eq!(status, 500);
    assert_eq!(body, "Invalid HTML format.");
}

#[test]
fn test_bundle_failure_page_keeps_client() {
    let dir = project("<html><head></head><body><img src=\"missing.png\"></body></html>");
    let addr = start(state(dir.path(), true));

    let (status, _, body) = fetch(addr, "GET", "/", &[]);
    assert_eq!(status, 500);
    assert!(body.contains("Bundle Error"));
    assert!(body.contains("missing.png"));
    assert!(body.contains("<script>"));
}

#[test]
fn test_other_pages_render_without_bundling() {
    let dir = project(PAGE);
    let addr = start(state(dir.path(), true));

    let (status, _, body) = fetch(addr, "GET", "/about.html", &[]);
    assert_eq!(status, 200);
    assert!(body.starts_with("<body>Preview about<script>"));
}

#[test]
fn test_static_file_and_conditional_get() {
    let dir = project(PAGE);
    let addr = start(state(dir.path(), false));

    let (status, head, body) = fetch(addr, "GET", "/a.css", &[]);
    assert_eq!(status, 200);
    assert_eq!(body, "h1 { color: red }");
    assert!(head.to_ascii_lowercase().contains("content-type: text/css"));

    let modified = http_date(fs::metadata(dir.path().join("src/a.css")).unwrap().modified().unwrap());
    assert!(head.contains(&modified));

    let (status, _, body) = fetch(addr, "GET", "/a.css", &[("If-Modified-Since", &modified)]);
    assert_eq!(status, 304);
    assert!(body.is_empty());

    let stale = http_date(SystemTime::UNIX_EPOCH);
    let (status, _, _) = fetch(addr, "GET", "/a.css", &[("If-Modified-Since", &stale)]);
    assert_eq!(status, 200);
}

#[test]
fn test_head_has_no_body() {
    let dir = project(PAGE);
    let addr = start(state(dir.path(), false));

    let (status, _, body) = fetch(addr, "HEAD", "/a.css", &[]);
    assert_eq!(status, 200);
    assert!(body.is_empty());
}

#[test]
fn test_escape_and_missing() {
    let dir = project(PAGE);
    let addr = start(state(dir.path(), false));

    assert_eq!(fetch(addr, "GET", "/../secret.txt", &[]).0, 400);
    assert_eq!(fetch(addr, "GET", "/nope.js", &[]).0, 404);
    assert_eq!(fetch(addr, "POST", "/", &[]).0, 405);
}

#[test]
fn test_state_rejects_missing_entry() {
    let dir = TempDir::new().unwrap();
    assert!(ServeState::new(&dir.path().join("nope.html"), &Config::default()).is_err());
}
