//! Development server with live reload support.
//!
//! ```text
//! HTTP  :port      GET /  -> bundle -> placeholders -> client script
//! Relay :port + 1  ws     <- DetectorClient (direct/reload broadcasts)
//! ```

mod lifecycle;
mod path;
mod render;
mod response;

#[cfg(test)]
mod tests;

pub use lifecycle::setup_shutdown_handler;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tiny_http::{Method, Request, Server};

use crate::config::{Config, WatcherKind};
use crate::embed::serve::LivereloadVars;
use crate::pipeline::PipelineOptions;
use crate::reload::{DetectorClient, start_relay};
use crate::watch::Listener;
use crate::{debug, log};

use path::Target;

/// Worker threads answering HTTP requests.
const REQUEST_WORKERS: usize = 4;

/// Everything a request handler needs, shared read-only.
#[derive(Debug, Clone)]
pub struct ServeState {
    /// Canonical entry file.
    pub entry: PathBuf,
    /// Directory static files are served from.
    pub root: PathBuf,
    pub options: PipelineOptions,
    pub bundle: bool,
    pub vars: BTreeMap<String, String>,
    /// `None` when live reload is off.
    pub client: Option<LivereloadVars>,
}

impl ServeState {
    pub fn new(entry: &Path, config: &Config) -> Result<Self> {
        let entry = entry
            .canonicalize()
            .with_context(|| format!("entry file `{}` not found", entry.display()))?;
        if !entry.is_file() {
            bail!("entry `{}` is not a file", entry.display());
        }
        let root = entry.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self {
            entry,
            root,
            options: config.build.pipeline_options(),
            bundle: config.serve.bundle,
            vars: config.serve.vars.clone(),
            client: None,
        })
    }
}

/// Run the dev server until Ctrl+C.
pub fn serve(entry: &Path, config: &Config) -> Result<()> {
    let mut state = ServeState::new(entry, config)?;
    let serve = &config.serve;

    let (server, addr) = lifecycle::bind_with_retry(serve.interface, serve.port)?;
    let server = Arc::new(server);
    lifecycle::register_server(Arc::clone(&server));

    if serve.watch {
        let relay_port = start_relay(serve.interface, addr.port().saturating_add(1), crate::logger::is_verbose())?;
        let listener = match serve.watcher {
            WatcherKind::Poll => Listener::new(&state.entry),
            WatcherKind::Notify => Listener::with_notify(&state.entry).context("failed to start notify watcher")?,
        };
        log!("watch"; "watching {}", listener.root().display());
        DetectorClient::new(
            listener,
            lifecycle::connect_address(serve.interface, relay_port),
            serve.poll_interval(),
            serve.heartbeat(),
        )
        .spawn()?;

        state.client = Some(LivereloadVars {
            ws_port: relay_port,
            reconnect_ms: serve.reconnect_ms,
            heartbeat_ms: serve.heartbeat_secs * 1000,
        });
        debug!("serve"; "relay on ws://{}", lifecycle::connect_address(serve.interface, relay_port));
    }

    log!("serve"; "http://{}", addr);
    run_request_loop(&server, Arc::new(state))
}

fn run_request_loop(server: &Server, state: Arc<ServeState>) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_WORKERS)
        .build()
        .context("failed to create request pool")?;

    for request in server.incoming_requests() {
        let state = Arc::clone(&state);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &state) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, state: &ServeState) -> Result<()> {
    if !matches!(request.method(), Method::Get | Method::Head) {
        return response::respond_method_not_allowed(request);
    }

    debug!("serve"; "{} {}", request.method(), request.url());
    match path::resolve(request.url(), &state.root, &state.entry) {
        Target::Entry => response::respond_rendered(request, render::render_entry(state)),
        Target::File(file) => response::respond_file(request, &file, state),
        Target::Forbidden => response::respond_bad_request(request),
        Target::NotFound => response::respond_not_found(request),
    }
}
