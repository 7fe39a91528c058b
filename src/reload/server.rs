//! WebSocket relay server.
//!
//! An acceptor thread upgrades each connection off the actor, then hands the
//! finished `WebSocket` to the [`Relay`] over a channel; the actor owns every
//! socket from then on.

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::sync::mpsc;
use tungstenite::WebSocket;

use super::relay::Relay;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Acceptor back-off when no connection is pending.
const ACCEPT_IDLE: Duration = Duration::from_millis(100);

/// Longest a client may take to send its upgrade request.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Bind `interface:base_port`, moving up one port at a time if it is taken.
pub fn bind_relay(interface: IpAddr, base_port: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                if offset > 0 {
                    crate::log!("relay"; "port {} in use, using {} instead", base_port, actual_port);
                }
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "failed to bind relay after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Accept connections and hand each finished handshake to the actor.
///
/// Handshakes run on their own short-lived threads with a read timeout, so
/// a client that connects and stays silent holds up nobody else.
pub fn spawn_acceptor(listener: TcpListener, tx: mpsc::Sender<WebSocket<TcpStream>>) -> Result<()> {
    listener.set_nonblocking(true)?;

    thread::Builder::new()
        .name("relay-accept".into())
        .spawn(move || {
            while !tx.is_closed() {
                match listener.accept() {
                    Ok((stream, addr)) => {
                        crate::debug!("relay"; "connection from {}", addr);
                        let tx = tx.clone();
                        let spawned = thread::Builder::new()
                            .name("relay-handshake".into())
                            .spawn(move || {
                                if let Some(ws) = handshake(stream, addr)
                                    && tx.blocking_send(ws).is_err()
                                {
                                    crate::debug!("relay"; "actor gone, dropping {}", addr);
                                }
                            });
                        if let Err(e) = spawned {
                            crate::log!("relay"; "cannot spawn handshake for {}: {}", addr, e);
                        }
                    }
                    Err(ref e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_IDLE),
                    Err(e) => {
                        crate::log!("relay"; "accept error: {}", e);
                        thread::sleep(ACCEPT_IDLE);
                    }
                }
            }
            crate::debug!("relay"; "actor gone, acceptor exiting");
        })
        .context("failed to spawn relay acceptor")?;
    Ok(())
}

/// Blocking WebSocket upgrade bounded by [`HANDSHAKE_TIMEOUT`].
///
/// The returned socket is non-blocking with no timeouts, ready for the actor.
fn handshake(stream: TcpStream, addr: SocketAddr) -> Option<WebSocket<TcpStream>> {
    let prepared = stream
        .set_nonblocking(false)
        .and_then(|()| stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)))
        .and_then(|()| stream.set_write_timeout(Some(HANDSHAKE_TIMEOUT)));
    if let Err(e) = prepared {
        crate::log!("relay"; "[{}] socket setup failed: {}", addr, e);
        return None;
    }

    let ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            crate::log!("relay"; "[{}] handshake failed: {}", addr, e);
            return None;
        }
    };

    let stream = ws.get_ref();
    let ready = stream
        .set_read_timeout(None)
        .and_then(|()| stream.set_write_timeout(None))
        .and_then(|()| stream.set_nonblocking(true));
    match ready {
        Ok(()) => Some(ws),
        Err(e) => {
            crate::log!("relay"; "[{}] socket setup failed: {}", addr, e);
            None
        }
    }
}

/// Bind the relay and run its actor on a dedicated runtime thread.
///
/// Returns the bound port, which may be above `base_port`.
pub fn start_relay(interface: IpAddr, base_port: u16, verbose: bool) -> Result<u16> {
    let (listener, port) = bind_relay(interface, base_port)?;
    let (tx, rx) = mpsc::channel(32);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create relay runtime")?;

    thread::Builder::new()
        .name("relay".into())
        .spawn(move || runtime.block_on(Relay::new(rx, verbose).run()))
        .context("failed to spawn relay thread")?;

    spawn_acceptor(listener, tx)?;
    crate::debug!("relay"; "ws://{}:{}", interface, port);
    Ok(port)
}
