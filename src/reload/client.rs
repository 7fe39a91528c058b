//! Detector client.
//!
//! Connects to the relay like any browser page would, polls the project
//! [`Listener`] on a fixed tick and asks the relay to broadcast a reload when
//! the fingerprint moves. A second tick keeps the connection alive.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use crossbeam::channel::{select, tick};
use tungstenite::protocol::Message;
use tungstenite::{Error as WsError, WebSocket};

use super::message::Request;
use crate::logger::status_success;
use crate::watch::Listener;

/// Pause between failed connection attempts.
const RETRY_DELAY: Duration = Duration::from_millis(500);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Relay-side detector: one thread, one select loop.
pub struct DetectorClient {
    listener: Listener,
    relay: SocketAddr,
    poll_interval: Duration,
    heartbeat: Duration,
}

impl DetectorClient {
    pub fn new(listener: Listener, relay: SocketAddr, poll_interval: Duration, heartbeat: Duration) -> Self {
        Self {
            listener,
            relay,
            poll_interval,
            heartbeat,
        }
    }

    pub fn spawn(self) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("detector".into())
            .spawn(move || self.run())
            .context("failed to spawn detector thread")
    }

    /// Connect, run a session, and reconnect whenever it ends.
    fn run(mut self) {
        loop {
            let ws = self.connect_with_retry();
            crate::debug!("detector"; "connected to ws://{}", self.relay);
            if let Err(e) = self.session(ws) {
                crate::log!("detector"; "relay connection lost: {}", e);
            }
            thread::sleep(RETRY_DELAY);
        }
    }

    fn connect_with_retry(&self) -> WebSocket<TcpStream> {
        let mut attempts = 0u32;
        loop {
            match connect(self.relay) {
                Ok(ws) => return ws,
                Err(e) => {
                    attempts += 1;
                    if attempts == 1 {
                        crate::log!("detector"; "waiting for relay: {}", e);
                    }
                    thread::sleep(RETRY_DELAY);
                }
            }
        }
    }

    /// Returns when the relay connection fails.
    fn session(&mut self, mut ws: WebSocket<TcpStream>) -> Result<()> {
        let poll = tick(self.poll_interval);
        let heartbeat = tick(self.heartbeat);

        loop {
            select! {
                recv(poll) -> _ => {
                    drain(&mut ws)?;
                    if self.listener.poll() {
                        send(&mut ws, &Request::reload_broadcast())?;
                        status_success("reload");
                    }
                }
                recv(heartbeat) -> _ => send(&mut ws, &Request::heartbeat())?,
            }
        }
    }
}

fn connect(addr: SocketAddr) -> Result<WebSocket<TcpStream>> {
    let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
    let (ws, _) = tungstenite::client(format!("ws://{addr}/"), stream)
        .map_err(|e| anyhow!("handshake failed: {e}"))?;
    ws.get_ref().set_nonblocking(true)?;
    Ok(ws)
}

fn send(ws: &mut WebSocket<TcpStream>, request: &Request) -> Result<()> {
    match ws.send(Message::Text(request.to_json().into())) {
        Ok(()) => Ok(()),
        Err(WsError::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Discard relay responses so the socket buffer never fills.
fn drain(ws: &mut WebSocket<TcpStream>) -> Result<()> {
    loop {
        match ws.read() {
            Ok(Message::Close(_)) => return Err(anyhow!("relay closed the connection")),
            Ok(_) => {}
            Err(WsError::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
}
