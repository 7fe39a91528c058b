//! Relay actor.
//!
//! The only owner of the connection map: sockets are added, polled, written
//! and dropped from this one task, so the map needs no lock.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tungstenite::protocol::Message;
use tungstenite::{Error as WsError, WebSocket};

use super::message::{ConnId, Dispatcher};

/// How often idle sockets are polled for inbound frames.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct Relay {
    rx: mpsc::Receiver<WebSocket<TcpStream>>,
    conns: FxHashMap<ConnId, WebSocket<TcpStream>>,
    next_id: ConnId,
    dispatcher: Dispatcher,
}

impl Relay {
    pub fn new(rx: mpsc::Receiver<WebSocket<TcpStream>>, verbose: bool) -> Self {
        Self {
            rx,
            conns: FxHashMap::default(),
            next_id: 0,
            dispatcher: Dispatcher::new(verbose),
        }
    }

    /// Run until the acceptor side of the channel is dropped.
    pub async fn run(mut self) {
        let mut tick = tokio::time::interval(POLL_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                ws = self.rx.recv() => match ws {
                    Some(ws) => self.add(ws),
                    None => break,
                },
                _ = tick.tick() => self.poll(),
            }
        }
        crate::debug!("relay"; "stopped with {} connections", self.conns.len());
    }

    /// Take ownership of an upgraded, non-blocking socket.
    fn add(&mut self, ws: WebSocket<TcpStream>) {
        self.next_id += 1;
        self.conns.insert(self.next_id, ws);
        crate::debug!("relay"; "[{}] open (total: {})", self.next_id, self.conns.len());
    }

    /// Drain every socket, then answer what was read.
    fn poll(&mut self) {
        let mut frames = Vec::new();
        let mut closed = Vec::new();

        for (&cid, ws) in &mut self.conns {
            loop {
                match ws.read() {
                    Ok(Message::Text(text)) => frames.push((cid, text.to_string())),
                    Ok(Message::Close(_)) => {
                        closed.push(cid);
                        break;
                    }
                    Ok(_) => {}
                    Err(WsError::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(e) => {
                        if !matches!(e, WsError::ConnectionClosed | WsError::AlreadyClosed) {
                            crate::debug!("relay"; "[{}] read error: {}", cid, e);
                        }
                        closed.push(cid);
                        break;
                    }
                }
            }
        }
        self.drop_all(&closed);

        for (cid, raw) in frames {
            let out = self.dispatcher.dispatch(&raw, cid);
            if out.broadcast {
                self.broadcast(&out.response);
            } else {
                self.reply(cid, &out.response);
            }
        }
    }

    fn reply(&mut self, cid: ConnId, text: &str) {
        let Some(ws) = self.conns.get_mut(&cid) else { return };
        if !send(ws, text) {
            self.drop_all(&[cid]);
        }
    }

    fn broadcast(&mut self, text: &str) {
        let total = self.conns.len();
        self.conns.retain(|cid, ws| {
            let alive = send(ws, text);
            if !alive {
                crate::debug!("relay"; "[{}] dropped during broadcast", cid);
            }
            alive
        });
        crate::debug!("relay"; "broadcast to {}/{} connections", self.conns.len(), total);
    }

    fn drop_all(&mut self, ids: &[ConnId]) {
        for cid in ids {
            if self.conns.remove(cid).is_some() {
                crate::debug!("relay"; "[{}] closed (total: {})", cid, self.conns.len());
            }
        }
    }
}

/// Queue and flush one text frame. A full socket buffer keeps the frame
/// queued and still counts as alive.
fn send(ws: &mut WebSocket<TcpStream>, text: &str) -> bool {
    match ws.send(Message::Text(text.into())) {
        Ok(()) => true,
        Err(WsError::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => true,
        Err(_) => false,
    }
}
