//! Live Reload Module
//!
//! # Architecture
//!
//! ```text
//! Listener -> DetectorClient --[direct/reload, kind=broadcast]--> Relay -> Browser pages
//!  (poll)       (select loop)                                   (actor)
//! ```
//!
//! # Modules
//!
//! - `message` - Wire types and the lookup-table dispatcher
//! - `server` - Port binding and the connection acceptor
//! - `relay` - Actor owning every socket
//! - `client` - Detector client bridging change detection into the relay

pub mod client;
pub mod message;
mod relay;
pub mod server;

pub use client::DetectorClient;
pub use server::start_relay;
