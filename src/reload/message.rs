//! Live Reload Message Protocol
//!
//! JSON text frames exchanged between the relay, its detector client and
//! browser pages.
//!
//! # Wire Shape
//!
//! ```text
//! request   {"code":1,"type":"direct"|"info","msg":"...","kind":"broadcast"?}
//! response  {"code":1,"type":"direct"|"info","msg":"..."}
//! error     {"code":-1,"type":"error","msg":"..."}
//! ```
//!
//! Every valid `(type, msg)` pair maps to a response string computed once
//! when the [`Dispatcher`] is built.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Relay-assigned connection identity.
pub type ConnId = u64;

pub const CODE_OK: i32 = 1;
pub const CODE_ERROR: i32 = -1;

/// Value of `kind` that asks the relay to fan a message out.
pub const BROADCAST: &str = "broadcast";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Direct,
    Info,
}

impl MessageType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Info => "info",
        }
    }
}

/// Everything the relay knows how to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Reload,
    Heartbeat,
}

impl Capability {
    pub const ALL: [Self; 2] = [Self::Reload, Self::Heartbeat];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Reload => "reload",
            Self::Heartbeat => "heartbeat",
        }
    }

    pub const fn message_type(self) -> MessageType {
        match self {
            Self::Reload => MessageType::Direct,
            Self::Heartbeat => MessageType::Info,
        }
    }
}

/// Inbound frame. `type` stays a string so unknown families can be named
/// in the error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub code: i32,
    #[serde(rename = "type")]
    pub ty: String,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Request {
    /// The detector's `direct/reload` broadcast.
    pub fn reload_broadcast() -> Self {
        Self::new(MessageType::Direct, Capability::Reload.name()).broadcast()
    }

    pub fn heartbeat() -> Self {
        Self::new(MessageType::Info, Capability::Heartbeat.name())
    }

    pub fn new(ty: MessageType, msg: &str) -> Self {
        Self {
            code: CODE_OK,
            ty: ty.as_str().to_string(),
            msg: msg.to_string(),
            kind: None,
        }
    }

    pub fn broadcast(mut self) -> Self {
        self.kind = Some(BROADCAST.to_string());
        self
    }

    pub fn is_broadcast(&self) -> bool {
        self.kind.as_deref() == Some(BROADCAST)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Outbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub code: i32,
    #[serde(rename = "type")]
    pub ty: String,
    pub msg: String,
}

impl Response {
    pub fn ok(ty: MessageType, msg: &str) -> Self {
        Self {
            code: CODE_OK,
            ty: ty.as_str().to_string(),
            msg: msg.to_string(),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            code: CODE_ERROR,
            ty: "error".to_string(),
            msg: msg.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Result of dispatching one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Serialized response.
    pub response: String,
    /// Send to every connection instead of only the sender.
    pub broadcast: bool,
}

/// Keep-alive traffic is never logged.
pub fn is_routine(msg: &str) -> bool {
    msg == Capability::Heartbeat.name()
}

/// Maps inbound frames to precomputed responses.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    direct: FxHashMap<&'static str, String>,
    info: FxHashMap<&'static str, String>,
    verbose: bool,
}

impl Dispatcher {
    pub fn new(verbose: bool) -> Self {
        let mut direct = FxHashMap::default();
        let mut info = FxHashMap::default();
        for cap in Capability::ALL {
            let response = Response::ok(cap.message_type(), cap.name()).to_json();
            match cap.message_type() {
                MessageType::Direct => direct.insert(cap.name(), response),
                MessageType::Info => info.insert(cap.name(), response),
            };
        }
        Self {
            direct,
            info,
            verbose,
        }
    }

    /// Answer one raw frame from connection `cid`.
    ///
    /// Never fails: malformed input becomes an error-coded response for the
    /// sender alone.
    pub fn dispatch(&self, raw: &str, cid: ConnId) -> Dispatch {
        let (out, lines) = self.answer(raw, cid);
        for line in lines {
            crate::log!("relay"; "{}", line);
        }
        out
    }

    /// The response plus the log lines it warrants.
    ///
    /// Errors are always reported, traffic only when verbose, and heartbeats
    /// never.
    fn answer(&self, raw: &str, cid: ConnId) -> (Dispatch, Vec<String>) {
        let request = match parse(raw) {
            Ok(request) => request,
            Err(reason) => {
                let out = Dispatch {
                    response: Response::error(reason).to_json(),
                    broadcast: false,
                };
                return (out, vec![format!("[{cid}] {reason}")]);
            }
        };

        let routine = is_routine(&request.msg);
        let mut lines = Vec::new();
        if self.verbose && !routine {
            lines.push(format!("receive[{cid}]> {}", raw.trim()));
        }

        let out = match self.lookup(&request) {
            Ok(response) => Dispatch {
                response: response.to_string(),
                broadcast: request.is_broadcast(),
            },
            Err(reason) => {
                if !routine {
                    lines.push(format!("[{cid}] {reason}"));
                }
                Dispatch {
                    response: Response::error(reason).to_json(),
                    broadcast: false,
                }
            }
        };

        if self.verbose && !routine {
            lines.push(format!("response[{cid}]> {}", out.response));
        }
        (out, lines)
    }

    fn lookup(&self, request: &Request) -> Result<&str, String> {
        let msg = request.msg.as_str();
        match request.ty.as_str() {
            "direct" => self
                .direct
                .get(msg)
                .map(String::as_str)
                .ok_or_else(|| format!("Invalid direct method {msg}")),
            "info" => self
                .info
                .get(msg)
                .map(String::as_str)
                .ok_or_else(|| format!("Invalid message method {msg}")),
            other => Err(format!("Invalid {other} method {msg}")),
        }
    }
}

fn parse(raw: &str) -> Result<Request, &'static str> {
    if raw.trim().is_empty() {
        return Err("Invalid request message: Cannot be empty.");
    }
    serde_json::from_str(raw).map_err(|_| "Invalid request JSON format.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_echo() {
        let dispatcher = Dispatcher::new(true);
        let out = dispatcher.dispatch(r#"{"code":1,"type":"info","msg":"heartbeat"}"#, 7);
        assert_eq!(out.response, r#"{"code":1,"type":"info","msg":"heartbeat"}"#);
        assert!(!out.broadcast);
        assert!(is_routine("heartbeat"));
        assert!(!is_routine("reload"));
    }

    #[test]
    fn test_every_capability_answers_precomputed() {
        let dispatcher = Dispatcher::new(false);
        for cap in Capability::ALL {
            let request = Request::new(cap.message_type(), cap.name());
            let out = dispatcher.dispatch(&request.to_json(), 1);
            assert_eq!(
                out.response,
                format!(
                    r#"{{"code":1,"type":"{}","msg":"{}"}}"#,
                    cap.message_type().as_str(),
                    cap.name()
                )
            );
        }
    }

    #[test]
    fn test_reload_broadcast() {
        let dispatcher = Dispatcher::new(false);
        let raw = Request::reload_broadcast().to_json();
        assert_eq!(raw, r#"{"code":1,"type":"direct","msg":"reload","kind":"broadcast"}"#);

        let out = dispatcher.dispatch(&raw, 1);
        assert!(out.broadcast);
        assert_eq!(out.response, r#"{"code":1,"type":"direct","msg":"reload"}"#);
    }

    #[test]
    fn test_unknown_methods() {
        let dispatcher = Dispatcher::new(false);
        let cases = [
            (r#"{"code":1,"type":"direct","msg":"explode"}"#, "Invalid direct method explode"),
            (r#"{"code":1,"type":"info","msg":"reload"}"#, "Invalid message method reload"),
            (r#"{"code":1,"type":"status","msg":"x"}"#, "Invalid status method x"),
        ];
        for (raw, expected) in cases {
            let out = dispatcher.dispatch(raw, 1);
            let response: Response = serde_json::from_str(&out.response).unwrap();
            assert_eq!(response, Response::error(expected));
        }
    }

    #[test]
    fn test_malformed_requests() {
        let dispatcher = Dispatcher::new(false);

        let empty = dispatcher.dispatch("  ", 1);
        assert_eq!(
            empty.response,
            r#"{"code":-1,"type":"error","msg":"Invalid request message: Cannot be empty."}"#
        );

        for raw in ["not json", r#"{"type":"info","msg":"heartbeat"}"#, r#"{"code":1,"type":"info"}"#] {
            let out = dispatcher.dispatch(raw, 1);
            assert_eq!(
                out.response,
                r#"{"code":-1,"type":"error","msg":"Invalid request JSON format."}"#
            );
        }
    }

    #[test]
    fn test_error_never_broadcasts() {
        let dispatcher = Dispatcher::new(false);
        let out = dispatcher.dispatch(r#"{"code":1,"type":"direct","msg":"nope","kind":"broadcast"}"#, 1);
        assert!(!out.broadcast);
    }

    #[test]
    fn test_verbose_logging_skips_heartbeat() {
        let dispatcher = Dispatcher::new(true);

        let (_, lines) = dispatcher.answer(&Request::heartbeat().to_json(), 3);
        assert!(lines.is_empty());

        let raw = Request::reload_broadcast().to_json();
        let (_, lines) = dispatcher.answer(&raw, 3);
        assert_eq!(
            lines,
            [
                format!("receive[3]> {raw}"),
                r#"response[3]> {"code":1,"type":"direct","msg":"reload"}"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_quiet_dispatcher_still_reports_errors() {
        let dispatcher = Dispatcher::new(false);

        let (_, lines) = dispatcher.answer(&Request::reload_broadcast().to_json(), 1);
        assert!(lines.is_empty());

        let (_, lines) = dispatcher.answer("", 1);
        assert_eq!(lines, ["[1] Invalid request message: Cannot be empty."]);

        let (_, lines) = dispatcher.answer(r#"{"code":1,"type":"direct","msg":"nope"}"#, 1);
        assert_eq!(lines, ["[1] Invalid direct method nope"]);
    }
}
