//! Wire protocol types.
//!
//! The stream server speaks a minimal message-oriented protocol over a
//! persistent WebSocket. There is no handshake beyond the transport's
//! own, and no versioning.
//!
//! Inbound, a message is one of:
//! - a **binary** payload: one compressed still image (a frame);
//! - a **text** payload: a JSON control message tagged by `type`:
//!
//! ```text
//! {"type": "config",  "data": <any>}
//! {"type": "latency", "latency": <number>}
//! {"type": "pong"}
//! ```
//!
//! Unknown `type` values are ignored, not fatal.
//!
//! Outbound, the client writes text only:
//!
//! ```text
//! {"region": {"left": n, "top": n, "width": n, "height": n}}
//! {"type": "ping"}
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SrsError;

/// Server port used when none is configured.
pub const DEFAULT_PORT: u16 = 8765;

/// Server host used when none is configured.
pub const DEFAULT_HOST: &str = "localhost";

// ── StreamEndpoint ───────────────────────────────────────────────

/// Where the stream server lives.
///
/// Resolved once at session start and never mutated; a new value only
/// takes effect on the next explicit connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    host: String,
    port: u16,
}

impl StreamEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The default endpoint: `localhost:8765`.
    pub fn localhost() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }

    /// Parse `host` or `host:port` forms.
    pub fn parse(s: &str) -> Result<Self, SrsError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SrsError::InvalidEndpoint("empty address".into()));
        }
        match s.rsplit_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(SrsError::InvalidEndpoint(format!("missing host in {s:?}")));
                }
                let port = port
                    .parse::<u16>()
                    .map_err(|_| SrsError::InvalidEndpoint(format!("bad port in {s:?}")))?;
                Ok(Self::new(host, port))
            }
            None => Ok(Self::new(s, DEFAULT_PORT)),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The WebSocket URL for this endpoint.
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for StreamEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ── InboundUnit ──────────────────────────────────────────────────

/// One unit delivered by the transport.
///
/// Transient: constructed per received message, consumed synchronously
/// by the dispatcher, never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundUnit {
    /// An opaque compressed image frame.
    Frame(Bytes),
    /// A UTF-8 control payload, parsed later by the dispatcher.
    Control(String),
}

// ── ControlMessage ───────────────────────────────────────────────

/// A parsed textual control message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Server configuration echo. Informational.
    Config {
        #[serde(default)]
        data: Value,
    },
    /// A server-measured latency sample, in milliseconds.
    Latency { latency: f64 },
    /// Reply to an outbound ping probe.
    Pong,
}

impl ControlMessage {
    /// The `type` tags this client understands.
    const KNOWN_KINDS: [&'static str; 3] = ["config", "latency", "pong"];

    /// Parse a control payload.
    ///
    /// `Ok(None)` means well-formed JSON carrying an unrecognised
    /// `type`, which the wire contract says to ignore. `Err` means the
    /// payload is malformed and should be dropped with a diagnostic.
    pub fn parse(text: &str) -> Result<Option<Self>, SrsError> {
        let value: Value = serde_json::from_str(text)?;
        match serde_json::from_value::<Self>(value.clone()) {
            Ok(msg) => Ok(Some(msg)),
            Err(e) => match value.get("type").and_then(Value::as_str) {
                Some(kind) if !Self::KNOWN_KINDS.contains(&kind) => Ok(None),
                _ => Err(e.into()),
            },
        }
    }
}

// ── RegionConfig ─────────────────────────────────────────────────

/// An axis-aligned capture region in source coordinates.
///
/// The only entity the client sends upstream; it outlives a
/// calibration session only long enough to be serialised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

// ── OutboundMessage ──────────────────────────────────────────────

/// Messages the client writes to the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// A completed calibration result, sent in a `{"region": ...}`
    /// envelope.
    Region(RegionConfig),
    /// Latency probe, answered by the server with `{"type": "pong"}`.
    Ping,
}

impl OutboundMessage {
    /// Serialise to the UTF-8 JSON wire form.
    pub fn to_text(&self) -> Result<String, SrsError> {
        let value = match self {
            Self::Region(region) => serde_json::json!({ "region": region }),
            Self::Ping => serde_json::json!({ "type": "ping" }),
        };
        serde_json::to_string(&value).map_err(|e| SrsError::Encoding(e.to_string()))
    }
}

// ── Tests ────────────────────────────────────────────────────────
