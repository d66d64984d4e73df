//! Inbound unit classification and routing.
//!
//! Pure: one unit in, at most one event out, no state. Binary
//! payloads are frames and pass through verbatim; text payloads are
//! parsed as control messages. Units come out in whatever order the
//! transport delivered them; there is no buffering or reordering
//! here.

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, warn};

use crate::protocol::{ControlMessage, InboundUnit};

// ── DispatchEvent ────────────────────────────────────────────────

/// What one inbound unit turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// A compressed frame for the renderer.
    Frame(Bytes),
    /// Server configuration echo. Informational.
    Config(Value),
    /// Server-measured latency, in milliseconds.
    Latency(f64),
    /// Reply to a ping probe.
    Pong,
}

/// Classify one inbound unit.
///
/// Returns `None` for dropped units: malformed control payloads
/// (logged with a diagnostic) and unrecognised control kinds (ignored
/// per the wire contract). Neither changes any session state.
pub fn dispatch(unit: InboundUnit) -> Option<DispatchEvent> {
    match unit {
        InboundUnit::Frame(bytes) => Some(DispatchEvent::Frame(bytes)),
        InboundUnit::Control(text) => match ControlMessage::parse(&text) {
            Ok(Some(ControlMessage::Config { data })) => Some(DispatchEvent::Config(data)),
            Ok(Some(ControlMessage::Latency { latency })) => Some(DispatchEvent::Latency(latency)),
            Ok(Some(ControlMessage::Pong)) => Some(DispatchEvent::Pong),
            Ok(None) => {
                debug!("ignoring unrecognised control kind: {text}");
                None
            }
            Err(e) => {
                warn!("dropping malformed control message: {e}");
                None
            }
        },
    }
}

// ── Tests ────────────────────────────────────────────────────────
