//! Domain-specific error types for the SRS viewer.
//!
//! All fallible operations return `Result<T, SrsError>`.
//! No panics on malformed input: every error is typed and recoverable,
//! and none of them is fatal to the session.

use thiserror::Error;

/// The canonical error type for the SRS viewer.
#[derive(Debug, Error)]
pub enum SrsError {
    // ── Transport Errors ─────────────────────────────────────────
    /// The WebSocket layer failed to connect or dropped mid-stream.
    #[error("transport error: {0}")]
    Transport(String),

    /// The underlying I/O layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// A server address string could not be interpreted.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A lifecycle operation was requested from the wrong state.
    #[error("illegal transition: {0}")]
    IllegalTransition(&'static str),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    // ── Frame Errors ─────────────────────────────────────────────
    /// A binary payload could not be decoded as an image. The frame
    /// is dropped; the next one supersedes it.
    #[error("frame decode failed: {0}")]
    Decode(String),

    // ── Control Errors ───────────────────────────────────────────
    /// A textual control message was not valid JSON, or a recognised
    /// message kind carried a malformed payload.
    #[error("control parse failed: {0}")]
    ControlParse(#[from] serde_json::Error),

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding an outbound payload failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for SrsError {
    fn from(s: String) -> Self {
        SrsError::Other(s)
    }
}

impl From<&str> for SrsError {
    fn from(s: &str) -> Self {
        SrsError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for SrsError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        SrsError::ChannelClosed
    }
}
