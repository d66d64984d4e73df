//! # srs-core
//!
//! Core library for the SRS screen-region stream viewer.
//!
//! This crate contains:
//! - **Connection**: `ConnectionManager` and `ConnectionState` — socket
//!   ownership, fixed-delay reconnection, cancellable retry
//! - **Protocol**: wire types for binary frames and JSON control
//!   messages, plus the outbound region envelope
//! - **Dispatch**: binary/text unit classification and routing
//! - **Render**: frame decoding, presentation, and FPS accounting
//!   behind a `RenderSurface` seam
//! - **Calibration**: four-corner region capture with the
//!   display-to-native coordinate transform
//! - **Error**: `SrsError` — typed, `thiserror`-based error hierarchy

pub mod calibration;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod render;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use calibration::{
    CalibrationEngine, ClickOutcome, ClickPoint, MarkerColor, REQUIRED_POINTS, SurfaceGeometry,
};
pub use connection::manager::{ConnectionManager, DEFAULT_RETRY_DELAY};
pub use connection::state::ConnectionState;
pub use connection::transport::{Transport, TransportLink, WebSocketTransport};
pub use dispatch::{DispatchEvent, dispatch};
pub use error::SrsError;
pub use protocol::{
    ControlMessage, DEFAULT_HOST, DEFAULT_PORT, InboundUnit, OutboundMessage, RegionConfig,
    StreamEndpoint,
};
pub use render::decoder::DecodedFrame;
pub use render::fps::FpsCounter;
pub use render::{FrameRenderer, RenderSurface};
