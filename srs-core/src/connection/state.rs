//! Connection lifecycle state machine.
//!
//! Provides a `ConnectionState` enum with validated transitions that
//! return `Result` instead of panicking. The connection manager is the
//! sole writer; everyone else observes through a watch channel.
//!
//! ```text
//!  Disconnected ──► Connecting ──► Connected
//!       ▲               │              │
//!       │   (failure)   │    (drop)    │
//!       └───────────────┴──────────────┘
//!
//!  any state ──► Closed            (operator disconnect)
//!  Closed ──► Connecting           (explicit connect)
//! ```

use std::time::Instant;

use crate::error::SrsError;

// ── ConnectionState ──────────────────────────────────────────────

/// The current phase of the stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No active connection; a reconnect may be pending. Initial state.
    #[default]
    Disconnected,

    /// Transport connect in flight.
    Connecting,

    /// Link is up; frames and control messages flow.
    Connected {
        /// When the session entered the `Connected` state.
        since: Instant,
    },

    /// Closed by the operator. No reconnect fires until an explicit
    /// connect.
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected { .. } => write!(f, "connected"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

impl ConnectionState {
    /// Returns `true` when the link is established and traffic flows.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Returns `true` while a transport connect is in flight.
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting)
    }

    /// Returns `true` when idle and eligible for an automatic retry.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Returns `true` after the operator closed the session.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// How long the session has been in the `Connected` state.
    ///
    /// Returns `None` for any other phase.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Disconnected`, `Closed`.
    pub fn begin_connect(&mut self) -> Result<(), SrsError> {
        match self {
            Self::Disconnected | Self::Closed => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(SrsError::IllegalTransition(
                "cannot connect: not in Disconnected or Closed state",
            )),
        }
    }

    /// Transition to `Connected`.
    ///
    /// Valid from: `Connecting`.
    pub fn complete_connect(&mut self) -> Result<(), SrsError> {
        match self {
            Self::Connecting => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(SrsError::IllegalTransition(
                "cannot complete connect: not in Connecting state",
            )),
        }
    }

    /// Transition to `Disconnected`.
    ///
    /// Valid from: `Connecting` (connect failed), `Connected` (link
    /// dropped or transport error).
    pub fn connection_lost(&mut self) -> Result<(), SrsError> {
        match self {
            Self::Connecting | Self::Connected { .. } => {
                *self = Self::Disconnected;
                Ok(())
            }
            _ => Err(SrsError::IllegalTransition(
                "cannot lose connection: not in Connecting or Connected state",
            )),
        }
    }

    /// Transition to `Closed`. Valid from any state.
    pub fn close(&mut self) {
        *self = Self::Closed;
    }
}

// ── Tests ────────────────────────────────────────────────────────
