//! Connection ownership and resilience.
//!
//! The [`ConnectionManager`] is the sole owner of the socket handle
//! and the sole writer of [`ConnectionState`]. Recovery policy: every
//! connect failure or link drop schedules exactly one reconnection
//! attempt after a fixed delay; the operator closing the session
//! cancels it. Attempts are unbounded and the delay is constant, with
//! no jitter.
//!
//! Outbound sends are gated on the state *at send time*: anything
//! handed in while not connected is dropped, never queued.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::state::ConnectionState;
use crate::connection::transport::{Transport, TransportLink};
use crate::error::SrsError;
use crate::protocol::{InboundUnit, OutboundMessage, StreamEndpoint};

/// Delay between a failure or drop and the next reconnection attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(3000);

/// Capacity of the unit channel feeding the dispatcher.
const INBOUND_CAPACITY: usize = 256;

// ── ConnectionManager ────────────────────────────────────────────

/// Owns the socket lifecycle for one viewer session.
pub struct ConnectionManager {
    /// Back-reference handed to spawned tasks; they upgrade on wake
    /// so a dropped manager silently ends its timers.
    weak: Weak<Self>,
    transport: Arc<dyn Transport>,
    endpoint: StreamEndpoint,
    retry_delay: Duration,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<ConnectionState>,
    inbound_tx: mpsc::Sender<InboundUnit>,
}

struct Inner {
    state: ConnectionState,
    /// Writer half of the active link, if any. Dropping it closes the
    /// link from our side.
    outbound: Option<mpsc::Sender<String>>,
    /// Cancellation handle for the pending reconnect, if any.
    retry: Option<CancellationToken>,
    /// Increments per established link; a stale link's close
    /// notification must not tear down a newer connection.
    generation: u64,
}

impl ConnectionManager {
    /// Create a manager with the default retry delay.
    ///
    /// Returns the manager plus the unit stream for the dispatcher
    /// and a state watch for status displays.
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: StreamEndpoint,
    ) -> (
        Arc<Self>,
        mpsc::Receiver<InboundUnit>,
        watch::Receiver<ConnectionState>,
    ) {
        Self::with_retry_delay(transport, endpoint, DEFAULT_RETRY_DELAY)
    }

    /// Create a manager with an explicit retry delay.
    pub fn with_retry_delay(
        transport: Arc<dyn Transport>,
        endpoint: StreamEndpoint,
        retry_delay: Duration,
    ) -> (
        Arc<Self>,
        mpsc::Receiver<InboundUnit>,
        watch::Receiver<ConnectionState>,
    ) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let manager = Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            transport,
            endpoint,
            retry_delay,
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                outbound: None,
                retry: None,
                generation: 0,
            }),
            state_tx,
            inbound_tx,
        });
        (manager, inbound_rx, state_rx)
    }

    /// Current state snapshot.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// A fresh observer handle for the connection state.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn endpoint(&self) -> &StreamEndpoint {
        &self.endpoint
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Open the connection. Legal from `Disconnected` and `Closed`.
    ///
    /// A failed attempt is logged, moves the session to
    /// `Disconnected`, and arms a single retry; it is not surfaced as
    /// a hard error. Calling while already connecting or connected is
    /// an [`SrsError::IllegalTransition`].
    pub async fn connect(&self) -> Result<(), SrsError> {
        {
            let mut inner = self.lock();
            inner.state.begin_connect()?;
            self.publish(&inner);
        }
        info!("connecting to {}", self.endpoint.url());

        match self.transport.connect(&self.endpoint).await {
            Ok(link) => {
                self.install_link(link);
                Ok(())
            }
            Err(e) => {
                warn!("connect to {} failed: {e}", self.endpoint);
                let mut inner = self.lock();
                // The operator may have closed the session while the
                // attempt was in flight; only a live attempt retries.
                if inner.state.is_connecting() {
                    let _ = inner.state.connection_lost();
                    self.publish(&inner);
                    self.schedule_retry(&mut inner);
                }
                Ok(())
            }
        }
    }

    fn install_link(&self, link: TransportLink) {
        let TransportLink { outbound, inbound } = link;
        let mut inner = self.lock();
        if !inner.state.is_connecting() {
            // Closed while the connect was in flight. Dropping the
            // link halves shuts the socket down again.
            debug!("discarding link established while {}", inner.state);
            return;
        }
        if inner.state.complete_connect().is_err() {
            return;
        }
        inner.generation += 1;
        let generation = inner.generation;
        inner.outbound = Some(outbound);
        self.publish(&inner);
        drop(inner);

        info!("connected to {}", self.endpoint);
        if let Some(manager) = self.weak.upgrade() {
            tokio::spawn(Self::pump(manager, inbound, generation));
        }
    }

    /// Forward units from one link into the dispatcher stream, then
    /// report the link's death.
    async fn pump(manager: Arc<Self>, mut inbound: mpsc::Receiver<InboundUnit>, generation: u64) {
        while let Some(unit) = inbound.recv().await {
            if manager.inbound_tx.send(unit).await.is_err() {
                // Dispatcher gone; the session is ending.
                break;
            }
        }
        manager.handle_link_down(generation);
    }

    fn handle_link_down(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation {
            // A newer link superseded this one.
            return;
        }
        if inner.state.is_connected() {
            warn!("connection to {} lost", self.endpoint);
            inner.outbound = None;
            let _ = inner.state.connection_lost();
            self.publish(&inner);
            self.schedule_retry(&mut inner);
        }
        // Closed: the operator tore the link down on purpose.
    }

    /// Arm the single reconnection attempt. Any previously armed
    /// timer is replaced.
    fn schedule_retry(&self, inner: &mut Inner) {
        if let Some(previous) = inner.retry.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        inner.retry = Some(token.clone());

        let weak = self.weak.clone();
        let delay = self.retry_delay;
        debug!("reconnect in {delay:?}");
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let Some(manager) = weak.upgrade() else { return };
                    // The state may have moved on while the timer ran;
                    // only a still-disconnected session retries.
                    if manager.state().is_disconnected() {
                        if let Err(e) = manager.connect().await {
                            debug!("scheduled reconnect skipped: {e}");
                        }
                    }
                }
            }
        });
    }

    /// Close the session. Legal from any state.
    ///
    /// Cancels any pending reconnect and closes the link; nothing
    /// fires again until `connect` is called.
    pub fn disconnect(&self) {
        let mut inner = self.lock();
        if let Some(retry) = inner.retry.take() {
            retry.cancel();
        }
        // Dropping the sender closes the link from our side.
        inner.outbound = None;
        if !inner.state.is_closed() {
            inner.state.close();
            self.publish(&inner);
            info!("session closed");
        }
    }

    // ── Outbound ─────────────────────────────────────────────────

    /// Hand a message to the wire.
    ///
    /// Returns `false` when the session is not connected: the message
    /// is dropped, not queued. There is no outbound retry.
    pub fn send(&self, message: &OutboundMessage) -> bool {
        let inner = self.lock();
        if !inner.state.is_connected() {
            debug!("send suppressed while {}", inner.state);
            return false;
        }
        let Some(outbound) = inner.outbound.as_ref() else {
            debug!("send suppressed: no active link");
            return false;
        };
        match message.to_text() {
            Ok(text) => outbound.try_send(text).is_ok(),
            Err(e) => {
                warn!("outbound serialisation failed: {e}");
                false
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, inner: &Inner) {
        let _ = self.state_tx.send(inner.state);
    }
}
