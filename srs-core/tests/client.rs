//! Integration tests — connection lifecycle, resilience, and the
//! calibration send path, driven over a channel-backed transport
//! double so no real server is needed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_test::assert_ok;

use srs_core::{
    CalibrationEngine, ClickOutcome, ConnectionManager, ConnectionState, DispatchEvent,
    InboundUnit, OutboundMessage, SrsError, StreamEndpoint, SurfaceGeometry, Transport,
    TransportLink, dispatch,
};

/// Short retry delay so resilience tests run quickly.
const RETRY: Duration = Duration::from_millis(200);

/// Generous bound for anything that should happen promptly.
const DEADLINE: Duration = Duration::from_secs(5);

// ── Test transport ───────────────────────────────────────────────

/// Server-side handle to one accepted link.
struct ServerEnd {
    /// Push units toward the client.
    to_client: mpsc::Sender<InboundUnit>,
    /// Observe what the client wrote.
    from_client: mpsc::Receiver<String>,
}

/// Channel-backed transport: each `connect` consumes one scripted
/// outcome and, on success, hands the server end to the test.
struct TestTransport {
    outcomes: Mutex<VecDeque<bool>>,
    accepted: mpsc::UnboundedSender<ServerEnd>,
    attempts: AtomicUsize,
}

impl TestTransport {
    fn new(
        outcomes: impl IntoIterator<Item = bool>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            accepted: accepted_tx,
            attempts: AtomicUsize::new(0),
        });
        (transport, accepted_rx)
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for TestTransport {
    async fn connect(&self, _endpoint: &StreamEndpoint) -> Result<TransportLink, SrsError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let accept = self.outcomes.lock().unwrap().pop_front().unwrap_or(false);
        if !accept {
            return Err(SrsError::Transport("scripted refusal".into()));
        }
        let (to_client, inbound) = mpsc::channel(64);
        let (outbound, from_client) = mpsc::channel(64);
        let _ = self.accepted.send(ServerEnd {
            to_client,
            from_client,
        });
        Ok(TransportLink { outbound, inbound })
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn session(
    outcomes: impl IntoIterator<Item = bool>,
) -> (
    Arc<TestTransport>,
    mpsc::UnboundedReceiver<ServerEnd>,
    Arc<ConnectionManager>,
    mpsc::Receiver<InboundUnit>,
    watch::Receiver<ConnectionState>,
) {
    let (transport, accepted_rx) = TestTransport::new(outcomes);
    let shared: Arc<dyn Transport> = transport.clone();
    let (manager, inbound_rx, state_rx) =
        ConnectionManager::with_retry_delay(shared, StreamEndpoint::localhost(), RETRY);
    (transport, accepted_rx, manager, inbound_rx, state_rx)
}

async fn wait_connected(state_rx: &mut watch::Receiver<ConnectionState>) {
    timeout(DEADLINE, state_rx.wait_for(ConnectionState::is_connected))
        .await
        .expect("timed out waiting for connected")
        .expect("state channel closed");
}

async fn wait_disconnected(state_rx: &mut watch::Receiver<ConnectionState>) {
    timeout(DEADLINE, state_rx.wait_for(ConnectionState::is_disconnected))
        .await
        .expect("timed out waiting for disconnected")
        .expect("state channel closed");
}

/// Drive a full calibration with the nominal corner clicks at 1:1
/// scale and return the resulting region.
fn calibrate() -> srs_core::RegionConfig {
    let geometry = SurfaceGeometry {
        native_width: 640.0,
        native_height: 480.0,
        displayed_width: 640.0,
        displayed_height: 480.0,
    };
    let mut engine = CalibrationEngine::new();
    assert!(engine.toggle());

    let mut outcome = None;
    for (x, y) in [(10.0, 10.0), (200.0, 10.0), (200.0, 150.0), (10.0, 150.0)] {
        outcome = engine.handle_click(x, y, geometry);
    }
    match outcome {
        Some(ClickOutcome::Completed { region, .. }) => region,
        other => panic!("calibration did not complete: {other:?}"),
    }
}

// ── Connection lifecycle ─────────────────────────────────────────

#[tokio::test]
async fn connect_establishes_and_units_flow_in_order() {
    let (transport, mut accepted_rx, manager, mut inbound_rx, mut state_rx) = session([true]);

    assert_ok!(manager.connect().await);
    wait_connected(&mut state_rx).await;
    assert_eq!(transport.attempts(), 1);

    let server = accepted_rx.recv().await.unwrap();
    server
        .to_client
        .send(InboundUnit::Frame(Bytes::from_static(b"f1")))
        .await
        .unwrap();
    server
        .to_client
        .send(InboundUnit::Control(
            r#"{"type":"latency","latency":7.0}"#.into(),
        ))
        .await
        .unwrap();
    server
        .to_client
        .send(InboundUnit::Frame(Bytes::from_static(b"f2")))
        .await
        .unwrap();

    let mut events = Vec::new();
    for _ in 0..3 {
        let unit = timeout(DEADLINE, inbound_rx.recv())
            .await
            .expect("timed out")
            .expect("unit stream closed");
        events.extend(dispatch(unit));
    }
    assert_eq!(
        events,
        vec![
            DispatchEvent::Frame(Bytes::from_static(b"f1")),
            DispatchEvent::Latency(7.0),
            DispatchEvent::Frame(Bytes::from_static(b"f2")),
        ]
    );
}

#[tokio::test]
async fn connect_while_connected_is_rejected() {
    let (transport, _accepted_rx, manager, _inbound_rx, mut state_rx) = session([true]);

    manager.connect().await.unwrap();
    wait_connected(&mut state_rx).await;

    let err = manager.connect().await.unwrap_err();
    assert!(matches!(err, SrsError::IllegalTransition(_)));
    // The transport was never touched a second time.
    assert_eq!(transport.attempts(), 1);
}

// ── Resilience ───────────────────────────────────────────────────

#[tokio::test]
async fn failed_connect_retries_once_after_delay() {
    let (transport, _accepted_rx, manager, _inbound_rx, mut state_rx) = session([false, true]);

    assert_ok!(manager.connect().await);
    assert_eq!(transport.attempts(), 1);
    assert!(manager.state().is_disconnected());

    // The scheduled attempt fires and lands the session.
    wait_connected(&mut state_rx).await;
    assert_eq!(transport.attempts(), 2);
}

#[tokio::test]
async fn link_drop_triggers_reconnect() {
    let (transport, mut accepted_rx, manager, _inbound_rx, mut state_rx) = session([true, true]);

    manager.connect().await.unwrap();
    wait_connected(&mut state_rx).await;
    let first = accepted_rx.recv().await.unwrap();

    // Server goes away; the session recovers on its own, proven by a
    // second link being accepted.
    drop(first);
    let _second = timeout(DEADLINE, accepted_rx.recv())
        .await
        .expect("no reconnect attempt arrived")
        .expect("transport closed");
    assert_eq!(transport.attempts(), 2);
    assert!(manager.state().is_connected() || manager.state().is_connecting());
}

#[tokio::test]
async fn disconnect_cancels_pending_retry() {
    let (transport, _accepted_rx, manager, _inbound_rx, _state_rx) = session([false, true]);

    manager.connect().await.unwrap();
    assert_eq!(transport.attempts(), 1);

    manager.disconnect();
    assert!(manager.state().is_closed());

    // Well past the retry delay: the cancelled timer must not fire.
    tokio::time::sleep(RETRY * 4).await;
    assert_eq!(transport.attempts(), 1);
    assert!(manager.state().is_closed());
}

#[tokio::test]
async fn disconnect_after_drop_stops_recovery() {
    let (transport, mut accepted_rx, manager, _inbound_rx, mut state_rx) = session([true, true]);

    manager.connect().await.unwrap();
    wait_connected(&mut state_rx).await;
    let server = accepted_rx.recv().await.unwrap();

    drop(server);
    wait_disconnected(&mut state_rx).await;

    // Close before the armed retry fires.
    manager.disconnect();
    tokio::time::sleep(RETRY * 4).await;
    assert_eq!(transport.attempts(), 1);
    assert!(manager.state().is_closed());
}

#[tokio::test]
async fn stale_retry_noops_when_already_connected() {
    let (transport, _accepted_rx, manager, _inbound_rx, mut state_rx) = session([false, true]);

    // First attempt fails and arms the timer.
    manager.connect().await.unwrap();
    assert_eq!(transport.attempts(), 1);

    // The operator reconnects manually before the timer fires.
    manager.connect().await.unwrap();
    wait_connected(&mut state_rx).await;
    assert_eq!(transport.attempts(), 2);

    // When the timer fires it finds a connected session and no-ops.
    tokio::time::sleep(RETRY * 4).await;
    assert_eq!(transport.attempts(), 2);
    assert!(manager.state().is_connected());
}

#[tokio::test]
async fn reconnect_after_operator_close() {
    let (transport, _accepted_rx, manager, _inbound_rx, mut state_rx) = session([true, true]);

    manager.connect().await.unwrap();
    wait_connected(&mut state_rx).await;

    manager.disconnect();
    assert!(manager.state().is_closed());

    manager.connect().await.unwrap();
    wait_connected(&mut state_rx).await;
    assert_eq!(transport.attempts(), 2);
}

// ── Outbound gating ──────────────────────────────────────────────

#[tokio::test]
async fn send_before_connect_is_suppressed() {
    let (_transport, _accepted_rx, manager, _inbound_rx, _state_rx) = session([true]);
    assert!(!manager.send(&OutboundMessage::Ping));
}

#[tokio::test]
async fn calibration_region_reaches_wire_when_connected() {
    let (_transport, mut accepted_rx, manager, _inbound_rx, mut state_rx) = session([true]);

    manager.connect().await.unwrap();
    wait_connected(&mut state_rx).await;
    let mut server = accepted_rx.recv().await.unwrap();

    let region = calibrate();
    assert!(manager.send(&OutboundMessage::Region(region)));

    let text = timeout(DEADLINE, server.from_client.recv())
        .await
        .expect("timed out")
        .expect("wire closed without a message");
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["region"]["left"], 10.0);
    assert_eq!(value["region"]["top"], 10.0);
    assert_eq!(value["region"]["width"], 190.0);
    assert_eq!(value["region"]["height"], 140.0);
}

#[tokio::test]
async fn calibration_send_while_closed_never_reaches_wire() {
    let (_transport, mut accepted_rx, manager, _inbound_rx, mut state_rx) = session([true]);

    manager.connect().await.unwrap();
    wait_connected(&mut state_rx).await;
    let mut server = accepted_rx.recv().await.unwrap();

    // The connection drops between the clicks and the send.
    manager.disconnect();

    let region = calibrate();
    assert!(!manager.send(&OutboundMessage::Region(region)));

    // The server observes the link closing with nothing on it.
    let observed = timeout(DEADLINE, server.from_client.recv())
        .await
        .expect("timed out");
    assert_eq!(observed, None);
}

// ── Robustness ───────────────────────────────────────────────────

#[tokio::test]
async fn malformed_control_text_changes_nothing() {
    let (_transport, mut accepted_rx, manager, mut inbound_rx, mut state_rx) = session([true]);

    manager.connect().await.unwrap();
    wait_connected(&mut state_rx).await;
    let server = accepted_rx.recv().await.unwrap();

    server
        .to_client
        .send(InboundUnit::Control("not json".into()))
        .await
        .unwrap();

    let unit = timeout(DEADLINE, inbound_rx.recv())
        .await
        .expect("timed out")
        .expect("unit stream closed");
    assert_eq!(dispatch(unit), None);

    // The session shrugs it off.
    assert!(manager.state().is_connected());
    server
        .to_client
        .send(InboundUnit::Frame(Bytes::from_static(b"next")))
        .await
        .unwrap();
    let unit = timeout(DEADLINE, inbound_rx.recv())
        .await
        .expect("timed out")
        .expect("unit stream closed");
    assert_eq!(dispatch(unit), Some(DispatchEvent::Frame(Bytes::from_static(b"next"))));
}
