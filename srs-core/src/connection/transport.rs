//! Transport seam between the connection manager and the wire.
//!
//! A [`TransportLink`] is a pair of channels bridged to background
//! reader/writer tasks, so the manager never touches the socket
//! directly. The production implementation speaks WebSocket; tests
//! substitute a channel-backed double behind the same [`Transport`]
//! trait.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

use crate::error::SrsError;
use crate::protocol::{InboundUnit, StreamEndpoint};

/// Capacity of the per-link channels. Outbound traffic is one region
/// message per calibration plus occasional pings; inbound is drained
/// continuously by the dispatcher.
const LINK_CHANNEL_CAPACITY: usize = 64;

// ── TransportLink ────────────────────────────────────────────────

/// An established link to the stream server.
///
/// Dropping `outbound` closes the link from our side; the link
/// reports its own death by closing `inbound`.
#[derive(Debug)]
pub struct TransportLink {
    /// Wire-bound text payloads, consumed by the writer task.
    pub outbound: mpsc::Sender<String>,
    /// Units read off the wire, in transport delivery order.
    pub inbound: mpsc::Receiver<InboundUnit>,
}

// ── Transport ────────────────────────────────────────────────────

/// Opens links to a [`StreamEndpoint`].
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open one link. The caller owns the recovery policy; this just
    /// reports whether the attempt worked.
    async fn connect(&self, endpoint: &StreamEndpoint) -> Result<TransportLink, SrsError>;
}

// ── WebSocketTransport ───────────────────────────────────────────

/// Production transport: one persistent WebSocket per link.
///
/// Binary messages become [`InboundUnit::Frame`], text messages
/// become [`InboundUnit::Control`]. Ping/pong at the WebSocket layer
/// is handled inside the library and never surfaces as a unit.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, endpoint: &StreamEndpoint) -> Result<TransportLink, SrsError> {
        let (ws, _) = connect_async(endpoint.url())
            .await
            .map_err(|e| SrsError::Transport(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(LINK_CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel::<InboundUnit>(LINK_CHANNEL_CAPACITY);

        // Writer task: manager -> wire. Ends when the manager drops
        // its sender, closing the socket on the way out.
        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = sink.send(WsMessage::Text(text)).await {
                    warn!("websocket write failed: {e}");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Reader task: wire -> manager. Closing `inbound_tx` is the
        // link-down signal.
        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                let unit = match message {
                    Ok(WsMessage::Binary(data)) => InboundUnit::Frame(Bytes::from(data)),
                    Ok(WsMessage::Text(text)) => InboundUnit::Control(text),
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("websocket read failed: {e}");
                        break;
                    }
                };
                if inbound_tx.send(unit).await.is_err() {
                    // Receiver side went away; nothing left to feed.
                    break;
                }
            }
            debug!("websocket link closed");
        });

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
