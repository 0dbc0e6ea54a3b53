//! WebSocket endpoint.
//!
//! Each connection gets two halves:
//! - a writer task draining the connection's outbound queue onto the socket
//! - a receive loop handing frames to the hub one at a time, in order
//!
//! Whichever half finishes first ends the connection; cleanup then runs once
//! through [`SignalingHub::disconnect`].

use crate::hub::SignalingHub;
use crate::registry::Outbound;
use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{Sink, SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;

/// Longest a single frame may take to reach the socket before the peer is
/// treated as gone.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the signaling WebSocket router. The browser client connects to `/`.
pub fn build_router(hub: SignalingHub) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(hub)
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<SignalingHub>) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, hub))
}

/// Handle a single signaling WebSocket connection.
async fn handle_connection(socket: WebSocket, hub: SignalingHub) {
    let (sender, mut receiver) = socket.split();
    let (id, outbound_rx) = hub.connect().await;

    let mut send_task = tokio::spawn(write_loop(sender, outbound_rx));

    // Receive loop
    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => hub.handle_text(id, text.as_str()).await,
                Some(Ok(Message::Binary(bytes))) => hub.handle_bytes(id, &bytes).await,
                Some(Ok(Message::Pong(_))) => hub.mark_alive(id).await,
                // axum answers pings on its own
                Some(Ok(Message::Ping(_))) => {}
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(conn = %id, error = %e, "WebSocket read failed");
                    break;
                }
            },
            _ = &mut send_task => break,
        }
    }

    hub.disconnect(id).await;
    send_task.abort();
}

/// Serialize queued items onto the socket until the queue closes, a close is
/// requested, or the socket fails or stalls past [`SEND_TIMEOUT`].
async fn write_loop<S>(mut sender: S, mut outbound_rx: mpsc::Receiver<Outbound>)
where
    S: Sink<Message> + Unpin,
{
    while let Some(item) = outbound_rx.recv().await {
        let frame = match item {
            Outbound::Event(event) => match serde_json::to_string(&event) {
                Ok(json) => Message::Text(json.into()),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode server message");
                    continue;
                }
            },
            Outbound::Relay(payload) => Message::Text(payload.to_string().into()),
            Outbound::Probe => Message::Ping(Bytes::new()),
            Outbound::Close => {
                let _ = tokio::time::timeout(SEND_TIMEOUT, sender.send(Message::Close(None))).await;
                break;
            }
        };

        match tokio::time::timeout(SEND_TIMEOUT, sender.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => break,
            Err(_) => {
                tracing::debug!("WebSocket write stalled, dropping connection");
                break;
            }
        }
    }
}
