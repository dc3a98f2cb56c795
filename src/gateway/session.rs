//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.

use crate::bus::EventBus;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::{FrameOutcome, GatewayConnection};
use super::protocol::ServerFrame;

/// Run a gateway session over an upgraded WebSocket.
///
/// 1. Forwards outbound frames from the connection's queue to the socket
/// 2. Feeds incoming text frames to the connection
/// 3. Ends on client close, `connection_terminate`, or server shutdown
/// 4. Unregisters every subscription of the connection on exit
#[instrument(skip_all, fields(connection = %connection_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    connection_id: String,
    bus: Arc<EventBus>,
    outbound_buffer: usize,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<ServerFrame>(outbound_buffer.max(1));
    let connection = GatewayConnection::new(connection_id.clone(), bus, send_tx);

    // Outbound writer
    let writer = tokio::spawn(async move {
        while let Some(frame) = send_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(j) => j,
                Err(e) => {
                    warn!(error = %e, "failed to serialize frame");
                    continue;
                }
            };
            if ws_tx.send(WsMessage::Text(json.into())).await.is_err() {
                debug!("socket write failed");
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    loop {
        let incoming = tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("server shutting down");
                connection.complete_all().await;
                break;
            }
            incoming = ws_rx.next() => incoming,
        };

        let text = match incoming {
            Some(Ok(WsMessage::Text(t))) => t.as_str().to_owned(),
            Some(Ok(WsMessage::Binary(data))) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s,
                Err(_) => {
                    info!(len = data.len(), "received non-UTF8 binary frame");
                    continue;
                }
            },
            Some(Ok(WsMessage::Close(_))) => {
                info!("client sent close frame");
                break;
            }
            Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => continue,
            Some(Err(e)) => {
                debug!(error = %e, "socket read failed");
                break;
            }
            None => break,
        };

        if connection.handle_text(&text).await == FrameOutcome::Terminate {
            info!("client terminated connection");
            break;
        }
    }

    // Dropping the connection unregisters its subscriptions and releases the
    // last sender, which ends the writer.
    drop(connection);
    let _ = writer.await;
    info!(connection = %connection_id, "client disconnected");
}
