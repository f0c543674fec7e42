//! WebSocket stream of download lifecycle events.
//!
//! On connect the client gets one `Snapshot` frame with every job, then one
//! frame per [`DownloadEvent`]. Frames are JSON text tagged by `type`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use niluflix_core::{DownloadEvent, DownloadJob};

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

/// First frame on every connection.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum Greeting {
    Snapshot { jobs: Vec<DownloadJob> },
}

type Sink = SplitSink<WebSocket, Message>;

/// GET /api/v1/ws
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Serializes `frame` and sends it. `false` once the client is gone.
async fn send_json<T: Serialize>(sink: &mut Sink, kind: &str, frame: &T) -> bool {
    let text = match serde_json::to_string(frame) {
        Ok(text) => text,
        Err(e) => {
            error!(kind, "Failed to serialize WebSocket frame: {}", e);
            return true;
        }
    };
    WS_MESSAGES_SENT.with_label_values(&[kind]).inc();
    sink.send(Message::Text(text.into())).await.is_ok()
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut receiver) = socket.split();

    // Subscribe before snapshotting so nothing falls between the two.
    let mut events = state.manager().subscribe();
    let jobs = state.manager().get_all_jobs().await;

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();
    info!(jobs = jobs.len(), "WebSocket client connected");

    let send_task = tokio::spawn(async move {
        if !send_json(&mut sink, "Snapshot", &Greeting::Snapshot { jobs }).await {
            return;
        }
        loop {
            let event: DownloadEvent = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "WebSocket client lagging, events dropped");
                    WS_LAG_EVENTS.inc();
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if !send_json(&mut sink, event.kind(), &event).await {
                debug!("WebSocket client went away");
                break;
            }
        }
    });

    // Inbound frames carry nothing; read only to notice the close.
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}
