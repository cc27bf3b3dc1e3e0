//! Websocket relay: the sole consumer of the distribution channel.
//!
//! Drains the batch queue into a "most recent batch" slot and pushes that
//! snapshot, serialized to JSON, to every connected subscriber on a fixed
//! cadence. The push cadence is independent of poll cadence — a subscriber
//! sees the latest available batch, not necessarily every batch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::models::Batch;

#[derive(Clone)]
struct RelayState {
    latest: Arc<RwLock<Option<Arc<Batch>>>>,
    push_interval: Duration,
    cancel: CancellationToken,
}

/// Serve `/ws` on `addr` until the token is cancelled.
pub async fn run_relay(
    addr: String,
    mut batches: mpsc::Receiver<Batch>,
    push_interval: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    let state = RelayState {
        latest: Arc::new(RwLock::new(None)),
        push_interval,
        cancel: cancel.clone(),
    };

    // Drain the queue so pollers are only throttled by genuinely slow
    // consumption, and keep the newest batch for subscribers.
    let latest = Arc::clone(&state.latest);
    let drain_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = drain_cancel.cancelled() => break,
                received = batches.recv() => match received {
                    Some(batch) => {
                        *latest.write().await = Some(Arc::new(batch));
                    }
                    None => {
                        warn!("all pollers gone, relay keeps serving the last batch");
                        break;
                    }
                },
            }
        }
    });

    let app = Router::new().route("/ws", get(ws_handler)).with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind relay address {addr}"))?;
    info!(addr = %addr, "websocket relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("Relay server failed")?;

    Ok(())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<RelayState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| push_loop(socket, state))
}

async fn push_loop(mut socket: WebSocket, state: RelayState) {
    info!("subscriber connected");

    loop {
        let snapshot = state.latest.read().await.clone();
        if let Some(batch) = snapshot {
            let payload = match serde_json::to_string(batch.as_ref()) {
                Ok(payload) => payload,
                Err(e) => {
                    error!(error = %e, "failed to serialize batch");
                    break;
                }
            };
            if socket.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }

        tokio::select! {
            _ = state.cancel.cancelled() => break,
            _ = tokio::time::sleep(state.push_interval) => {}
        }
    }

    info!("subscriber disconnected");
}
