//! WebSocket endpoint for the progress channel (C7): `/analysis/ws/task/{task_id}`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use serde_json::json;

use crate::app::AppState;

pub async fn ws_task_progress(
    ws: WebSocketUpgrade,
    Path(task_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, task_id, state))
}

async fn handle_socket(mut socket: WebSocket, task_id: String, state: Arc<AppState>) {
    let established = json!({"type": "connection_established", "task_id": task_id});
    if socket
        .send(Message::Text(established.to_string()))
        .await
        .is_err()
    {
        return;
    }

    let mut rx = state.progress.subscribe(&task_id);
    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        let Ok(text) = serde_json::to_string(&event) else { continue };
                        if socket.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    // Inbound messages are accepted as keepalive; no reply required.
                    Some(Ok(_)) => continue,
                    _ => break,
                }
            }
        }
    }
}
