//! WebSocket relay of task events.
//!
//! Each connection subscribes to the [`EventHub`](crate::events::EventHub) and
//! receives every event as a JSON text frame (`{"type": "streaming-started", ...}`).
//! `?task_id=<id>` narrows the stream to one task.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use super::auth;
use super::routes::AppState;
use crate::events::Envelope;

const PROTOCOL: &str = "claude-ui";

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    pub task_id: Option<i64>,
    pub token: Option<String>,
}

pub async fn task_events_ws(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    if state.config.auth.auth_required(state.config.dev_mode) {
        let token = auth::extract_jwt_from_protocols(&headers).or(query.token.clone());
        let Some(token) = token else {
            return (StatusCode::UNAUTHORIZED, "Missing websocket JWT").into_response();
        };
        if !auth::verify_token_for_config(&token, &state.config) {
            return (StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
        }
    }

    let Some(ws) = ws else {
        return (StatusCode::BAD_REQUEST, "Expected a WebSocket upgrade").into_response();
    };
    let task_filter = query.task_id;
    ws.protocols([PROTOCOL])
        .on_upgrade(move |socket| relay_events(socket, state, task_filter))
}

fn wanted(envelope: &Envelope, task_filter: Option<i64>) -> bool {
    task_filter.map_or(true, |id| envelope.task_id == id)
}

async fn relay_events(socket: WebSocket, state: Arc<AppState>, task_filter: Option<i64>) {
    let mut events = state.events.subscribe();
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!(task_id = ?task_filter, "WebSocket client connected");

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(envelope) => {
                    if !wanted(&envelope, task_filter) {
                        continue;
                    }
                    let text = match serde_json::to_string(&envelope.event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!("Failed to serialize task event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "WebSocket client lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!(task_id = ?task_filter, "WebSocket client disconnected");
}
