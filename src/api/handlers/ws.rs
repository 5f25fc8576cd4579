use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Serialize;
use uuid::Uuid;

use crate::api::auth::AccountId;
use crate::models::AlertEvent;
use crate::AppState;

/// Messages pushed to a connected client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "watchlist_alert")]
    WatchlistAlert(AlertEvent),
}

pub async fn handler(
    ws: WebSocketUpgrade,
    AccountId(account_id): AccountId,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, account_id))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, account_id: Uuid) {
    tracing::info!(account_id = %account_id, "Alert WebSocket client connected");

    let mut rx = state.alerts.subscribe();

    loop {
        tokio::select! {
            // Forward this account's alerts to the client
            msg = rx.recv() => {
                match msg {
                    Ok(event) if event.account_id == account_id => {
                        match serde_json::to_string(&WsMessage::WatchlistAlert(event)) {
                            Ok(json) => {
                                if socket.send(Message::Text(json)).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to serialize WsMessage");
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Alert WS client lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
            // Handle incoming messages from client (ping/pong, close)
            client_msg = socket.recv() => {
                match client_msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {} // ignore text/binary from client
                    Some(Err(_)) => break,
                }
            }
        }
    }

    tracing::info!(account_id = %account_id, "Alert WebSocket client disconnected");
}
