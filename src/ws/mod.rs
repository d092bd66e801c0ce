pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::app::AppState;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::types::{is_reserved_user_id, GroupId, Participant, UserId};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub group: GroupId,
    pub user: UserId,
    pub name: Option<String>,
}

/// One chat member connected from one group
#[derive(Debug, Clone)]
pub struct Connection {
    pub group_id: GroupId,
    pub participant: Participant,
}

impl From<WsQuery> for Connection {
    fn from(params: WsQuery) -> Self {
        let name = params
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("User {}", params.user));
        Self {
            group_id: params.group,
            participant: Participant::new(params.user, name),
        }
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    tracing::info!(
        group_id = params.group,
        user_id = params.user,
        "WebSocket connection request"
    );

    if is_reserved_user_id(params.user) {
        tracing::warn!(user_id = params.user, "Rejected reserved user id");
        return (StatusCode::BAD_REQUEST, "Reserved user id").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, params.into(), state))
        .into_response()
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, conn: Connection, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let group_id = conn.group_id;
    let user_id = conn.participant.user_id;

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        group_id,
        user_id,
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if let Ok(msg) = serde_json::to_string(&welcome) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            tracing::error!("Failed to send welcome message");
            return;
        }
    }

    let mut broadcast_rx = state.messenger.subscribe();

    loop {
        tokio::select! {
            broadcast_msg = broadcast_rx.recv() => {
                match broadcast_msg {
                    Ok(msg) if msg.is_visible_to(group_id, user_id) => {
                        if let Ok(json) = serde_json::to_string(&msg) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(group_id, user_id, skipped, "Connection lagging behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(group_id, user_id, "Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => handlers::handle_message(client_msg, &conn, &state).await,
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::error(
                                    "PARSE_ERROR",
                                    format!("Invalid message format: {}", e),
                                ))
                            }
                        };
                        if let Some(response) = response {
                            if let Ok(json) = serde_json::to_string(&response) {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    tracing::error!("Failed to send response");
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(group_id, user_id, "WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!(group_id, user_id, "WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_name_fallback() {
        let conn: Connection = WsQuery {
            group: -1,
            user: 42,
            name: Some("   ".into()),
        }
        .into();
        assert_eq!(conn.participant.name, "User 42");

        let conn: Connection = WsQuery {
            group: -1,
            user: 42,
            name: Some(" Alice ".into()),
        }
        .into();
        assert_eq!(conn.participant.name, "Alice");
        assert_eq!(conn.group_id, -1);
    }
}
