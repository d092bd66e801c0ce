//! WebSocket message dispatch
//!
//! Translates client messages into registry commands. Privileges are resolved here,
//! before a command reaches the session.

use crate::app::AppState;
use crate::auth::resolve_access;
use crate::error::RegistryError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::Command;
use crate::types::{Access, GroupId};
use std::sync::Arc;

use super::Connection;

/// Return early unless the sender is the owner or a group administrator
macro_rules! check_privileged {
    ($access:expr, $action:expr) => {
        if !$access.is_privileged() {
            return Some(ServerMessage::error(
                "UNAUTHORIZED",
                format!("Only administrators can {}", $action),
            ));
        }
    };
}

async fn access_of(conn: &Connection, state: &AppState) -> Access {
    resolve_access(
        state.owner_id,
        state.admins.as_ref(),
        conn.group_id,
        conn.participant.user_id,
    )
    .await
}

/// Queue a command; failures become an error reply to the sender
async fn dispatch(state: &AppState, group_id: GroupId, command: Command) -> Option<ServerMessage> {
    match state.registry.send(group_id, command).await {
        Ok(()) => None,
        Err(e @ RegistryError::NotFound(_)) => Some(ServerMessage::error("NO_GAME", e.to_string())),
        Err(e) => {
            tracing::warn!(group_id, "Command not delivered: {}", e);
            Some(ServerMessage::error("GAME_CLOSED", e.to_string()))
        }
    }
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    conn: &Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    let group_id = conn.group_id;
    let user_id = conn.participant.user_id;

    match msg {
        ClientMessage::StartGame { mode } => {
            match state
                .registry
                .create(group_id, mode, conn.participant.clone())
                .await
            {
                Ok(_) => None,
                Err(e) => Some(ServerMessage::error("ALREADY_RUNNING", e.to_string())),
            }
        }

        ClientMessage::Join => {
            dispatch(state, group_id, Command::Join(conn.participant.clone())).await
        }

        ClientMessage::Leave => dispatch(state, group_id, Command::Leave(user_id)).await,

        ClientMessage::ForceJoin { target } => {
            let access = access_of(conn, state).await;
            let command = Command::ForceJoin {
                sender: conn.participant.clone(),
                target,
                access,
            };
            dispatch(state, group_id, command).await
        }

        ClientMessage::ForceLeave { target } => {
            let access = access_of(conn, state).await;
            let command = Command::ForceLeave {
                sender: user_id,
                target,
                access,
            };
            dispatch(state, group_id, command).await
        }

        ClientMessage::Extend { amount } => {
            let access = access_of(conn, state).await;
            let amount = amount.and_then(|a| a.trim().parse::<i64>().ok());
            let command = Command::Extend {
                sender: user_id,
                amount,
                access,
            };
            dispatch(state, group_id, command).await
        }

        ClientMessage::AddVirtual => {
            let access = access_of(conn, state).await;
            dispatch(state, group_id, Command::AddVirtual { sender: user_id, access }).await
        }

        ClientMessage::RemoveVirtual => {
            let access = access_of(conn, state).await;
            dispatch(state, group_id, Command::RemoveVirtual { sender: user_id, access }).await
        }

        ClientMessage::Answer { text } => {
            // Plain chat when no game is running
            let _ = state
                .registry
                .send(group_id, Command::Answer { user_id, text })
                .await;
            None
        }

        ClientMessage::Kill => {
            let access = access_of(conn, state).await;
            check_privileged!(access, "kill a game");
            dispatch(state, group_id, Command::Kill).await
        }

        ClientMessage::Exists { word } => {
            let dict = state.registry.dictionary().snapshot().await;
            Some(ServerMessage::word_status(&word, dict.lookup(&word)))
        }

        ClientMessage::RunInfo => Some(ServerMessage::RunInfo {
            info: state.registry.run_info().await,
        }),
    }
}
