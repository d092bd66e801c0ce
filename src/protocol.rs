use crate::dictionary::WordStatus;
use crate::registry::RunInfo;
use crate::state::GameSummary;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    StartGame {
        mode: ModeKind,
    },
    Join,
    Leave,
    /// Privileged; `target` is the replied-to user, the sender joins otherwise
    ForceJoin {
        target: Option<Participant>,
    },
    ForceLeave {
        target: Option<UserId>,
    },
    /// Raw command argument; anything that is not an integer means +30
    Extend {
        amount: Option<String>,
    },
    AddVirtual,
    RemoveVirtual,
    Answer {
        text: String,
    },
    Kill,
    Exists {
        word: String,
    },
    RunInfo,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WordState {
    Accepted,
    Rejected,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        group_id: GroupId,
        user_id: UserId,
        server_now: String,
    },
    /// Group-wide game narration
    Notice {
        group_id: GroupId,
        text: String,
    },
    /// Visible only to `user_id`
    Reply {
        group_id: GroupId,
        user_id: UserId,
        text: String,
    },
    Turn {
        group_id: GroupId,
        user_id: UserId,
        turn: u64,
        text: String,
    },
    GameOver {
        group_id: GroupId,
        summary: GameSummary,
        text: String,
    },
    WordStatus {
        word: String,
        status: WordState,
        reason: Option<String>,
    },
    RunInfo {
        info: RunInfo,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn word_status(word: &str, status: WordStatus) -> Self {
        let (status, reason) = match status {
            WordStatus::Accepted => (WordState::Accepted, None),
            WordStatus::Rejected { reason } => (WordState::Rejected, reason),
            WordStatus::Unknown => (WordState::Unknown, None),
        };
        ServerMessage::WordStatus {
            word: word.to_lowercase(),
            status,
            reason,
        }
    }

    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }

    /// Group the message belongs to, for fan-out filtering
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            ServerMessage::Welcome { group_id, .. }
            | ServerMessage::Notice { group_id, .. }
            | ServerMessage::Reply { group_id, .. }
            | ServerMessage::Turn { group_id, .. }
            | ServerMessage::GameOver { group_id, .. } => Some(*group_id),
            _ => None,
        }
    }

    /// Whether a connection of `user_id` in `group_id` should see this message
    pub fn is_visible_to(&self, group_id: GroupId, user_id: UserId) -> bool {
        match self {
            ServerMessage::Reply {
                group_id: g,
                user_id: u,
                ..
            } => *g == group_id && *u == user_id,
            other => other.group_id() == Some(group_id),
        }
    }
}
