//! Records handed to the persistence collaborator when a game ends

use crate::error::capitalize;
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One finished game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecord {
    pub session_id: SessionId,
    pub group_id: GroupId,
    /// Final roster size
    pub players: usize,
    pub mode: ModeKind,
    pub winner: Option<UserId>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub player_records: Vec<PlayerRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRecord {
    pub user_id: UserId,
    pub name: String,
    pub is_virtual: bool,
    /// Still in the turn queue when the game ended
    pub won: bool,
    pub word_count: u32,
    pub letter_count: u32,
    pub longest_word: Option<String>,
}

/// End-of-game narration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSummary {
    pub winner: Option<String>,
    pub players: usize,
    pub turns: u32,
    /// (word, owner name)
    pub longest_word: Option<(String, String)>,
    pub duration_secs: i64,
}

impl GameSummary {
    pub fn text(&self) -> String {
        let mut text = format!(
            "{} won the game out of {} players!\nTotal words: {}\n",
            self.winner.as_deref().unwrap_or("No one"),
            self.players,
            self.turns
        );
        if let Some((word, owner)) = &self.longest_word {
            text.push_str(&format!("Longest word: {} from {owner}\n", capitalize(word)));
        }
        let secs = self.duration_secs;
        text.push_str(&format!(
            "Game length: {:02}:{:02}:{:02}",
            secs / 3600,
            secs % 3600 / 60,
            secs % 60
        ));
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_text() {
        let summary = GameSummary {
            winner: None,
            players: 4,
            turns: 31,
            longest_word: Some(("xylophone".into(), "Alice".into())),
            duration_secs: 3725,
        };
        assert_eq!(
            summary.text(),
            "No one won the game out of 4 players!\nTotal words: 31\n\
             Longest word: Xylophone from Alice\nGame length: 01:02:05"
        );
    }

    #[test]
    fn test_record_serializes_mode_snake_case() {
        let now = Utc::now();
        let record = GameRecord {
            session_id: "s".into(),
            group_id: -1,
            players: 2,
            mode: ModeKind::BannedLetters,
            winner: Some(5),
            start_time: now,
            end_time: now,
            player_records: vec![],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["mode"], "banned_letters");
        assert_eq!(json["winner"], 5);
    }
}
