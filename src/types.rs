use serde::{Deserialize, Serialize};

/// Opaque ID types for chat identities
pub type GroupId = i64;
pub type UserId = i64;
pub type SessionId = String;

/// User id reserved for the in-process virtual participant
pub const VIRTUAL_PLAYER_ID: UserId = -1;

/// Chat users have non-negative ids; negative ids belong to the engine
pub fn is_reserved_user_id(user_id: UserId) -> bool {
    user_id < 0
}
pub const VIRTUAL_PLAYER_NAME: &str = "On9Bot";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameState {
    Joining,
    Running,
    Killed,
}

/// Game modes a session can be started in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    Classic,
    BannedLetters,
    ChosenFirstLetter,
    RequiredLetter,
    Elimination,
    MixedElimination,
}

impl ModeKind {
    pub const ALL: [ModeKind; 6] = [
        ModeKind::Classic,
        ModeKind::BannedLetters,
        ModeKind::ChosenFirstLetter,
        ModeKind::RequiredLetter,
        ModeKind::Elimination,
        ModeKind::MixedElimination,
    ];

    /// Chat command that starts this mode
    pub fn command(&self) -> &'static str {
        match self {
            ModeKind::Classic => "startclassic",
            ModeKind::BannedLetters => "startbl",
            ModeKind::ChosenFirstLetter => "startcfl",
            ModeKind::RequiredLetter => "startrl",
            ModeKind::Elimination => "startelim",
            ModeKind::MixedElimination => "startmelim",
        }
    }

    pub fn from_command(command: &str) -> Option<Self> {
        let command = command.trim_start_matches('/');
        Self::ALL.into_iter().find(|m| m.command() == command)
    }

    pub fn is_elimination(&self) -> bool {
        matches!(self, ModeKind::Elimination | ModeKind::MixedElimination)
    }
}

/// Identity of someone issuing a command in a group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub user_id: UserId,
    pub name: String,
}

impl Participant {
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
        }
    }
}

/// Privileges of the sender, resolved by the gateway before a command reaches a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Access {
    pub is_owner: bool,
    pub is_admin: bool,
}

impl Access {
    pub fn is_privileged(&self) -> bool {
        self.is_owner || self.is_admin
    }
}

/// One roster entry and its per-game stats
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub user_id: UserId,
    pub name: String,
    pub is_virtual: bool,
    pub word_count: u32,
    pub letter_count: u32,
    pub longest_word: Option<String>,
    /// Cumulative elimination score
    pub score: u32,
}

impl Player {
    pub fn new(participant: Participant) -> Self {
        Self {
            user_id: participant.user_id,
            name: participant.name,
            is_virtual: false,
            word_count: 0,
            letter_count: 0,
            longest_word: None,
            score: 0,
        }
    }

    pub fn virtual_player() -> Self {
        Self {
            is_virtual: true,
            ..Self::new(Participant::new(VIRTUAL_PLAYER_ID, VIRTUAL_PLAYER_NAME))
        }
    }

    /// Count an accepted word. A word as long as the current longest replaces it.
    pub fn record_word(&mut self, word: &str, turn_score: u32) {
        let len = word.chars().count();
        self.word_count += 1;
        self.letter_count += u32::try_from(len).unwrap_or(u32::MAX);
        self.score += turn_score;
        if self
            .longest_word
            .as_deref()
            .is_none_or(|longest| len >= longest.chars().count())
        {
            self.longest_word = Some(word.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_commands_round_trip() {
        for mode in ModeKind::ALL {
            assert_eq!(ModeKind::from_command(mode.command()), Some(mode));
        }
        assert_eq!(
            ModeKind::from_command("/startclassic"),
            Some(ModeKind::Classic)
        );
        assert_eq!(ModeKind::from_command("startfoo"), None);
    }

    #[test]
    fn test_player_record_word() {
        let mut player = Player::new(Participant::new(7, "Alice"));
        player.record_word("apple", 5);
        player.record_word("egg", 3);
        player.record_word("grape", 5);

        assert_eq!(player.word_count, 3);
        assert_eq!(player.letter_count, 13);
        assert_eq!(player.score, 13);
        // Ties go to the newer word
        assert_eq!(player.longest_word.as_deref(), Some("grape"));
    }

    #[test]
    fn test_virtual_player_identity() {
        let vp = Player::virtual_player();
        assert!(vp.is_virtual);
        assert_eq!(vp.user_id, VIRTUAL_PLAYER_ID);
        assert_eq!(vp.name, VIRTUAL_PLAYER_NAME);
        assert!(is_reserved_user_id(vp.user_id));
        assert!(!is_reserved_user_id(0));
    }

    #[test]
    fn test_elimination_family() {
        assert!(ModeKind::Elimination.is_elimination());
        assert!(ModeKind::MixedElimination.is_elimination());
        assert!(!ModeKind::BannedLetters.is_elimination());
    }
}
