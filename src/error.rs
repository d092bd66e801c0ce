//! Error and rejection types shared across the engine

use crate::types::{GroupId, ModeKind};

/// Why an answer was not accepted. Reported to the submitter only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Not currently accepting answers.")]
    NotAccepting,

    #[error("{} does not start with {}.", capitalize(.word), .letter.to_ascii_uppercase())]
    WrongStart { word: String, letter: char },

    #[error("{} has fewer than {min} letters.", capitalize(.word))]
    TooShort { word: String, min: usize },

    #[error("{} has been used.", capitalize(.word))]
    AlreadyUsed { word: String },

    #[error("{} is not in my list of words.", capitalize(.word))]
    NotInDictionary { word: String },

    #[error("{} contains banned letters ({}).", capitalize(.word), upper_list(.letters))]
    BannedLetters { word: String, letters: Vec<char> },

    #[error("{} does not include {}.", capitalize(.word), .letter.to_ascii_uppercase())]
    MissingRequired { word: String, letter: char },
}

/// Faults that end a session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionFault {
    #[error("Game timer is stuck.")]
    StaleTimer,

    #[error("Prolonged negative timer ({ticks} ticks).")]
    NegativeTimer { ticks: u32 },

    #[error("No eligible starting word for {mode:?}.")]
    NoStartingWord { mode: ModeKind },

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("A game is already running in group {0}")]
    AlreadyRunning(GroupId),

    #[error("No game is running in group {0}")]
    NotFound(GroupId),

    #[error("Game in group {0} is no longer accepting commands")]
    Closed(GroupId),
}

#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("Failed to read word list: {0}")]
    Io(#[from] std::io::Error),

    #[error("Word list contains no usable words")]
    EmptyCorpus,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("No connection is listening to group {0}")]
    NoListeners(GroupId),

    #[error("No connection is listening")]
    NoConnections,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Failed to write game record: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode game record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// "apple" -> "Apple"
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// ['a', 'e'] -> "A, E"
pub fn upper_list(letters: &[char]) -> String {
    letters
        .iter()
        .map(|c| c.to_ascii_uppercase().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            Rejection::WrongStart {
                word: "apple".into(),
                letter: 'e'
            }
            .to_string(),
            "Apple does not start with E."
        );
        assert_eq!(
            Rejection::TooShort {
                word: "ox".into(),
                min: 3
            }
            .to_string(),
            "Ox has fewer than 3 letters."
        );
        assert_eq!(
            Rejection::BannedLetters {
                word: "tax".into(),
                letters: vec!['a', 'x']
            }
            .to_string(),
            "Tax contains banned letters (A, X)."
        );
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("z"), "Z");
        assert_eq!(capitalize("zebra"), "Zebra");
    }
}
