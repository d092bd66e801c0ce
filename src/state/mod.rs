//! Per-group game session state machine
//!
//! A [`GameSession`] is owned by exactly one runner task and mutated through plain
//! `&mut self` methods, so every operation is already serialized. Operations push
//! [`Notice`]s into an outbox that the runner drains and delivers after each step.
//!
//! The `impl GameSession` blocks are split by concern:
//! - `player`: join-phase roster operations
//! - `submission`: the answer pipeline and the virtual participant's move
//! - `round`: the tick state machine and elimination rounds
//! - `game`: start and end of the running phase

pub mod export;
mod game;
mod player;
mod round;
mod submission;

pub use export::{GameRecord, GameSummary, PlayerRecord};
pub use submission::VirtualMove;

use crate::modes::{ChainState, GameModeRules, ModeDescriptor};
use crate::types::*;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Outbound message produced by a session step
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Visible to the whole group
    Group(String),
    /// Visible to one user only
    Reply { user_id: UserId, text: String },
    /// A new turn; `turn` identifies it for the virtual participant
    Turn {
        user_id: UserId,
        turn: u64,
        text: String,
    },
    GameOver(GameSummary),
}

impl Notice {
    pub fn text(&self) -> String {
        match self {
            Notice::Group(text) | Notice::Reply { text, .. } | Notice::Turn { text, .. } => {
                text.clone()
            }
            Notice::GameOver(summary) => summary.text(),
        }
    }
}

/// Why a roster operation did nothing. Not an error: the failed precondition is
/// itself the correct outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    WrongState,
    RosterFull,
    AlreadyJoined,
    NotJoined,
    NotAllowed,
    AlreadyExtended,
    /// The join-phase timer went negative; the runner starts the stale-timer watchdog
    StaleTimer,
    VirtualPresent,
    NoVirtual,
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Continue,
    /// Join phase ended with too few players
    Cancelled,
    /// Game ran to completion
    Finished(GameRecord),
    Killed,
}

/// Elimination round bookkeeping: resolved turns left before the next boundary
#[derive(Debug, Clone, Copy, Default)]
struct RoundClock {
    turns_left: u32,
    number: u32,
}

pub struct GameSession {
    group_id: GroupId,
    session_id: SessionId,
    rules: Arc<dyn GameModeRules>,
    state: GameState,
    roster: Vec<Player>,
    queue: VecDeque<UserId>,
    time_left: i64,
    time_limit: i64,
    chain: ChainState,
    longest_word: Option<(String, UserId)>,
    answered: bool,
    accepting_answers: bool,
    extended_user_ids: HashSet<UserId>,
    negative_ticks: u32,
    turn_seq: u64,
    round: RoundClock,
    rng: StdRng,
    started_at: Option<DateTime<Utc>>,
    notices: Vec<Notice>,
    virtual_request: Option<u64>,
}

impl GameSession {
    pub fn new(group_id: GroupId, rules: Arc<dyn GameModeRules>, rng: StdRng) -> Self {
        let descriptor = rules.descriptor().clone();
        let mut session = Self {
            group_id,
            session_id: ulid::Ulid::new().to_string(),
            rules,
            state: GameState::Joining,
            roster: Vec::new(),
            queue: VecDeque::new(),
            time_left: descriptor.joining_seconds,
            time_limit: descriptor.limits.turn_seconds,
            chain: ChainState::new(descriptor.limits.min_length),
            longest_word: None,
            answered: false,
            accepting_answers: false,
            extended_user_ids: HashSet::new(),
            negative_ticks: 0,
            turn_seq: 0,
            round: RoundClock::default(),
            rng,
            started_at: None,
            notices: Vec::new(),
            virtual_request: None,
        };

        let article = if descriptor.name.starts_with(['a', 'e', 'i', 'o', 'u']) {
            "An"
        } else {
            "A"
        };
        session.notify(format!(
            "{article} {} is starting.\n{}-{} players are needed.\n{}s to /join.",
            descriptor.name, descriptor.min_players, descriptor.max_players, session.time_left
        ));
        session
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn descriptor(&self) -> &ModeDescriptor {
        self.rules.descriptor()
    }

    pub fn mode(&self) -> ModeKind {
        self.rules.descriptor().kind
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn time_left(&self) -> i64 {
        self.time_left
    }

    pub fn time_limit(&self) -> i64 {
        self.time_limit
    }

    pub fn min_word_length(&self) -> usize {
        self.chain.min_length
    }

    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    pub fn turn_queue(&self) -> Vec<UserId> {
        self.queue.iter().copied().collect()
    }

    pub fn chain(&self) -> &ChainState {
        &self.chain
    }

    pub fn turns(&self) -> u32 {
        self.chain.turns
    }

    pub fn answered(&self) -> bool {
        self.answered
    }

    pub fn accepting_answers(&self) -> bool {
        self.accepting_answers
    }

    pub fn longest_word(&self) -> Option<(&str, UserId)> {
        self.longest_word
            .as_ref()
            .map(|(word, owner)| (word.as_str(), *owner))
    }

    pub fn player(&self, user_id: UserId) -> Option<&Player> {
        self.roster.iter().find(|p| p.user_id == user_id)
    }

    /// Player whose turn it is
    pub fn head(&self) -> Option<&Player> {
        self.queue.front().and_then(|&id| self.player(id))
    }

    pub fn is_turn_of(&self, user_id: UserId) -> bool {
        self.state == GameState::Running && self.queue.front() == Some(&user_id)
    }

    pub fn turn_seq(&self) -> u64 {
        self.turn_seq
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Mark the session for termination; the next tick ends it
    pub fn kill(&mut self) {
        tracing::info!(group_id = self.group_id, session_id = %self.session_id, "Game killed");
        self.state = GameState::Killed;
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Turn the virtual participant should act on, set when it became the head
    pub fn take_virtual_request(&mut self) -> Option<u64> {
        self.virtual_request.take()
    }

    fn notify(&mut self, text: impl Into<String>) {
        self.notices.push(Notice::Group(text.into()));
    }

    fn reply(&mut self, user_id: UserId, text: impl Into<String>) {
        self.notices.push(Notice::Reply {
            user_id,
            text: text.into(),
        });
    }

    fn name_of(&self, user_id: UserId) -> String {
        self.player(user_id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| user_id.to_string())
    }
}
