//! Game mode rules
//!
//! Every mode is a stateless [`GameModeRules`] object shared by all sessions of that
//! mode. Anything a mode needs to remember during a game (banned letters, required
//! letter, active sub-mode) lives in the session's [`ChainState`].

mod banned_letters;
mod chosen_first_letter;
mod classic;
mod elimination;
mod mixed_elimination;
mod required_letter;

pub use banned_letters::{pick_banned_letters, BannedLetters};
pub use chosen_first_letter::ChosenFirstLetter;
pub use classic::Classic;
pub use elimination::{Elimination, EliminationPolicy, RoundBoundary, TieBreak};
pub use mixed_elimination::{MixedElimination, MixedRotation};
pub use required_letter::{pick_required_letter, RequiredLetter};

use crate::config::{EngineConfig, GameSettings};
use crate::dictionary::{WordDictionary, WordQuery};
use crate::error::{capitalize, Rejection, SessionFault};
use crate::types::ModeKind;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub const ALPHABET: [char; 26] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
pub const VOWELS: [char; 5] = ['a', 'e', 'i', 'o', 'u'];

/// How the per-turn time limit and minimum word length evolve over a game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitSchedule {
    pub turn_seconds: i64,
    pub min_turn_seconds: i64,
    pub turn_seconds_step: i64,
    pub min_length: usize,
    pub max_min_length: usize,
    pub min_length_step: usize,
    pub turns_between_changes: u32,
}

/// Limits that moved after an accepted answer, as (from, to)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitChange {
    pub time_limit: Option<(i64, i64)>,
    pub min_length: Option<(usize, usize)>,
}

impl LimitChange {
    pub fn is_empty(&self) -> bool {
        self.time_limit.is_none() && self.min_length.is_none()
    }
}

impl LimitSchedule {
    pub fn classic() -> Self {
        Self {
            turn_seconds: GameSettings::MAX_TURN_SECONDS,
            min_turn_seconds: GameSettings::MIN_TURN_SECONDS,
            turn_seconds_step: GameSettings::TURN_SECONDS_REDUCTION_PER_LIMIT_CHANGE,
            min_length: GameSettings::MIN_WORD_LENGTH_LIMIT,
            max_min_length: GameSettings::MAX_WORD_LENGTH_LIMIT,
            min_length_step: GameSettings::WORD_LENGTH_LIMIT_INCREASE_PER_LIMIT_CHANGE,
            turns_between_changes: GameSettings::TURNS_BETWEEN_LIMITS_CHANGE,
        }
    }

    /// Limits that never change
    pub fn fixed(turn_seconds: i64, min_length: usize) -> Self {
        Self {
            turn_seconds,
            min_turn_seconds: turn_seconds,
            turn_seconds_step: 0,
            min_length,
            max_min_length: min_length,
            min_length_step: 0,
            turns_between_changes: GameSettings::TURNS_BETWEEN_LIMITS_CHANGE,
        }
    }

    /// Step the limits if `turns` lands on a change boundary. Neither value ever
    /// crosses its bound.
    pub fn apply(&self, turns: u32, time_limit: &mut i64, min_length: &mut usize) -> LimitChange {
        let mut change = LimitChange::default();
        if turns == 0 || self.turns_between_changes == 0 || turns % self.turns_between_changes != 0
        {
            return change;
        }
        if *time_limit > self.min_turn_seconds {
            let from = *time_limit;
            *time_limit = (from - self.turn_seconds_step).max(self.min_turn_seconds);
            change.time_limit = Some((from, *time_limit));
        }
        if *min_length < self.max_min_length {
            let from = *min_length;
            *min_length = (from + self.min_length_step).min(self.max_min_length);
            change.min_length = Some((from, *min_length));
        }
        change
    }
}

/// Static description of a mode
#[derive(Debug, Clone)]
pub struct ModeDescriptor {
    pub kind: ModeKind,
    pub name: &'static str,
    pub min_players: usize,
    pub max_players: usize,
    pub joining_seconds: i64,
    pub limits: LimitSchedule,
    /// Elimination modes skip the shared minimum-length check
    pub enforce_min_length: bool,
}

impl ModeDescriptor {
    pub fn classic_family(kind: ModeKind, name: &'static str) -> Self {
        Self {
            kind,
            name,
            min_players: GameSettings::MIN_PLAYERS,
            max_players: GameSettings::MAX_PLAYERS,
            joining_seconds: GameSettings::JOINING_PHASE_SECONDS,
            limits: LimitSchedule::classic(),
            enforce_min_length: true,
        }
    }

    pub fn elimination_family(kind: ModeKind, name: &'static str) -> Self {
        Self {
            kind,
            name,
            min_players: GameSettings::ELIM_MIN_PLAYERS,
            max_players: GameSettings::ELIM_MAX_PLAYERS,
            joining_seconds: GameSettings::ELIM_JOINING_PHASE_SECONDS,
            limits: LimitSchedule::fixed(
                GameSettings::ELIM_TURN_SECONDS,
                GameSettings::MIN_WORD_LENGTH_LIMIT,
            ),
            enforce_min_length: false,
        }
    }
}

/// Chain and per-round constraint state of one session
#[derive(Debug, Clone, Default)]
pub struct ChainState {
    /// Last accepted word, or the starting word
    pub current_word: Option<String>,
    /// Constant first letter while a chosen-first-letter round is active
    pub first_letter: Option<char>,
    pub banned_letters: Vec<char>,
    pub required_letter: Option<char>,
    /// Active sub-mode of a mixed elimination game
    pub sub_mode: Option<ModeKind>,
    pub used_words: HashSet<String>,
    pub turns: u32,
    pub min_length: usize,
}

impl ChainState {
    pub fn new(min_length: usize) -> Self {
        Self {
            min_length,
            ..Default::default()
        }
    }

    /// The letter the next answer must start with
    pub fn continuation_letter(&self) -> Option<char> {
        self.first_letter
            .or_else(|| self.current_word.as_deref().and_then(|w| w.chars().last()))
    }

    pub fn clear_round_constraints(&mut self) {
        self.first_letter = None;
        self.banned_letters.clear();
        self.required_letter = None;
    }

    /// Chain-continuation query shared by most modes
    pub fn base_query(&self) -> WordQuery<'_> {
        let mut query = WordQuery::new(self.min_length).exclude(&self.used_words);
        if let Some(letter) = self.continuation_letter() {
            query = query.starts_with(letter);
        }
        query
    }
}

/// Dictionary snapshot and session RNG handed to rule hooks
pub struct RuleContext<'a> {
    pub dict: &'a WordDictionary,
    pub rng: &'a mut StdRng,
}

/// What a turn prompt needs to know about the session
#[derive(Debug, Clone, Copy)]
pub struct TurnView<'a> {
    pub chain: &'a ChainState,
    pub current: &'a str,
    pub next: Option<&'a str>,
    pub time_limit: i64,
    pub remaining: usize,
    pub roster: usize,
    /// False for the elimination family, which has no length floor
    pub show_min_length: bool,
}

/// Behaviour that differs between game modes
pub trait GameModeRules: Send + Sync + fmt::Debug {
    fn descriptor(&self) -> &ModeDescriptor;

    /// Pick the starting word (or letter), seed round constraints and return the
    /// opening announcement
    fn round_init(&self, chain: &mut ChainState, ctx: &mut RuleContext<'_>)
        -> Result<String, SessionFault>;

    /// Seed the per-round constraint state without touching the chain
    fn enter_round(&self, chain: &mut ChainState, ctx: &mut RuleContext<'_>) {
        let _ = ctx;
        chain.clear_round_constraints();
    }

    fn turn_prompt(&self, view: &TurnView<'_>) -> String;

    /// Mode-specific check run after the shared checks
    fn extra_validate(&self, word: &str, chain: &ChainState) -> Result<(), Rejection>;

    /// A word the virtual participant can play, if any exists
    fn pick_auto_answer(&self, chain: &ChainState, ctx: &mut RuleContext<'_>) -> Option<String>;

    /// Called after an answer has been accepted and recorded in the chain
    fn on_accept(&self, chain: &mut ChainState, ctx: &mut RuleContext<'_>) {
        let _ = (chain, ctx);
    }

    /// Called at an elimination round boundary; returns an announcement if the
    /// round rules changed
    fn on_round_boundary(
        &self,
        chain: &mut ChainState,
        ctx: &mut RuleContext<'_>,
    ) -> Option<String> {
        let _ = (chain, ctx);
        None
    }

    fn elimination(&self) -> Option<&EliminationPolicy> {
        None
    }
}

/// Build the rules object for a mode
pub fn build_rules(kind: ModeKind, config: &EngineConfig) -> Arc<dyn GameModeRules> {
    match kind {
        ModeKind::Classic => Arc::new(Classic::new()),
        ModeKind::BannedLetters => Arc::new(BannedLetters::new()),
        ModeKind::ChosenFirstLetter => Arc::new(ChosenFirstLetter::new()),
        ModeKind::RequiredLetter => Arc::new(RequiredLetter::new()),
        ModeKind::Elimination => Arc::new(Elimination::new(config.elimination)),
        ModeKind::MixedElimination => Arc::new(MixedElimination::new(
            config.elimination,
            config.mixed_rotation,
        )),
    }
}

/// Pick and record a random starting word avoiding `banned`
pub(crate) fn pick_starting_word(
    kind: ModeKind,
    chain: &mut ChainState,
    ctx: &mut RuleContext<'_>,
    banned: &[char],
) -> Result<String, SessionFault> {
    let query = WordQuery::new(chain.min_length)
        .banned(banned)
        .exclude(&chain.used_words);
    let word = ctx
        .dict
        .sample(&query, ctx.rng)
        .ok_or(SessionFault::NoStartingWord { mode: kind })?;
    chain.used_words.insert(word.clone());
    chain.current_word = Some(word.clone());
    Ok(word)
}

/// Render a turn prompt. `requirements` are extra clauses such as "exclude A, B".
pub(crate) fn render_prompt(view: &TurnView<'_>, requirements: &[String]) -> String {
    let mut clauses = Vec::new();
    if let Some(letter) = view.chain.continuation_letter() {
        clauses.push(format!("start with {}", letter.to_ascii_uppercase()));
    }
    clauses.extend(requirements.iter().cloned());
    if view.show_min_length {
        let n = view.chain.min_length;
        clauses.push(format!(
            "contain at least {n} letter{}",
            if n == 1 { "" } else { "s" }
        ));
    }

    let mut text = format!("Turn: {}", view.current);
    if let Some(next) = view.next {
        text.push_str(&format!(" (Next: {next})"));
    }
    text.push('\n');
    if !clauses.is_empty() {
        text.push_str(&format!("Your word must {}.\n", join_and(&clauses)));
    }
    text.push_str(&format!(
        "You have {}s to answer.\nPlayers remaining: {}/{}\nTotal words: {}",
        view.time_limit, view.remaining, view.roster, view.chain.turns
    ));
    text
}

/// "The first word is Apple."
pub(crate) fn first_word_line(chain: &ChainState) -> String {
    match chain.current_word.as_deref() {
        Some(word) => format!("The first word is {}.", capitalize(word)),
        None => String::new(),
    }
}

/// ["a", "b", "c"] -> "a, b and c"
pub(crate) fn join_and(parts: &[String]) -> String {
    match parts {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_schedule_steps_until_bounds() {
        let schedule = LimitSchedule::classic();
        let mut time_limit = schedule.turn_seconds;
        let mut min_length = schedule.min_length;
        let mut seen_time = vec![time_limit];
        let mut seen_len = vec![min_length];

        for turns in 1..=100 {
            let change = schedule.apply(turns, &mut time_limit, &mut min_length);
            if turns % 5 != 0 {
                assert!(change.is_empty());
            }
            seen_time.push(time_limit);
            seen_len.push(min_length);
            assert!(time_limit >= 30);
            assert!(min_length <= 10);
        }

        assert_eq!(time_limit, 30);
        assert_eq!(min_length, 10);
        // 50 -> 45 -> 40 -> 35 -> 30 over the first 20 turns
        assert_eq!(seen_time[20], 30);
        assert_eq!(seen_time[19], 35);
        // 3 -> 10 takes 7 changes, reached at turn 35
        assert_eq!(seen_len[35], 10);
        assert_eq!(seen_len[34], 9);
    }

    #[test]
    fn test_schedule_reports_changes() {
        let schedule = LimitSchedule::classic();
        let mut time_limit = 50;
        let mut min_length = 3;
        let change = schedule.apply(5, &mut time_limit, &mut min_length);
        assert_eq!(change.time_limit, Some((50, 45)));
        assert_eq!(change.min_length, Some((3, 4)));

        let mut time_limit = 30;
        let mut min_length = 10;
        assert!(schedule
            .apply(5, &mut time_limit, &mut min_length)
            .is_empty());
    }

    #[test]
    fn test_fixed_schedule_never_changes() {
        let schedule = LimitSchedule::fixed(30, 3);
        let mut time_limit = 30;
        let mut min_length = 3;
        for turns in 1..50 {
            assert!(schedule
                .apply(turns, &mut time_limit, &mut min_length)
                .is_empty());
        }
    }

    #[test]
    fn test_continuation_letter() {
        let mut chain = ChainState::new(3);
        assert_eq!(chain.continuation_letter(), None);
        chain.current_word = Some("apple".into());
        assert_eq!(chain.continuation_letter(), Some('e'));
        chain.first_letter = Some('q');
        assert_eq!(chain.continuation_letter(), Some('q'));
    }

    #[test]
    fn test_render_prompt() {
        let mut chain = ChainState::new(4);
        chain.current_word = Some("apple".into());
        chain.turns = 7;
        let view = TurnView {
            chain: &chain,
            current: "Alice",
            next: Some("Bob"),
            time_limit: 45,
            remaining: 2,
            roster: 3,
            show_min_length: true,
        };
        let text = render_prompt(&view, &["exclude A, B".to_string()]);
        assert_eq!(
            text,
            "Turn: Alice (Next: Bob)\n\
             Your word must start with E, exclude A, B and contain at least 4 letters.\n\
             You have 45s to answer.\n\
             Players remaining: 2/3\n\
             Total words: 7"
        );
    }

    #[test]
    fn test_build_rules_matches_kind() {
        let config = EngineConfig::default();
        for kind in ModeKind::ALL {
            let rules = build_rules(kind, &config);
            assert_eq!(rules.descriptor().kind, kind);
            assert_eq!(rules.elimination().is_some(), kind.is_elimination());
            assert_eq!(rules.descriptor().enforce_min_length, !kind.is_elimination());
        }
    }
}
