use super::{
    first_word_line, pick_starting_word, render_prompt, ChainState, GameModeRules,
    ModeDescriptor, RuleContext, TurnView,
};
use crate::config::GameSettings;
use crate::error::{Rejection, SessionFault};
use crate::types::{ModeKind, UserId};

/// When an elimination round ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundBoundary {
    /// After as many resolved turns as there were players when the round began
    FullRotation,
    /// After a fixed number of resolved turns
    EveryTurns(u32),
}

/// Who goes when several players share the lowest score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    AllLowest,
    /// Only the lowest scorer closest to the head of the turn queue
    EarliestInQueue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EliminationPolicy {
    pub boundary: RoundBoundary,
    pub tie_break: TieBreak,
    pub max_turn_score: u32,
}

impl Default for EliminationPolicy {
    fn default() -> Self {
        Self {
            boundary: RoundBoundary::FullRotation,
            tie_break: TieBreak::AllLowest,
            max_turn_score: GameSettings::ELIM_MAX_TURN_SCORE,
        }
    }
}

impl EliminationPolicy {
    pub fn turn_score(&self, word: &str) -> u32 {
        let len = u32::try_from(word.chars().count()).unwrap_or(u32::MAX);
        len.min(self.max_turn_score)
    }

    /// Number of resolved turns in a round that starts with `queue_len` players
    pub fn round_length(&self, queue_len: usize) -> u32 {
        match self.boundary {
            RoundBoundary::FullRotation => u32::try_from(queue_len).unwrap_or(u32::MAX).max(1),
            RoundBoundary::EveryTurns(n) => n.max(1),
        }
    }

    /// Players to eliminate given `(user, score)` in queue order. Never everyone: when
    /// all remaining players share the lowest score nobody goes.
    pub fn select_losers(&self, scores: &[(UserId, u32)]) -> Vec<UserId> {
        let Some(lowest) = scores.iter().map(|&(_, s)| s).min() else {
            return Vec::new();
        };
        if scores.iter().all(|&(_, s)| s == lowest) {
            return Vec::new();
        }
        let mut losers = scores
            .iter()
            .filter(|&&(_, s)| s == lowest)
            .map(|&(id, _)| id);
        match self.tie_break {
            TieBreak::AllLowest => losers.collect(),
            TieBreak::EarliestInQueue => losers.next().into_iter().collect(),
        }
    }
}

/// Classic chaining without a length floor; lowest scorers are removed each round
#[derive(Debug, Clone)]
pub struct Elimination {
    descriptor: ModeDescriptor,
    policy: EliminationPolicy,
}

impl Elimination {
    pub fn new(policy: EliminationPolicy) -> Self {
        Self {
            descriptor: ModeDescriptor::elimination_family(
                ModeKind::Elimination,
                "elimination game",
            ),
            policy,
        }
    }
}

impl GameModeRules for Elimination {
    fn descriptor(&self) -> &ModeDescriptor {
        &self.descriptor
    }

    fn round_init(
        &self,
        chain: &mut ChainState,
        ctx: &mut RuleContext<'_>,
    ) -> Result<String, SessionFault> {
        self.enter_round(chain, ctx);
        pick_starting_word(self.descriptor.kind, chain, ctx, &[])?;
        Ok(format!(
            "{}\nLongest words score highest; the lowest scorers are eliminated each round.",
            first_word_line(chain)
        ))
    }

    fn turn_prompt(&self, view: &TurnView<'_>) -> String {
        render_prompt(view, &[])
    }

    fn extra_validate(&self, _word: &str, _chain: &ChainState) -> Result<(), Rejection> {
        Ok(())
    }

    fn pick_auto_answer(&self, chain: &ChainState, ctx: &mut RuleContext<'_>) -> Option<String> {
        ctx.dict.sample(&chain.base_query(), ctx.rng)
    }

    fn elimination(&self) -> Option<&EliminationPolicy> {
        Some(&self.policy)
    }
}
