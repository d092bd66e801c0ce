use super::{
    first_word_line, pick_starting_word, BannedLetters, ChainState, ChosenFirstLetter, Classic,
    EliminationPolicy, GameModeRules, ModeDescriptor, RequiredLetter, RuleContext, TurnView,
};
use crate::error::{upper_list, Rejection, SessionFault};
use crate::types::ModeKind;
use rand::seq::IndexedRandom;
use std::sync::Arc;

/// How mixed elimination picks the next round's sub-mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixedRotation {
    /// Uniformly among the sub-modes other than the current one
    Random,
    /// In pool order, wrapping around
    Cycle,
}

/// Elimination scoring whose turn rules switch between other modes each round
#[derive(Debug, Clone)]
pub struct MixedElimination {
    descriptor: ModeDescriptor,
    policy: EliminationPolicy,
    rotation: MixedRotation,
    pool: Vec<Arc<dyn GameModeRules>>,
}

impl MixedElimination {
    pub fn new(policy: EliminationPolicy, rotation: MixedRotation) -> Self {
        Self {
            descriptor: ModeDescriptor::elimination_family(
                ModeKind::MixedElimination,
                "mixed elimination game",
            ),
            policy,
            rotation,
            pool: vec![
                Arc::new(Classic::new()),
                Arc::new(BannedLetters::new()),
                Arc::new(ChosenFirstLetter::new()),
                Arc::new(RequiredLetter::new()),
            ],
        }
    }

    fn active(&self, chain: &ChainState) -> &dyn GameModeRules {
        chain
            .sub_mode
            .and_then(|kind| self.pool.iter().find(|r| r.descriptor().kind == kind))
            .map_or(self.pool[0].as_ref(), |r| r.as_ref())
    }

    fn next_sub_mode(&self, current: Option<ModeKind>, ctx: &mut RuleContext<'_>) -> ModeKind {
        let kinds: Vec<ModeKind> = self.pool.iter().map(|r| r.descriptor().kind).collect();
        match (self.rotation, current) {
            (_, None) => kinds.choose(ctx.rng).copied().unwrap_or(ModeKind::Classic),
            (MixedRotation::Cycle, Some(kind)) => {
                let idx = kinds.iter().position(|&k| k == kind).unwrap_or(0);
                kinds[(idx + 1) % kinds.len()]
            }
            (MixedRotation::Random, Some(kind)) => {
                let others: Vec<ModeKind> = kinds.into_iter().filter(|&k| k != kind).collect();
                others.choose(ctx.rng).copied().unwrap_or(kind)
            }
        }
    }

    fn switch_to(
        &self,
        kind: ModeKind,
        chain: &mut ChainState,
        ctx: &mut RuleContext<'_>,
    ) -> String {
        chain.sub_mode = Some(kind);
        let sub = self.active(chain);
        sub.enter_round(chain, ctx);
        let mut text = format!("This round is a {}.", sub.descriptor().name);
        if !chain.banned_letters.is_empty() {
            text.push_str(&format!(
                "\nBanned letters: {}",
                upper_list(&chain.banned_letters)
            ));
        }
        if let Some(letter) = chain.first_letter {
            text.push_str(&format!(
                "\nEvery word must start with {}.",
                letter.to_ascii_uppercase()
            ));
        }
        text
    }
}

impl GameModeRules for MixedElimination {
    fn descriptor(&self) -> &ModeDescriptor {
        &self.descriptor
    }

    fn round_init(
        &self,
        chain: &mut ChainState,
        ctx: &mut RuleContext<'_>,
    ) -> Result<String, SessionFault> {
        chain.clear_round_constraints();
        pick_starting_word(self.descriptor.kind, chain, ctx, &[])?;
        let kind = self.next_sub_mode(None, ctx);
        let round = self.switch_to(kind, chain, ctx);
        Ok(format!("{}\n{}", first_word_line(chain), round))
    }

    fn turn_prompt(&self, view: &TurnView<'_>) -> String {
        self.active(view.chain).turn_prompt(view)
    }

    fn extra_validate(&self, word: &str, chain: &ChainState) -> Result<(), Rejection> {
        self.active(chain).extra_validate(word, chain)
    }

    fn pick_auto_answer(&self, chain: &ChainState, ctx: &mut RuleContext<'_>) -> Option<String> {
        self.active(chain).pick_auto_answer(chain, ctx)
    }

    fn on_accept(&self, chain: &mut ChainState, ctx: &mut RuleContext<'_>) {
        let sub = self.active(chain);
        sub.on_accept(chain, ctx);
    }

    fn on_round_boundary(
        &self,
        chain: &mut ChainState,
        ctx: &mut RuleContext<'_>,
    ) -> Option<String> {
        let kind = self.next_sub_mode(chain.sub_mode, ctx);
        Some(self.switch_to(kind, chain, ctx))
    }

    fn elimination(&self) -> Option<&EliminationPolicy> {
        Some(&self.policy)
    }
}
