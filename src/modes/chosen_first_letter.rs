use super::{
    render_prompt, ChainState, GameModeRules, ModeDescriptor, RuleContext, TurnView, ALPHABET,
};
use crate::dictionary::WordQuery;
use crate::error::{Rejection, SessionFault};
use crate::types::ModeKind;
use rand::seq::IndexedRandom;

/// Every answer starts with one letter chosen at round start
#[derive(Debug, Clone)]
pub struct ChosenFirstLetter {
    descriptor: ModeDescriptor,
}

impl ChosenFirstLetter {
    pub fn new() -> Self {
        Self {
            descriptor: ModeDescriptor::classic_family(
                ModeKind::ChosenFirstLetter,
                "chosen first letter game",
            ),
        }
    }

    /// Letters that have at least one playable word
    fn playable_letters(chain: &ChainState, ctx: &RuleContext<'_>) -> Vec<char> {
        ALPHABET
            .iter()
            .copied()
            .filter(|&c| {
                let query = WordQuery::new(chain.min_length)
                    .starts_with(c)
                    .exclude(&chain.used_words);
                ctx.dict.eligible(&query).next().is_some()
            })
            .collect()
    }
}

impl Default for ChosenFirstLetter {
    fn default() -> Self {
        Self::new()
    }
}

impl GameModeRules for ChosenFirstLetter {
    fn descriptor(&self) -> &ModeDescriptor {
        &self.descriptor
    }

    fn round_init(
        &self,
        chain: &mut ChainState,
        ctx: &mut RuleContext<'_>,
    ) -> Result<String, SessionFault> {
        self.enter_round(chain, ctx);
        let letter = chain.first_letter.ok_or(SessionFault::NoStartingWord {
            mode: self.descriptor.kind,
        })?;
        Ok(format!(
            "The chosen first letter is {}.",
            letter.to_ascii_uppercase()
        ))
    }

    fn enter_round(&self, chain: &mut ChainState, ctx: &mut RuleContext<'_>) {
        chain.clear_round_constraints();
        let letters = Self::playable_letters(chain, ctx);
        chain.first_letter = letters.choose(ctx.rng).copied();
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
}
