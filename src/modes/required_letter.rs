use super::{
    first_word_line, pick_starting_word, render_prompt, ChainState, GameModeRules,
    ModeDescriptor, RuleContext, TurnView, ALPHABET,
};
use crate::error::{Rejection, SessionFault};
use crate::types::ModeKind;
use rand::seq::IndexedRandom;
use rand::Rng;

/// Each answer must contain a letter that changes every turn
#[derive(Debug, Clone)]
pub struct RequiredLetter {
    descriptor: ModeDescriptor,
}

impl RequiredLetter {
    pub fn new() -> Self {
        Self {
            descriptor: ModeDescriptor::classic_family(
                ModeKind::RequiredLetter,
                "required letter game",
            ),
        }
    }
}

impl Default for RequiredLetter {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform pick from the alphabet minus `exclude`
pub fn pick_required_letter<R: Rng + ?Sized>(rng: &mut R, exclude: Option<char>) -> char {
    let letters: Vec<char> = ALPHABET
        .iter()
        .copied()
        .filter(|&c| Some(c) != exclude)
        .collect();
    // The alphabet minus one letter is never empty
    letters.choose(rng).copied().unwrap_or('a')
}

impl GameModeRules for RequiredLetter {
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
        self.enter_round(chain, ctx);
        Ok(first_word_line(chain))
    }

    fn enter_round(&self, chain: &mut ChainState, ctx: &mut RuleContext<'_>) {
        chain.clear_round_constraints();
        chain.required_letter = Some(pick_required_letter(ctx.rng, chain.continuation_letter()));
    }

    fn turn_prompt(&self, view: &TurnView<'_>) -> String {
        let include = view
            .chain
            .required_letter
            .map(|c| format!("include {}", c.to_ascii_uppercase()));
        let requirements: Vec<String> = include.into_iter().collect();
        render_prompt(view, &requirements)
    }

    fn extra_validate(&self, word: &str, chain: &ChainState) -> Result<(), Rejection> {
        match chain.required_letter {
            Some(letter) if !word.contains(letter) => Err(Rejection::MissingRequired {
                word: word.to_string(),
                letter,
            }),
            _ => Ok(()),
        }
    }

    fn pick_auto_answer(&self, chain: &ChainState, ctx: &mut RuleContext<'_>) -> Option<String> {
        let mut query = chain.base_query();
        if let Some(letter) = chain.required_letter {
            query = query.contains(letter);
        }
        ctx.dict.sample(&query, ctx.rng)
    }

    fn on_accept(&self, chain: &mut ChainState, ctx: &mut RuleContext<'_>) {
        chain.required_letter = Some(pick_required_letter(ctx.rng, chain.continuation_letter()));
    }
}
