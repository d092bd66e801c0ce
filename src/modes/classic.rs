use super::{
    first_word_line, pick_starting_word, render_prompt, ChainState, GameModeRules,
    ModeDescriptor, RuleContext, TurnView,
};
use crate::error::{Rejection, SessionFault};
use crate::types::ModeKind;

/// Baseline word chain: start with the last letter of the previous word
#[derive(Debug, Clone)]
pub struct Classic {
    descriptor: ModeDescriptor,
}

impl Classic {
    pub fn new() -> Self {
        Self {
            descriptor: ModeDescriptor::classic_family(ModeKind::Classic, "classic game"),
        }
    }
}

impl Default for Classic {
    fn default() -> Self {
        Self::new()
    }
}

impl GameModeRules for Classic {
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
        Ok(first_word_line(chain))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::test_support::{dictionary, rng};

    #[test]
    fn test_round_init_picks_long_enough_start_word() {
        let dict = dictionary();
        let mut rng = rng(3);
        let mut ctx = RuleContext {
            dict: &dict,
            rng: &mut rng,
        };
        let mut chain = ChainState::new(5);
        let text = Classic::new().round_init(&mut chain, &mut ctx).unwrap();

        let word = chain.current_word.clone().unwrap();
        assert!(word.chars().count() >= 5);
        assert!(chain.used_words.contains(&word));
        assert!(text.starts_with("The first word is "));
    }

    #[test]
    fn test_round_init_faults_without_candidates() {
        let dict = dictionary();
        let mut rng = rng(3);
        let mut ctx = RuleContext {
            dict: &dict,
            rng: &mut rng,
        };
        let mut chain = ChainState::new(30);
        assert_eq!(
            Classic::new().round_init(&mut chain, &mut ctx),
            Err(SessionFault::NoStartingWord {
                mode: ModeKind::Classic
            })
        );
    }

    #[test]
    fn test_auto_answer_follows_chain() {
        let dict = dictionary();
        let mut rng = rng(9);
        let mut ctx = RuleContext {
            dict: &dict,
            rng: &mut rng,
        };
        let mut chain = ChainState::new(3);
        chain.current_word = Some("apple".into());
        chain.used_words.insert("apple".into());
        chain.used_words.insert("eagle".into());

        for _ in 0..20 {
            let word = Classic::new().pick_auto_answer(&chain, &mut ctx).unwrap();
            assert!(word.starts_with('e'));
            assert_ne!(word, "eagle");
            assert!(word.len() >= 3);
        }
    }
}
