use super::{
    first_word_line, pick_starting_word, render_prompt, ChainState, GameModeRules,
    ModeDescriptor, RuleContext, TurnView, ALPHABET, VOWELS,
};
use crate::error::{upper_list, Rejection, SessionFault};
use crate::types::ModeKind;
use rand::seq::IndexedRandom;
use rand::Rng;

/// Answers must avoid 2-4 banned letters, at most one of them a vowel
#[derive(Debug, Clone)]
pub struct BannedLetters {
    descriptor: ModeDescriptor,
}

impl BannedLetters {
    pub fn new() -> Self {
        Self {
            descriptor: ModeDescriptor::classic_family(
                ModeKind::BannedLetters,
                "banned letters game",
            ),
        }
    }
}

impl Default for BannedLetters {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw 2-4 banned letters, never `exclude`. Drawing a vowel takes every vowel out of
/// the pool, drawing a consonant takes out only that letter. Sorted.
pub fn pick_banned_letters<R: Rng + ?Sized>(rng: &mut R, exclude: Option<char>) -> Vec<char> {
    let mut pool: Vec<char> = ALPHABET
        .iter()
        .copied()
        .filter(|&c| Some(c) != exclude)
        .collect();
    let count = rng.random_range(2..=4);
    let mut banned = Vec::with_capacity(count);
    for _ in 0..count {
        let Some(&letter) = pool.choose(rng) else {
            break;
        };
        banned.push(letter);
        if VOWELS.contains(&letter) {
            pool.retain(|c| !VOWELS.contains(c));
        } else {
            pool.retain(|&c| c != letter);
        }
    }
    banned.sort_unstable();
    banned
}

impl GameModeRules for BannedLetters {
    fn descriptor(&self) -> &ModeDescriptor {
        &self.descriptor
    }

    fn round_init(
        &self,
        chain: &mut ChainState,
        ctx: &mut RuleContext<'_>,
    ) -> Result<String, SessionFault> {
        self.enter_round(chain, ctx);
        let banned = chain.banned_letters.clone();
        pick_starting_word(self.descriptor.kind, chain, ctx, &banned)?;
        Ok(format!(
            "{}\nBanned letters: {}",
            first_word_line(chain),
            upper_list(&chain.banned_letters)
        ))
    }

    fn enter_round(&self, chain: &mut ChainState, ctx: &mut RuleContext<'_>) {
        chain.clear_round_constraints();
        chain.banned_letters = pick_banned_letters(ctx.rng, chain.continuation_letter());
    }

    fn turn_prompt(&self, view: &TurnView<'_>) -> String {
        let exclude = format!("exclude {}", upper_list(&view.chain.banned_letters));
        render_prompt(view, &[exclude])
    }

    fn extra_validate(&self, word: &str, chain: &ChainState) -> Result<(), Rejection> {
        let used: Vec<char> = chain
            .banned_letters
            .iter()
            .copied()
            .filter(|&c| word.contains(c))
            .collect();
        if used.is_empty() {
            Ok(())
        } else {
            Err(Rejection::BannedLetters {
                word: word.to_string(),
                letters: used,
            })
        }
    }

    fn pick_auto_answer(&self, chain: &ChainState, ctx: &mut RuleContext<'_>) -> Option<String> {
        let query = chain.base_query().banned(&chain.banned_letters);
        ctx.dict.sample(&query, ctx.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::test_support::{dictionary, rng};

    #[test]
    fn test_banned_letter_sets_are_well_formed() {
        let mut rng = rng(11);
        for i in 0..2000 {
            let exclude = ALPHABET.get(i % 26).copied();
            let banned = pick_banned_letters(&mut rng, exclude);
            assert!((2..=4).contains(&banned.len()), "{banned:?}");
            assert!(banned.iter().filter(|c| VOWELS.contains(c)).count() <= 1);
            assert!(!banned.contains(&exclude.unwrap()));
            let mut dedup = banned.clone();
            dedup.dedup();
            assert_eq!(dedup, banned);
            assert!(banned.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_extra_validate_reports_used_letters() {
        let mut chain = ChainState::new(3);
        chain.banned_letters = vec!['a', 't', 'x'];
        let rules = BannedLetters::new();

        assert_eq!(
            rules.extra_validate("tax", &chain),
            Err(Rejection::BannedLetters {
                word: "tax".into(),
                letters: vec!['a', 't', 'x']
            })
        );
        assert!(rules.extra_validate("eel", &chain).is_ok());
    }

    #[test]
    fn test_start_word_and_auto_answer_avoid_banned_letters() {
        let dict = dictionary();
        for seed in 0..30 {
            let mut rng = rng(seed);
            let mut ctx = RuleContext {
                dict: &dict,
                rng: &mut rng,
            };
            let mut chain = ChainState::new(3);
            let rules = BannedLetters::new();
            let Ok(_) = rules.round_init(&mut chain, &mut ctx) else {
                continue;
            };
            let start = chain.current_word.clone().unwrap();
            assert!(rules.extra_validate(&start, &chain).is_ok());

            if let Some(word) = rules.pick_auto_answer(&chain, &mut ctx) {
                assert!(rules.extra_validate(&word, &chain).is_ok());
                assert_eq!(word.chars().next(), chain.continuation_letter());
            }
        }
    }

    #[test]
    fn test_prompt_lists_banned_letters() {
        let mut chain = ChainState::new(3);
        chain.current_word = Some("tiger".into());
        chain.banned_letters = vec!['e', 's'];
        let view = TurnView {
            chain: &chain,
            current: "Alice",
            next: Some("Bob"),
            time_limit: 50,
            remaining: 2,
            roster: 2,
            show_min_length: true,
        };
        let prompt = BannedLetters::new().turn_prompt(&view);
        assert!(prompt.contains("start with R, exclude E, S and contain at least 3 letters"));
    }
}
