use super::GameSession;
use crate::dictionary::WordDictionary;
use crate::error::{capitalize, Rejection};
use crate::modes::RuleContext;
use crate::types::*;

/// What the virtual participant did with its turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualMove {
    Answered(String),
    GaveUp,
}

impl GameSession {
    /// Shared checks in order, then the mode's own check. Never mutates.
    fn check_answer(&self, word: &str, dict: &WordDictionary) -> Result<(), Rejection> {
        if self.state != GameState::Running || !self.accepting_answers {
            return Err(Rejection::NotAccepting);
        }
        if let Some(letter) = self.chain.continuation_letter() {
            if !word.starts_with(letter) {
                return Err(Rejection::WrongStart {
                    word: word.to_string(),
                    letter,
                });
            }
        }
        if self.descriptor().enforce_min_length && word.chars().count() < self.chain.min_length {
            return Err(Rejection::TooShort {
                word: word.to_string(),
                min: self.chain.min_length,
            });
        }
        if self.chain.used_words.contains(word) {
            return Err(Rejection::AlreadyUsed {
                word: word.to_string(),
            });
        }
        if !dict.contains_word(word) {
            return Err(Rejection::NotInDictionary {
                word: word.to_string(),
            });
        }
        self.rules.extra_validate(word, &self.chain)
    }

    /// Validate and apply an answer from the current head. Rejections are replied to
    /// the submitter and leave the session untouched.
    pub fn submit_answer(
        &mut self,
        user_id: UserId,
        text: &str,
        dict: &WordDictionary,
    ) -> Result<(), Rejection> {
        let word = text.trim().to_lowercase();
        if let Err(rejection) = self.check_answer(&word, dict) {
            tracing::debug!(
                group_id = self.group_id,
                user_id,
                word = %word,
                reason = %rejection,
                "Answer rejected"
            );
            self.reply(user_id, rejection.to_string());
            return Err(rejection);
        }
        self.accept(word, dict);
        Ok(())
    }

    /// Act for the virtual participant on `turn`. A turn that already moved on is
    /// rejected as not accepting answers.
    pub fn virtual_turn(
        &mut self,
        turn: u64,
        dict: &WordDictionary,
    ) -> Result<VirtualMove, Rejection> {
        if self.state != GameState::Running
            || turn != self.turn_seq
            || !self.accepting_answers
            || !self.head().is_some_and(|p| p.is_virtual)
        {
            return Err(Rejection::NotAccepting);
        }

        let picked = {
            let mut ctx = RuleContext {
                dict,
                rng: &mut self.rng,
            };
            self.rules.pick_auto_answer(&self.chain, &mut ctx)
        };

        let Some(word) = picked else {
            self.notify(format!("{VIRTUAL_PLAYER_NAME} gives up."));
            self.time_left = 0;
            return Ok(VirtualMove::GaveUp);
        };

        self.check_answer(&word, dict)?;
        self.notify(capitalize(&word));
        self.accept(word.clone(), dict);
        Ok(VirtualMove::Answered(word))
    }

    fn accept(&mut self, word: String, dict: &WordDictionary) {
        let Some(&user_id) = self.queue.front() else {
            return;
        };
        let turn_score = self
            .rules
            .elimination()
            .map_or(0, |policy| policy.turn_score(&word));

        self.chain.used_words.insert(word.clone());
        self.chain.turns += 1;
        self.chain.current_word = Some(word.clone());

        if let Some(player) = self.roster.iter_mut().find(|p| p.user_id == user_id) {
            player.record_word(&word, turn_score);
        }
        let len = word.chars().count();
        if self
            .longest_word
            .as_ref()
            .is_none_or(|(longest, _)| len > longest.chars().count())
        {
            self.longest_word = Some((word.clone(), user_id));
        }

        self.answered = true;
        self.accepting_answers = false;

        {
            let mut ctx = RuleContext {
                dict,
                rng: &mut self.rng,
            };
            self.rules.on_accept(&mut self.chain, &mut ctx);
        }

        let mut text = format!("{} is accepted.", capitalize(&word));
        if turn_score > 0 {
            let total = self.player(user_id).map_or(0, |p| p.score);
            text.push_str(&format!("\n+{turn_score} points (total {total})."));
        }

        let limits = self.descriptor().limits;
        let change = limits.apply(
            self.chain.turns,
            &mut self.time_limit,
            &mut self.chain.min_length,
        );
        if let Some((from, to)) = change.time_limit {
            text.push_str(&format!("\nTime limit decreased from {from}s to {to}s."));
        }
        if let Some((from, to)) = change.min_length {
            text.push_str(&format!(
                "\nMinimum letters per word increased from {from} to {to}."
            ));
        }

        tracing::debug!(
            group_id = self.group_id,
            user_id,
            word = %word,
            turns = self.chain.turns,
            "Answer accepted"
        );
        self.notify(text);
    }
}
