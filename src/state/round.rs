use super::{GameSession, Notice, TickOutcome};
use crate::config::GameSettings;
use crate::dictionary::WordDictionary;
use crate::error::SessionFault;
use crate::modes::{RuleContext, TurnView};
use crate::types::*;

impl GameSession {
    /// Advance the session by one second
    pub fn tick(&mut self, dict: &WordDictionary) -> Result<TickOutcome, SessionFault> {
        match self.state {
            GameState::Joining => self.joining_tick(dict),
            GameState::Running => self.running_tick(dict),
            GameState::Killed => {
                self.notify("The game has ended forcibly.");
                Ok(TickOutcome::Killed)
            }
        }
    }

    fn joining_tick(&mut self, dict: &WordDictionary) -> Result<TickOutcome, SessionFault> {
        if self.time_left > 0 {
            self.time_left -= 1;
            if GameSettings::JOIN_REMINDER_MARKS.contains(&self.time_left) {
                self.notify(format!("{}s left to /join.", self.time_left));
            }
            return Ok(TickOutcome::Continue);
        }

        if self.roster.len() < self.descriptor().min_players {
            tracing::info!(
                group_id = self.group_id,
                players = self.roster.len(),
                "Not enough players"
            );
            self.notify("Not enough players. The game has been terminated.");
            return Ok(TickOutcome::Cancelled);
        }

        self.start_running(dict)?;
        Ok(TickOutcome::Continue)
    }

    fn running_tick(&mut self, dict: &WordDictionary) -> Result<TickOutcome, SessionFault> {
        if self.time_left < 0 {
            self.negative_ticks += 1;
            if self.negative_ticks >= GameSettings::NEGATIVE_TIMER_TICK_LIMIT {
                return Err(SessionFault::NegativeTimer {
                    ticks: self.negative_ticks,
                });
            }
        } else {
            self.negative_ticks = 0;
        }

        if self.answered {
            self.queue.rotate_left(1);
        } else {
            self.time_left -= 1;
            if self.time_left > 0 {
                return Ok(TickOutcome::Continue);
            }

            self.accepting_answers = false;
            if let Some(user_id) = self.queue.pop_front() {
                let name = self.name_of(user_id);
                tracing::debug!(group_id = self.group_id, user_id, "Turn timed out");
                self.notify(format!("{name} ran out of time! They have been eliminated."));
            }
        }

        if self.rules.elimination().is_some() && self.queue.len() > 1 {
            self.advance_round(dict);
        }

        if self.queue.len() <= 1 {
            return Ok(TickOutcome::Finished(self.finish()));
        }

        self.prompt_turn();
        Ok(TickOutcome::Continue)
    }

    /// Start counting a fresh elimination round from the current queue
    pub(super) fn reset_round(&mut self) {
        if let Some(policy) = self.rules.elimination() {
            self.round.turns_left = policy.round_length(self.queue.len());
            self.round.number += 1;
        }
    }

    /// Count one resolved turn; at a boundary remove the lowest scorers and let the
    /// mode switch its rules
    fn advance_round(&mut self, dict: &WordDictionary) {
        let Some(policy) = self.rules.elimination().copied() else {
            return;
        };
        self.round.turns_left = self.round.turns_left.saturating_sub(1);
        if self.round.turns_left > 0 {
            return;
        }

        let scores: Vec<(UserId, u32)> = self
            .queue
            .iter()
            .map(|&id| (id, self.player(id).map_or(0, |p| p.score)))
            .collect();
        let losers = policy.select_losers(&scores);

        let mut text = format!("Round {} is over.\n", self.round.number);
        text.push_str(
            &scores
                .iter()
                .map(|&(id, score)| format!("{}: {score}", self.name_of(id)))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        if losers.is_empty() {
            text.push_str("\nNobody is eliminated this round.");
        } else {
            let names: Vec<String> = losers.iter().map(|&id| self.name_of(id)).collect();
            text.push_str(&format!("\n{} eliminated.", names.join(", ")));
            self.queue.retain(|id| !losers.contains(id));
        }
        tracing::debug!(
            group_id = self.group_id,
            round = self.round.number,
            eliminated = losers.len(),
            "Elimination round over"
        );
        self.notify(text);

        if self.queue.len() > 1 {
            let announcement = {
                let mut ctx = RuleContext {
                    dict,
                    rng: &mut self.rng,
                };
                self.rules.on_round_boundary(&mut self.chain, &mut ctx)
            };
            if let Some(announcement) = announcement {
                self.notify(announcement);
            }
            self.reset_round();
        }
    }

    /// Announce the new head's turn and reset the per-turn flags
    pub(super) fn prompt_turn(&mut self) {
        let Some(&head) = self.queue.front() else {
            return;
        };
        let current = self.name_of(head);
        let next = self.queue.get(1).map(|&id| self.name_of(id));
        let text = self.rules.turn_prompt(&TurnView {
            chain: &self.chain,
            current: &current,
            next: next.as_deref(),
            time_limit: self.time_limit,
            remaining: self.queue.len(),
            roster: self.roster.len(),
            show_min_length: self.descriptor().enforce_min_length,
        });

        self.answered = false;
        self.accepting_answers = true;
        self.time_left = self.time_limit;
        self.turn_seq += 1;
        self.notices.push(Notice::Turn {
            user_id: head,
            turn: self.turn_seq,
            text,
        });

        if self.player(head).is_some_and(|p| p.is_virtual) {
            self.virtual_request = Some(self.turn_seq);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::EngineConfig;
    use crate::modes::test_support::dictionary;
    use crate::modes::{EliminationPolicy, RoundBoundary};

    fn tick_n(session: &mut GameSession, dict: &WordDictionary, n: usize) -> TickOutcome {
        let mut outcome = TickOutcome::Continue;
        for _ in 0..n {
            outcome = session.tick(dict).unwrap();
        }
        outcome
    }

    #[test]
    fn test_join_countdown_reminders() {
        let dict = dictionary();
        let mut session = session(ModeKind::Classic);
        session.drain_notices();

        tick_n(&mut session, &dict, 45);
        assert_eq!(session.time_left(), 15);
        let texts: Vec<String> = session.drain_notices().iter().map(Notice::text).collect();
        assert_eq!(texts, vec!["30s left to /join.", "15s left to /join."]);
    }

    #[test]
    fn test_not_enough_players_cancels() {
        let dict = dictionary();
        let mut session = joined(ModeKind::Classic, &[1]);
        assert_eq!(session.tick(&dict).unwrap(), TickOutcome::Cancelled);

        let mut session = joined(ModeKind::Elimination, &[1, 2, 3, 4]);
        assert_eq!(session.tick(&dict).unwrap(), TickOutcome::Cancelled);
    }

    #[test]
    fn test_answer_rotates_on_next_tick() {
        let dict = dictionary();
        let mut session = joined(ModeKind::Classic, &[1, 2, 3]);
        session.tick(&dict).unwrap();
        assert_eq!(session.state(), GameState::Running);

        let order = session.turn_queue();
        let letter = session.chain().continuation_letter().unwrap();
        let chain = session.chain().clone();
        let word = dict.sample(&chain.base_query(), session.rng()).unwrap();
        assert!(word.starts_with(letter));

        session.time_left = 7;
        session.submit_answer(order[0], &word, &dict).unwrap();
        session.tick(&dict).unwrap();

        assert_eq!(session.turn_queue(), vec![order[1], order[2], order[0]]);
        assert_eq!(session.time_left(), session.time_limit());
        assert!(!session.answered());
        assert!(session.accepting_answers());
    }

    #[test]
    fn test_timeout_eliminates_head_until_winner() {
        let dict = dictionary();
        let mut session = joined(ModeKind::Classic, &[1, 2, 3]);
        session.tick(&dict).unwrap();
        let order = session.turn_queue();
        session.drain_notices();

        tick_n(&mut session, &dict, 50);
        assert_eq!(session.turn_queue(), vec![order[1], order[2]]);
        let notices = session.drain_notices();
        assert_eq!(
            notices[0].text(),
            format!("P{} ran out of time! They have been eliminated.", order[0])
        );

        let outcome = tick_n(&mut session, &dict, 50);
        let TickOutcome::Finished(record) = outcome else {
            panic!("expected the game to finish");
        };
        assert_eq!(record.winner, Some(order[2]));
        assert_eq!(record.players, 3);
        assert!(record
            .player_records
            .iter()
            .all(|p| p.won == (p.user_id == order[2])));
    }

    #[test]
    fn test_negative_timer_faults_after_five_ticks() {
        let dict = dictionary();
        let mut session = joined(ModeKind::Classic, &[1, 2]);
        session.tick(&dict).unwrap();

        for _ in 0..4 {
            session.time_left = -1;
            session.answered = true;
            assert!(session.tick(&dict).is_ok());
        }
        session.time_left = -1;
        session.answered = true;
        assert_eq!(
            session.tick(&dict),
            Err(SessionFault::NegativeTimer { ticks: 5 })
        );
    }

    #[test]
    fn test_negative_counter_resets_on_healthy_tick() {
        let dict = dictionary();
        let mut session = joined(ModeKind::Classic, &[1, 2]);
        session.tick(&dict).unwrap();

        for _ in 0..10 {
            session.time_left = -1;
            session.answered = true;
            assert!(session.tick(&dict).is_ok());
            // Healthy tick in between
            assert!(session.tick(&dict).is_ok());
        }
    }

    #[test]
    fn test_killed_session_ends_on_next_tick() {
        let dict = dictionary();
        let mut session = joined(ModeKind::Classic, &[1, 2]);
        session.tick(&dict).unwrap();
        session.kill();
        assert_eq!(session.tick(&dict).unwrap(), TickOutcome::Killed);
    }

    #[test]
    fn test_elimination_boundary_removes_lowest_scorer() {
        let dict = dictionary();
        let mut session = joined(ModeKind::Elimination, &[1, 2, 3, 4, 5]);
        session.tick(&dict).unwrap();
        let order = session.turn_queue();

        // Everyone but the first player has already scored
        for (i, &id) in order.iter().enumerate() {
            session.roster.iter_mut().find(|p| p.user_id == id).unwrap().score =
                if i == 0 { 3 } else { 7 };
        }
        for _ in 0..5 {
            session.answered = true;
            session.tick(&dict).unwrap();
        }

        let queue = session.turn_queue();
        assert!(!queue.contains(&order[0]));
        assert_eq!(queue.len(), 4);
        assert!(session
            .drain_notices()
            .iter()
            .any(|n| n.text().contains(&format!("P{} eliminated.", order[0]))));
    }

    #[test]
    fn test_every_turns_boundary() {
        let dict = dictionary();
        let config = EngineConfig {
            elimination: EliminationPolicy {
                boundary: RoundBoundary::EveryTurns(2),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut session = session_with(ModeKind::Elimination, &config);
        for id in 1..=5 {
            session.join(participant(id)).unwrap();
        }
        session.time_left = 0;
        session.tick(&dict).unwrap();
        let order = session.turn_queue();
        session
            .roster
            .iter_mut()
            .find(|p| p.user_id == order[4])
            .unwrap()
            .score = 10;

        for _ in 0..2 {
            session.answered = true;
            session.tick(&dict).unwrap();
        }
        // Four tied at zero go, the leader stays and wins
        assert_eq!(session.turn_queue(), vec![order[4]]);
    }

    #[test]
    fn test_virtual_request_when_vp_is_head() {
        let dict = dictionary();
        let mut session = joined(ModeKind::Classic, &[1]);
        session.time_left = 10;
        session.add_virtual(1, Access::default()).unwrap();
        session.time_left = 0;
        session.tick(&dict).unwrap();

        let vp_first = session.head().is_some_and(|p| p.is_virtual);
        let request = session.take_virtual_request();
        assert_eq!(request.is_some(), vp_first);
        if !vp_first {
            session.answered = true;
            session.tick(&dict).unwrap();
            assert_eq!(session.take_virtual_request(), Some(session.turn_seq()));
        }
    }
}
