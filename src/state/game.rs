use super::{GameRecord, GameSession, GameSummary, Notice, PlayerRecord};
use crate::dictionary::WordDictionary;
use crate::error::SessionFault;
use crate::modes::RuleContext;
use crate::types::*;
use chrono::Utc;
use rand::seq::SliceRandom;

impl GameSession {
    /// JOINING -> RUNNING: shuffle the roster into the turn queue, let the mode pick
    /// its starting word and prompt the first player
    pub(super) fn start_running(&mut self, dict: &WordDictionary) -> Result<(), SessionFault> {
        self.state = GameState::Running;
        self.notify("The game is starting...");

        self.roster.shuffle(&mut self.rng);
        self.queue = self.roster.iter().map(|p| p.user_id).collect();
        self.started_at = Some(Utc::now());

        let opening = {
            let mut ctx = RuleContext {
                dict,
                rng: &mut self.rng,
            };
            self.rules.round_init(&mut self.chain, &mut ctx)?
        };
        let order: Vec<&str> = self.roster.iter().map(|p| p.name.as_str()).collect();
        let text = format!("{opening}\n\nTurn order:\n{}", order.join("\n"));
        self.notify(text);

        tracing::info!(
            group_id = self.group_id,
            session_id = %self.session_id,
            mode = ?self.mode(),
            players = self.roster.len(),
            dictionary_version = dict.version(),
            "Game running"
        );

        self.reset_round();
        self.prompt_turn();
        Ok(())
    }

    /// Close a game that ran: emit the summary and build its record. The winner is
    /// the last player in the turn queue, if any.
    pub(super) fn finish(&mut self) -> GameRecord {
        let end_time = Utc::now();
        let start_time = self.started_at.unwrap_or(end_time);
        let winner = self.queue.front().copied();

        let summary = GameSummary {
            winner: winner.map(|id| self.name_of(id)),
            players: self.roster.len(),
            turns: self.chain.turns,
            longest_word: self
                .longest_word
                .as_ref()
                .map(|(word, owner)| (word.clone(), self.name_of(*owner))),
            duration_secs: (end_time - start_time).num_seconds().max(0),
        };
        self.notices.push(Notice::GameOver(summary));

        tracing::info!(
            group_id = self.group_id,
            session_id = %self.session_id,
            winner = ?winner,
            turns = self.chain.turns,
            "Game finished"
        );

        GameRecord {
            session_id: self.session_id.clone(),
            group_id: self.group_id,
            players: self.roster.len(),
            mode: self.mode(),
            winner,
            start_time,
            end_time,
            player_records: self
                .roster
                .iter()
                .map(|p| PlayerRecord {
                    user_id: p.user_id,
                    name: p.name.clone(),
                    is_virtual: p.is_virtual,
                    won: self.queue.contains(&p.user_id),
                    word_count: p.word_count,
                    letter_count: p.letter_count,
                    longest_word: p.longest_word.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::TickOutcome;
    use super::*;
    use crate::modes::test_support::dictionary;

    #[test]
    fn test_start_shuffles_roster_into_queue_and_prompts() {
        let dict = dictionary();
        let mut session = joined(ModeKind::Classic, &[1, 2, 3]);
        session.drain_notices();
        assert_eq!(session.tick(&dict).unwrap(), TickOutcome::Continue);

        assert_eq!(session.state(), GameState::Running);
        let roster_order: Vec<_> = session.roster().iter().map(|p| p.user_id).collect();
        assert_eq!(session.turn_queue(), roster_order);

        let start = session.chain().current_word.clone().unwrap();
        assert!(start.chars().count() >= 3);
        assert!(session.chain().used_words.contains(&start));

        let notices = session.drain_notices();
        assert_eq!(notices[0].text(), "The game is starting...");
        assert!(notices[1].text().contains("Turn order:\nP"));
        let Notice::Turn { user_id, text, .. } = &notices[2] else {
            panic!("expected a turn prompt");
        };
        assert_eq!(*user_id, roster_order[0]);
        let last = start.chars().last().unwrap().to_ascii_uppercase();
        assert!(text.starts_with(&format!("Turn: P{} (Next: P{})", roster_order[0], roster_order[1])));
        assert!(text.contains(&format!("start with {last}")));
    }

    #[test]
    fn test_start_faults_without_a_starting_word() {
        let dict = WordDictionary::build(1, ["ox"]);
        let mut session = joined(ModeKind::Classic, &[1, 2]);
        assert_eq!(
            session.tick(&dict),
            Err(SessionFault::NoStartingWord {
                mode: ModeKind::Classic
            })
        );
    }

    #[test]
    fn test_summary_names_longest_word_owner() {
        let dict = dictionary();
        let mut session = joined(ModeKind::Classic, &[1, 2]);
        session.tick(&dict).unwrap();
        let head = session.turn_queue()[0];
        session.longest_word = Some(("xylophone".into(), head));
        session.chain.turns = 12;
        session.queue.retain(|&id| id == head);

        let record = session.finish();
        assert_eq!(record.winner, Some(head));

        let summary = session
            .drain_notices()
            .into_iter()
            .find_map(|n| match n {
                Notice::GameOver(summary) => Some(summary),
                _ => None,
            })
            .unwrap();
        assert_eq!(summary.turns, 12);
        assert_eq!(
            summary.longest_word,
            Some(("xylophone".to_string(), format!("P{head}")))
        );
        assert!(summary
            .text()
            .starts_with(&format!("P{head} won the game out of 2 players!")));
    }
}
