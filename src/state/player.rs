use super::{GameSession, Ignored};
use crate::config::GameSettings;
use crate::types::*;

fn player_count_line(n: usize) -> String {
    if n == 1 {
        "There is now 1 player.".to_string()
    } else {
        format!("There are now {n} players.")
    }
}

impl GameSession {
    fn is_full(&self) -> bool {
        self.roster.len() >= self.descriptor().max_players
    }

    fn in_roster(&self, user_id: UserId) -> bool {
        self.roster.iter().any(|p| p.user_id == user_id)
    }

    /// Owner, roster member or group administrator
    fn may_manage(&self, user_id: UserId, access: Access) -> bool {
        access.is_privileged() || self.in_roster(user_id)
    }

    fn push_player(&mut self, player: Player) {
        self.roster.push(player);
        if self.is_full() && self.state == GameState::Joining {
            self.time_left = GameSettings::IMMEDIATE_EXPIRY;
        }
    }

    fn remove_from_roster(&mut self, user_id: UserId) -> Option<Player> {
        let idx = self.roster.iter().position(|p| p.user_id == user_id)?;
        Some(self.roster.remove(idx))
    }

    pub fn join(&mut self, participant: Participant) -> Result<(), Ignored> {
        if self.state != GameState::Joining {
            return Err(Ignored::WrongState);
        }
        if self.is_full() {
            return Err(Ignored::RosterFull);
        }
        if self.time_left < 0 {
            tracing::warn!(
                group_id = self.group_id,
                time_left = self.time_left,
                "Join during negative join timer"
            );
            return Err(Ignored::StaleTimer);
        }
        if self.in_roster(participant.user_id) {
            return Err(Ignored::AlreadyJoined);
        }

        let name = participant.name.clone();
        self.push_player(Player::new(participant));
        self.notify(format!(
            "{name} joined. {}",
            player_count_line(self.roster.len())
        ));
        Ok(())
    }

    /// Join `target` (or the sender). While running the player also enters the live
    /// turn queue.
    pub fn force_join(
        &mut self,
        sender: Participant,
        target: Option<Participant>,
        access: Access,
    ) -> Result<(), Ignored> {
        if self.state == GameState::Killed {
            return Err(Ignored::WrongState);
        }
        if !access.is_privileged() {
            self.reply(sender.user_id, "You are not allowed to do that.");
            return Err(Ignored::NotAllowed);
        }
        if self.is_full() {
            return Err(Ignored::RosterFull);
        }
        let participant = target.unwrap_or(sender);
        if self.in_roster(participant.user_id) {
            return Err(Ignored::AlreadyJoined);
        }

        let user_id = participant.user_id;
        let name = participant.name.clone();
        self.push_player(Player::new(participant));
        if self.state == GameState::Running {
            self.queue.push_back(user_id);
        }
        self.notify(format!(
            "{name} was forced to join. {}",
            player_count_line(self.roster.len())
        ));
        Ok(())
    }

    pub fn leave(&mut self, user_id: UserId) -> Result<(), Ignored> {
        if self.state != GameState::Joining {
            return Err(Ignored::WrongState);
        }
        let player = self.remove_from_roster(user_id).ok_or(Ignored::NotJoined)?;
        self.notify(format!(
            "{} fled. {}",
            player.name,
            player_count_line(self.roster.len())
        ));
        Ok(())
    }

    pub fn force_leave(
        &mut self,
        sender: UserId,
        target: Option<UserId>,
        access: Access,
    ) -> Result<(), Ignored> {
        if self.state != GameState::Joining {
            return Err(Ignored::WrongState);
        }
        let target = target.ok_or(Ignored::NotJoined)?;
        if !access.is_privileged() {
            self.reply(sender, "You are not allowed to do that.");
            return Err(Ignored::NotAllowed);
        }
        let player = self.remove_from_roster(target).ok_or(Ignored::NotJoined)?;
        self.notify(format!(
            "{} was forced to flee. {}",
            player.name,
            player_count_line(self.roster.len())
        ));
        Ok(())
    }

    pub fn add_virtual(&mut self, sender: UserId, access: Access) -> Result<(), Ignored> {
        if self.state != GameState::Joining {
            return Err(Ignored::WrongState);
        }
        if self.is_full() {
            return Err(Ignored::RosterFull);
        }
        if self.roster.iter().any(|p| p.is_virtual) {
            return Err(Ignored::VirtualPresent);
        }
        if !self.may_manage(sender, access) {
            self.reply(sender, "Imagine not playing.");
            return Err(Ignored::NotAllowed);
        }

        self.push_player(Player::virtual_player());
        self.notify(format!(
            "{VIRTUAL_PLAYER_NAME} joined. {}",
            player_count_line(self.roster.len())
        ));
        Ok(())
    }

    pub fn remove_virtual(&mut self, sender: UserId, access: Access) -> Result<(), Ignored> {
        if self.state != GameState::Joining {
            return Err(Ignored::WrongState);
        }
        if !self.roster.iter().any(|p| p.is_virtual) {
            return Err(Ignored::NoVirtual);
        }
        if !self.may_manage(sender, access) {
            self.reply(sender, "Imagine not playing.");
            return Err(Ignored::NotAllowed);
        }

        self.roster.retain(|p| !p.is_virtual);
        self.notify(format!(
            "{VIRTUAL_PLAYER_NAME} fled. {}",
            player_count_line(self.roster.len())
        ));
        Ok(())
    }

    /// Adjust the join timer. Administrators may pass a signed amount (default +30);
    /// everyone else gets one +30 extension per game.
    pub fn extend(
        &mut self,
        sender: UserId,
        amount: Option<i64>,
        access: Access,
    ) -> Result<(), Ignored> {
        if self.state != GameState::Joining {
            return Err(Ignored::WrongState);
        }
        if !self.may_manage(sender, access) {
            self.reply(sender, "Imagine not playing.");
            return Err(Ignored::NotAllowed);
        }

        let amount = if access.is_admin {
            amount.unwrap_or(GameSettings::DEFAULT_EXTEND_SECONDS)
        } else if !self.extended_user_ids.insert(sender) {
            self.reply(sender, "You can only extend once.");
            return Err(Ignored::AlreadyExtended);
        } else {
            GameSettings::DEFAULT_EXTEND_SECONDS
        };

        if amount < 0 {
            let reduction = amount.saturating_abs();
            if reduction >= self.time_left {
                self.time_left = GameSettings::IMMEDIATE_EXPIRY;
            } else {
                self.time_left -= reduction;
                self.notify(format!(
                    "The joining phase has been reduced by {reduction}s.\nYou have {}s to /join.",
                    self.time_left
                ));
            }
        } else {
            let added = amount
                .min(GameSettings::MAX_JOINING_PHASE_SECONDS - self.time_left)
                .max(0);
            self.time_left += added;
            self.notify(format!(
                "The joining phase has been extended by {added}s.\nYou have {}s to /join.",
                self.time_left
            ));
        }
        tracing::debug!(
            group_id = self.group_id,
            sender,
            amount,
            time_left = self.time_left,
            "Join phase extended"
        );
        Ok(())
    }
}
