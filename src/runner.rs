//! Per-session actor task
//!
//! The runner owns its [`GameSession`] and interleaves the one-second ticker with
//! commands from the mailbox. After every step it drains the session's notices,
//! delivers them, publishes a [`SessionStatus`] and, when the virtual participant
//! became the head, schedules its delayed move.

use crate::config::GameSettings;
use crate::error::SessionFault;
use crate::protocol::ServerMessage;
use crate::registry::{Command, SessionRegistry, SessionStatus};
use crate::state::{GameRecord, GameSession, Ignored, Notice, TickOutcome};
use crate::types::*;
use rand::Rng;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// How the tick loop ended
enum Exit {
    Ended,
    Finished(GameRecord),
}

pub(crate) struct Runner {
    session: GameSession,
    registry: SessionRegistry,
    mailbox: mpsc::Receiver<Command>,
    commands: mpsc::Sender<Command>,
    status: watch::Sender<SessionStatus>,
    watchdog: Option<JoinHandle<()>>,
}

impl Runner {
    pub(crate) fn new(
        session: GameSession,
        registry: SessionRegistry,
        mailbox: mpsc::Receiver<Command>,
        commands: mpsc::Sender<Command>,
        status: watch::Sender<SessionStatus>,
    ) -> Self {
        Self {
            session,
            registry,
            mailbox,
            commands,
            status,
            watchdog: None,
        }
    }

    pub(crate) fn group_id(&self) -> GroupId {
        self.session.group_id()
    }

    pub(crate) async fn run(mut self) {
        let group_id = self.session.group_id();
        let session_id = self.session.session_id().to_string();
        tracing::debug!(group_id, session_id = %session_id, "Runner started");

        self.flush().await;
        let exit = self.tick_loop().await;

        self.registry.remove(group_id, &session_id).await;
        if let Exit::Finished(record) = exit {
            if let Err(e) = self.registry.recorder().record(&record).await {
                tracing::error!(group_id, session_id = %session_id, "Failed to record game: {}", e);
            }
        }
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
        tracing::debug!(group_id, session_id = %session_id, "Runner stopped");
    }

    async fn tick_loop(&mut self) -> Exit {
        let period = self.registry.config().tick;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let dict = self.registry.dictionary().snapshot().await;
                    let outcome = self.session.tick(&dict);
                    self.flush().await;
                    match outcome {
                        Ok(TickOutcome::Continue) => {}
                        Ok(TickOutcome::Cancelled) | Ok(TickOutcome::Killed) => return Exit::Ended,
                        Ok(TickOutcome::Finished(record)) => return Exit::Finished(record),
                        Err(fault) => {
                            self.report_fault(fault).await;
                            return Exit::Ended;
                        }
                    }
                }
                Some(command) = self.mailbox.recv() => {
                    self.handle(command).await;
                    self.flush().await;
                }
            }
        }
    }

    async fn handle(&mut self, command: Command) {
        let group_id = self.session.group_id();
        let ignored = match command {
            Command::Join(participant) => self.session.join(participant),
            Command::Leave(user_id) => self.session.leave(user_id),
            Command::ForceJoin {
                sender,
                target,
                access,
            } => self.session.force_join(sender, target, access),
            Command::ForceLeave {
                sender,
                target,
                access,
            } => self.session.force_leave(sender, target, access),
            Command::Extend {
                sender,
                amount,
                access,
            } => self.session.extend(sender, amount, access),
            Command::AddVirtual { sender, access } => self.session.add_virtual(sender, access),
            Command::RemoveVirtual { sender, access } => {
                self.session.remove_virtual(sender, access)
            }
            Command::Answer { user_id, text } => {
                // Only the current head may answer; everyone else is chatting
                if self.session.is_turn_of(user_id) {
                    let dict = self.registry.dictionary().snapshot().await;
                    let _ = self.session.submit_answer(user_id, &text, &dict);
                }
                Ok(())
            }
            Command::VirtualTurn { turn } => {
                let dict = self.registry.dictionary().snapshot().await;
                match self.session.virtual_turn(turn, &dict) {
                    Ok(played) => tracing::debug!(group_id, turn, ?played, "Virtual move"),
                    Err(rejection) => {
                        tracing::debug!(group_id, turn, reason = %rejection, "Virtual move dropped")
                    }
                }
                Ok(())
            }
            Command::Kill => {
                self.session.kill();
                Ok(())
            }
        };

        match ignored {
            Ok(()) => {}
            Err(Ignored::StaleTimer) => self.spawn_watchdog(),
            Err(reason) => tracing::debug!(group_id, ?reason, "Command ignored"),
        }
    }

    /// Deliver pending notices, publish status and schedule the virtual participant
    async fn flush(&mut self) {
        let group_id = self.session.group_id();
        for notice in self.session.drain_notices() {
            let msg = match notice {
                Notice::Group(text) => ServerMessage::Notice { group_id, text },
                Notice::Reply { user_id, text } => ServerMessage::Reply {
                    group_id,
                    user_id,
                    text,
                },
                Notice::Turn {
                    user_id,
                    turn,
                    text,
                } => ServerMessage::Turn {
                    group_id,
                    user_id,
                    turn,
                    text,
                },
                Notice::GameOver(summary) => ServerMessage::GameOver {
                    group_id,
                    text: summary.text(),
                    summary,
                },
            };
            if let Err(e) = self.registry.messenger().deliver(msg).await {
                tracing::debug!(group_id, "Failed to deliver message: {}", e);
            }
        }

        self.status.send_replace(SessionStatus::of(&self.session));

        if let Some(turn) = self.session.take_virtual_request() {
            self.schedule_virtual_turn(turn);
        }
    }

    fn schedule_virtual_turn(&mut self, turn: u64) {
        let config = self.registry.config();
        let min = millis(config.vp_delay_min);
        let max = millis(config.vp_delay_max).max(min);
        let delay = Duration::from_millis(self.session.rng().random_range(min..=max));
        let commands = self.commands.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Session may be gone by now
            let _ = commands.send(Command::VirtualTurn { turn }).await;
        });
    }

    fn spawn_watchdog(&mut self) {
        if self.watchdog.as_ref().is_some_and(|w| !w.is_finished()) {
            return;
        }
        self.watchdog = Some(tokio::spawn(watch_timer(
            self.registry.clone(),
            self.session.group_id(),
            self.session.session_id().to_string(),
            self.status.subscribe(),
        )));
    }

    async fn report_fault(&mut self, fault: SessionFault) {
        let group_id = self.session.group_id();
        tracing::error!(
            group_id,
            session_id = %self.session.session_id(),
            mode = ?self.session.mode(),
            "Session fault: {}",
            fault
        );
        self.registry
            .end_with_fault(group_id, self.session.session_id(), &fault)
            .await;
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Sample the published timer once per second. A session whose timer neither moves
/// from a non-negative value nor leaves its state is terminated.
async fn watch_timer(
    registry: SessionRegistry,
    group_id: GroupId,
    session_id: SessionId,
    mut status: watch::Receiver<SessionStatus>,
) {
    let start = status.borrow_and_update().clone();
    tracing::warn!(group_id, time_left = start.time_left, "Watching join timer");

    for _ in 0..GameSettings::STALE_TIMER_SAMPLES {
        tokio::time::sleep(Duration::from_secs(1)).await;
        if status.has_changed().is_err() {
            return;
        }
        let now = status.borrow_and_update().clone();
        if now.state != start.state || now.state == GameState::Killed {
            return;
        }
        if start.time_left >= 0 && now.time_left != start.time_left {
            return;
        }
    }

    registry.terminate_stale(group_id, &session_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::BroadcastMessenger;
    use crate::config::EngineConfig;
    use crate::dictionary::DictionaryHandle;
    use crate::modes::build_rules;
    use crate::modes::test_support::{dictionary, rng};
    use crate::broadcast::Messenger;
    use crate::error::DeliveryError;
    use crate::record::NullRecorder;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Panics on its third delivery and records everything else
    #[derive(Default)]
    struct FlakyMessenger {
        calls: AtomicUsize,
        notices: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Messenger for FlakyMessenger {
        async fn deliver(&self, msg: ServerMessage) -> Result<(), DeliveryError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 2 {
                panic!("transport exploded");
            }
            if let ServerMessage::Notice { text, .. } = msg {
                self.notices.lock().unwrap().push(text);
            }
            Ok(())
        }
    }

    fn registry(messenger: Arc<BroadcastMessenger>) -> SessionRegistry {
        SessionRegistry::new(
            DictionaryHandle::from_dictionary(dictionary()),
            messenger,
            Arc::new(NullRecorder),
            EngineConfig {
                seed: Some(3),
                ..EngineConfig::default()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_leaves_moving_timer_alone() {
        let registry = registry(Arc::new(BroadcastMessenger::default()));
        registry
            .create(-1, ModeKind::Classic, Participant::new(1, "Alice"))
            .await
            .unwrap();
        let session_id = registry.status(-1).await.unwrap().session_id;

        // Status receiver of a live runner: the join timer counts down
        let status = {
            let sessions = registry.clone();
            let (tx, rx) = watch::channel(sessions.status(-1).await.unwrap());
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    if let Some(status) = sessions.status(-1).await {
                        tx.send_replace(status);
                    }
                }
            });
            rx
        };

        watch_timer(registry.clone(), -1, session_id, status).await;
        assert!(registry.contains(-1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_terminates_frozen_timer() {
        let messenger = Arc::new(BroadcastMessenger::default());
        let mut rx = messenger.subscribe();
        let registry = registry(messenger);
        registry
            .create(-1, ModeKind::Classic, Participant::new(1, "Alice"))
            .await
            .unwrap();
        let session_id = registry.status(-1).await.unwrap().session_id;

        let mut session = GameSession::new(
            -1,
            build_rules(ModeKind::Classic, registry.config()),
            rng(1),
        );
        session.drain_notices();
        let (_frozen_tx, frozen_rx) = watch::channel(SessionStatus::of(&session));

        watch_timer(registry.clone(), -1, session_id, frozen_rx).await;
        assert!(!registry.contains(-1).await);

        let mut saw_stuck = false;
        while let Ok(msg) = rx.try_recv() {
            if let ServerMessage::Notice { text, .. } = msg {
                saw_stuck |= text.starts_with("Game timer is stuck.");
            }
        }
        assert!(saw_stuck);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_runner_frees_group() {
        let messenger = Arc::new(FlakyMessenger::default());
        let registry = SessionRegistry::new(
            DictionaryHandle::from_dictionary(dictionary()),
            messenger.clone(),
            Arc::new(NullRecorder),
            EngineConfig {
                seed: Some(3),
                ..EngineConfig::default()
            },
        );
        registry
            .create(-1, ModeKind::Classic, Participant::new(1, "Alice"))
            .await
            .unwrap();
        let _ = registry
            .send(-1, Command::Join(Participant::new(2, "Bob")))
            .await;
        let _ = registry
            .send(-1, Command::Join(Participant::new(3, "Carol")))
            .await;
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(!registry.contains(-1).await);
        assert!(matches!(
            registry.kill(-1).await,
            Err(crate::error::RegistryError::NotFound(-1))
        ));
        let last = messenger.notices.lock().unwrap().last().cloned();
        assert_eq!(
            last.as_deref(),
            Some("The game has ended due to an error: Internal error: transport exploded")
        );

        registry
            .create(-1, ModeKind::Classic, Participant::new(1, "Alice"))
            .await
            .unwrap();
        assert!(registry.contains(-1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_kill_ends_runner() {
        let messenger = Arc::new(BroadcastMessenger::default());
        let mut rx = messenger.subscribe();
        let registry = registry(messenger);
        registry
            .create(-1, ModeKind::Classic, Participant::new(1, "Alice"))
            .await
            .unwrap();

        registry.kill(-1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!registry.contains(-1).await);

        let mut texts = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let ServerMessage::Notice { text, .. } = msg {
                texts.push(text);
            }
        }
        assert_eq!(
            texts.last().map(String::as_str),
            Some("The game has ended forcibly.")
        );
    }
}
