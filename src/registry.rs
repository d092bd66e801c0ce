//! Process-wide table of active sessions, at most one per group

use crate::broadcast::Messenger;
use crate::config::EngineConfig;
use crate::dictionary::DictionaryHandle;
use crate::error::{RegistryError, SessionFault};
use crate::modes::build_rules;
use crate::protocol::ServerMessage;
use crate::record::GameRecorder;
use crate::runner::Runner;
use crate::state::GameSession;
use crate::types::*;
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::AbortHandle;

const MAILBOX_CAPACITY: usize = 64;

/// Inbound operation for one session, applied by its runner in arrival order
#[derive(Debug, Clone)]
pub enum Command {
    Join(Participant),
    Leave(UserId),
    ForceJoin {
        sender: Participant,
        target: Option<Participant>,
        access: Access,
    },
    ForceLeave {
        sender: UserId,
        target: Option<UserId>,
        access: Access,
    },
    Extend {
        sender: UserId,
        amount: Option<i64>,
        access: Access,
    },
    AddVirtual {
        sender: UserId,
        access: Access,
    },
    RemoveVirtual {
        sender: UserId,
        access: Access,
    },
    Answer {
        user_id: UserId,
        text: String,
    },
    /// Posted by the virtual participant driver once its delay elapsed
    VirtualTurn {
        turn: u64,
    },
    Kill,
}

/// Snapshot published by a runner after every step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub group_id: GroupId,
    pub session_id: SessionId,
    pub mode: ModeKind,
    pub state: GameState,
    pub time_left: i64,
    pub players: usize,
    pub queue_len: usize,
    pub turns: u32,
}

impl SessionStatus {
    pub fn of(session: &GameSession) -> Self {
        Self {
            group_id: session.group_id(),
            session_id: session.session_id().to_string(),
            mode: session.mode(),
            state: session.state(),
            time_left: session.time_left(),
            players: session.roster().len(),
            queue_len: session.turn_queue().len(),
            turns: session.turns(),
        }
    }
}

/// Process statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub total_games: u64,
    pub running_games: usize,
    pub players: usize,
}

struct SessionHandle {
    session_id: SessionId,
    tx: mpsc::Sender<Command>,
    status: watch::Receiver<SessionStatus>,
    abort: AbortHandle,
}

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<GroupId, SessionHandle>>>,
    games_started: Arc<AtomicU64>,
    dictionary: DictionaryHandle,
    messenger: Arc<dyn Messenger>,
    recorder: Arc<dyn GameRecorder>,
    config: EngineConfig,
}

impl SessionRegistry {
    pub fn new(
        dictionary: DictionaryHandle,
        messenger: Arc<dyn Messenger>,
        recorder: Arc<dyn GameRecorder>,
        config: EngineConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            games_started: Arc::new(AtomicU64::new(0)),
            dictionary,
            messenger,
            recorder,
            config,
        }
    }

    pub fn dictionary(&self) -> &DictionaryHandle {
        &self.dictionary
    }

    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.messenger
    }

    pub fn recorder(&self) -> &Arc<dyn GameRecorder> {
        &self.recorder
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a session for `group_id` and spawn its runner. The starter joins
    /// immediately.
    pub async fn create(
        &self,
        group_id: GroupId,
        mode: ModeKind,
        starter: Participant,
    ) -> Result<SessionId, RegistryError> {
        // Held across spawn + insert so the runner can never deregister first
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&group_id) {
            return Err(RegistryError::AlreadyRunning(group_id));
        }

        let count = self.games_started.fetch_add(1, Ordering::SeqCst);
        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(count)),
            None => StdRng::from_os_rng(),
        };
        let mut session = GameSession::new(group_id, build_rules(mode, &self.config), rng);
        // Fresh session: joining, empty roster, positive timer
        let _ = session.join(starter);
        let session_id = session.session_id().to_string();

        let (tx, mailbox) = mpsc::channel(MAILBOX_CAPACITY);
        let (status_tx, status) = watch::channel(SessionStatus::of(&session));
        let runner = Runner::new(session, self.clone(), mailbox, tx.clone(), status_tx);
        let abort = tokio::spawn(self.clone().supervise(runner, session_id.clone()))
            .abort_handle();

        sessions.insert(
            group_id,
            SessionHandle {
                session_id: session_id.clone(),
                tx,
                status,
                abort,
            },
        );
        tracing::info!(group_id, session_id = %session_id, ?mode, "Game created");
        Ok(session_id)
    }

    /// Drive a runner to completion. A panicking runner is treated as an internal
    /// fault so the group is freed.
    async fn supervise(self, runner: Runner, session_id: SessionId) {
        let group_id = runner.group_id();
        if let Err(panic) = AssertUnwindSafe(runner.run()).catch_unwind().await {
            let fault = SessionFault::Internal(panic_message(&*panic));
            tracing::error!(group_id, session_id = %session_id, "Runner panicked: {}", fault);
            self.end_with_fault(group_id, &session_id, &fault).await;
        }
    }

    /// Deregister a faulted session and tell the group
    pub(crate) async fn end_with_fault(
        &self,
        group_id: GroupId,
        session_id: &str,
        fault: &SessionFault,
    ) {
        self.remove(group_id, session_id).await;
        let msg = ServerMessage::Notice {
            group_id,
            text: format!("The game has ended due to an error: {fault}"),
        };
        if let Err(e) = self.messenger.deliver(msg).await {
            tracing::warn!(group_id, "Failed to deliver fault notice: {}", e);
        }
    }

    pub async fn contains(&self, group_id: GroupId) -> bool {
        self.sessions.read().await.contains_key(&group_id)
    }

    /// Latest status published by the group's runner
    pub async fn status(&self, group_id: GroupId) -> Option<SessionStatus> {
        self.sessions
            .read()
            .await
            .get(&group_id)
            .map(|handle| handle.status.borrow().clone())
    }

    /// Queue a command for the group's session
    pub async fn send(&self, group_id: GroupId, command: Command) -> Result<(), RegistryError> {
        let tx = self
            .sessions
            .read()
            .await
            .get(&group_id)
            .map(|handle| handle.tx.clone())
            .ok_or(RegistryError::NotFound(group_id))?;
        tx.send(command)
            .await
            .map_err(|_| RegistryError::Closed(group_id))
    }

    pub async fn kill(&self, group_id: GroupId) -> Result<(), RegistryError> {
        self.send(group_id, Command::Kill).await
    }

    /// Deregister a session. A newer session of the same group is left alone.
    pub(crate) async fn remove(&self, group_id: GroupId, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(&group_id)
            .is_some_and(|handle| handle.session_id == session_id)
        {
            sessions.remove(&group_id);
            tracing::info!(group_id, session_id, "Game removed");
            true
        } else {
            false
        }
    }

    /// Abort a runner whose timer stopped moving and tell the group
    pub(crate) async fn terminate_stale(&self, group_id: GroupId, session_id: &str) {
        let handle = {
            let mut sessions = self.sessions.write().await;
            if sessions
                .get(&group_id)
                .is_some_and(|handle| handle.session_id == session_id)
            {
                sessions.remove(&group_id)
            } else {
                None
            }
        };
        let Some(handle) = handle else {
            return;
        };

        handle.abort.abort();
        tracing::error!(group_id, session_id, "Game timer is stuck, session aborted");

        let msg = ServerMessage::Notice {
            group_id,
            text: format!("{} The game has been terminated.", SessionFault::StaleTimer),
        };
        if let Err(e) = self.messenger.deliver(msg).await {
            tracing::warn!(group_id, "Failed to deliver stale timer notice: {}", e);
        }
    }

    pub async fn run_info(&self) -> RunInfo {
        let sessions = self.sessions.read().await;
        RunInfo {
            total_games: self.games_started.load(Ordering::SeqCst),
            running_games: sessions.len(),
            players: sessions
                .values()
                .map(|handle| handle.status.borrow().players)
                .sum(),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "runner panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::BroadcastMessenger;
    use crate::modes::test_support::dictionary;
    use crate::record::NullRecorder;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(
            DictionaryHandle::from_dictionary(dictionary()),
            Arc::new(BroadcastMessenger::default()),
            Arc::new(NullRecorder),
            EngineConfig {
                seed: Some(7),
                ..EngineConfig::default()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_session_per_group() {
        let registry = registry();
        registry
            .create(-1, ModeKind::Classic, Participant::new(1, "Alice"))
            .await
            .unwrap();

        let again = registry
            .create(-1, ModeKind::Elimination, Participant::new(2, "Bob"))
            .await;
        assert!(matches!(again, Err(RegistryError::AlreadyRunning(-1))));

        registry
            .create(-2, ModeKind::Elimination, Participant::new(2, "Bob"))
            .await
            .unwrap();

        let info = registry.run_info().await;
        assert_eq!(info.total_games, 2);
        assert_eq!(info.running_games, 2);
        assert_eq!(info.players, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_to_missing_group() {
        let registry = registry();
        assert!(matches!(
            registry.kill(-5).await,
            Err(RegistryError::NotFound(-5))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_checks_session_id() {
        let registry = registry();
        let session_id = registry
            .create(-1, ModeKind::Classic, Participant::new(1, "Alice"))
            .await
            .unwrap();

        assert!(!registry.remove(-1, "someone-else").await);
        assert!(registry.contains(-1).await);
        assert!(registry.remove(-1, &session_id).await);
        assert!(!registry.contains(-1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_reflects_starter() {
        let registry = registry();
        registry
            .create(-1, ModeKind::Classic, Participant::new(1, "Alice"))
            .await
            .unwrap();

        let status = registry.status(-1).await.unwrap();
        assert_eq!(status.state, GameState::Joining);
        assert_eq!(status.players, 1);
        assert_eq!(status.time_left, 60);
        assert_eq!(status.mode, ModeKind::Classic);
    }
}
