//! Game constants and environment configuration

use crate::modes::{EliminationPolicy, MixedRotation, RoundBoundary, TieBreak};
use crate::types::UserId;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Fixed game tuning
pub struct GameSettings;

impl GameSettings {
    pub const JOINING_PHASE_SECONDS: i64 = 60;
    pub const MAX_JOINING_PHASE_SECONDS: i64 = 180;
    pub const MIN_PLAYERS: usize = 2;
    pub const MAX_PLAYERS: usize = 50;
    pub const MIN_TURN_SECONDS: i64 = 30;
    pub const MAX_TURN_SECONDS: i64 = 50;
    pub const TURN_SECONDS_REDUCTION_PER_LIMIT_CHANGE: i64 = 5;
    pub const MIN_WORD_LENGTH_LIMIT: usize = 3;
    pub const MAX_WORD_LENGTH_LIMIT: usize = 10;
    pub const WORD_LENGTH_LIMIT_INCREASE_PER_LIMIT_CHANGE: usize = 1;
    pub const TURNS_BETWEEN_LIMITS_CHANGE: u32 = 5;

    pub const ELIM_JOINING_PHASE_SECONDS: i64 = 90;
    pub const ELIM_MIN_PLAYERS: usize = 5;
    pub const ELIM_MAX_PLAYERS: usize = 30;
    pub const ELIM_TURN_SECONDS: i64 = 30;
    pub const ELIM_MAX_TURN_SCORE: u32 = 20;

    pub const DEFAULT_EXTEND_SECONDS: i64 = 30;
    pub const JOIN_REMINDER_MARKS: [i64; 3] = [60, 30, 15];
    /// Written to `time_left` to end the joining phase on the next tick
    pub const IMMEDIATE_EXPIRY: i64 = -99999;
    pub const NEGATIVE_TIMER_TICK_LIMIT: u32 = 5;
    pub const STALE_TIMER_SAMPLES: u32 = 5;
    pub const ADMIN_CACHE_TTL: Duration = Duration::from_secs(15);
}

/// Tunables shared by every session the registry creates
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub tick: Duration,
    pub vp_delay_min: Duration,
    pub vp_delay_max: Duration,
    pub elimination: EliminationPolicy,
    pub mixed_rotation: MixedRotation,
    /// Fixed RNG seed for every session (tests); `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            vp_delay_min: Duration::from_secs(5),
            vp_delay_max: Duration::from_secs(8),
            elimination: EliminationPolicy::default(),
            mixed_rotation: MixedRotation::Random,
            seed: None,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub wordlist_path: PathBuf,
    pub rejected_words_path: Option<PathBuf>,
    /// JSON lines file receiving one record per finished game
    pub records_path: Option<PathBuf>,
    pub owner_id: Option<UserId>,
    pub admin_ids: HashSet<UserId>,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            wordlist_path: PathBuf::from("words.txt"),
            rejected_words_path: None,
            records_path: None,
            owner_id: None,
            admin_ids: HashSet::new(),
            engine: EngineConfig::default(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let addr = non_empty_var("WORDCHAIN_ADDR")
            .and_then(|v| match v.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!("Ignoring invalid WORDCHAIN_ADDR {:?}: {}", v, e);
                    None
                }
            })
            .unwrap_or(defaults.addr);

        let admin_ids = non_empty_var("ADMIN_IDS")
            .map(|v| {
                v.split(',')
                    .filter_map(|id| id.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default();

        let vp_delay_min = non_empty_var("VP_DELAY_MIN_MS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.engine.vp_delay_min);
        let vp_delay_max = non_empty_var("VP_DELAY_MAX_MS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.engine.vp_delay_max)
            .max(vp_delay_min);

        let mut elimination = EliminationPolicy::default();
        if let Some(boundary) = non_empty_var("ELIM_ROUND_BOUNDARY").and_then(|v| parse_boundary(&v))
        {
            elimination.boundary = boundary;
        }
        if let Some(tie_break) = non_empty_var("ELIM_TIE_BREAK").and_then(|v| parse_tie_break(&v)) {
            elimination.tie_break = tie_break;
        }

        let mixed_rotation = match non_empty_var("MIXED_ROTATION").as_deref() {
            Some("cycle") => MixedRotation::Cycle,
            _ => MixedRotation::Random,
        };

        let config = Self {
            addr,
            wordlist_path: non_empty_var("WORDLIST_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.wordlist_path),
            rejected_words_path: non_empty_var("REJECTED_WORDS_PATH").map(PathBuf::from),
            records_path: non_empty_var("GAME_RECORDS_PATH").map(PathBuf::from),
            owner_id: non_empty_var("OWNER_ID").and_then(|v| v.parse().ok()),
            admin_ids,
            engine: EngineConfig {
                vp_delay_min,
                vp_delay_max,
                elimination,
                mixed_rotation,
                ..defaults.engine
            },
        };

        tracing::info!(
            addr = %config.addr,
            wordlist = %config.wordlist_path.display(),
            admins = config.admin_ids.len(),
            boundary = ?config.engine.elimination.boundary,
            tie_break = ?config.engine.elimination.tie_break,
            rotation = ?config.engine.mixed_rotation,
            "Server config loaded"
        );

        config
    }
}

/// "rotation" or a positive turn count
fn parse_boundary(value: &str) -> Option<RoundBoundary> {
    match value.to_lowercase().as_str() {
        "rotation" | "full_rotation" => Some(RoundBoundary::FullRotation),
        other => other
            .parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
            .map(RoundBoundary::EveryTurns),
    }
}

fn parse_tie_break(value: &str) -> Option<TieBreak> {
    match value.to_lowercase().as_str() {
        "all" | "all_lowest" => Some(TieBreak::AllLowest),
        "earliest" | "earliest_in_queue" => Some(TieBreak::EarliestInQueue),
        _ => None,
    }
}
