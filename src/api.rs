//! HTTP API endpoints for process and dictionary info.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::app::AppState;
use crate::protocol::ServerMessage;
use crate::registry::RunInfo;

/// GET /api/runinfo
pub async fn run_info(State(state): State<Arc<AppState>>) -> Json<RunInfo> {
    Json(state.registry.run_info().await)
}

/// GET /api/words/{word}
///
/// Whether the word is accepted, rejected (with the reason when the rejected list
/// carries one) or unknown.
pub async fn word_status(
    State(state): State<Arc<AppState>>,
    Path(word): Path<String>,
) -> Json<ServerMessage> {
    let dict = state.registry.dictionary().snapshot().await;
    Json(ServerMessage::word_status(&word, dict.lookup(&word)))
}
