//! Shared gateway state and HTTP routing

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::AdminCheck;
use crate::broadcast::BroadcastMessenger;
use crate::registry::SessionRegistry;
use crate::types::UserId;
use crate::{api, ws};

pub struct AppState {
    pub registry: SessionRegistry,
    /// Same messenger the registry delivers through; connections subscribe here
    pub messenger: Arc<BroadcastMessenger>,
    pub admins: Arc<dyn AdminCheck>,
    pub owner_id: Option<UserId>,
}

impl AppState {
    pub fn new(
        registry: SessionRegistry,
        messenger: Arc<BroadcastMessenger>,
        admins: Arc<dyn AdminCheck>,
        owner_id: Option<UserId>,
    ) -> Self {
        Self {
            registry,
            messenger,
            admins,
            owner_id,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/runinfo", get(api::run_info))
        .route("/api/words/{word}", get(api::word_status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
