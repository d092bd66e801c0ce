use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordchain::{
    app::{self, AppState},
    auth::{AdminCheck, CachedAdminCheck, StaticAdmins},
    broadcast::BroadcastMessenger,
    config::ServerConfig,
    dictionary::{Corpus, DictionaryHandle},
    record::{GameRecorder, JsonlRecorder, NullRecorder},
    registry::SessionRegistry,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordchain=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting wordchain...");

    let config = ServerConfig::from_env();

    let corpus = match Corpus::load(&config.wordlist_path, config.rejected_words_path.as_deref())
        .await
    {
        Ok(corpus) => corpus,
        Err(e) => {
            tracing::error!(path = %config.wordlist_path.display(), "Failed to load word list: {}", e);
            std::process::exit(1);
        }
    };
    let dictionary = match DictionaryHandle::new(corpus) {
        Ok(dictionary) => dictionary,
        Err(e) => {
            tracing::error!("Failed to build dictionary: {}", e);
            std::process::exit(1);
        }
    };

    let recorder: Arc<dyn GameRecorder> = match &config.records_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Recording finished games");
            Arc::new(JsonlRecorder::new(path))
        }
        None => Arc::new(NullRecorder),
    };

    let messenger = Arc::new(BroadcastMessenger::new(1024));
    let admins: Arc<dyn AdminCheck> = Arc::new(CachedAdminCheck::new(StaticAdmins::new(
        config.admin_ids.iter().copied(),
    )));

    let registry = SessionRegistry::new(dictionary, messenger.clone(), recorder, config.engine);
    let state = Arc::new(AppState::new(
        registry,
        messenger,
        admins,
        config.owner_id,
    ));

    let app = app::router(state);

    tracing::info!("Listening on http://{}", config.addr);
    let listener = match tokio::net::TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
