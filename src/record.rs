//! Persistence of finished games

use crate::error::RecordError;
use crate::state::GameRecord;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Receives one record per game that actually ran
#[async_trait]
pub trait GameRecorder: Send + Sync {
    async fn record(&self, record: &GameRecord) -> Result<(), RecordError>;
}

/// Appends each record as one JSON line
#[derive(Debug)]
pub struct JsonlRecorder {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl GameRecorder for JsonlRecorder {
    async fn record(&self, record: &GameRecord) -> Result<(), RecordError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::info!(
            group_id = record.group_id,
            session_id = %record.session_id,
            path = %self.path.display(),
            "Game record written"
        );
        Ok(())
    }
}

/// Discards records
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

#[async_trait]
impl GameRecorder for NullRecorder {
    async fn record(&self, _record: &GameRecord) -> Result<(), RecordError> {
        Ok(())
    }
}
