//! Outbound delivery of session messages

use crate::error::DeliveryError;
use crate::protocol::ServerMessage;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Delivers session output to the chat transport
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn deliver(&self, msg: ServerMessage) -> Result<(), DeliveryError>;
}

/// Fans every message out to all connected WebSocket clients; each connection
/// filters by group and recipient
#[derive(Debug, Clone)]
pub struct BroadcastMessenger {
    tx: broadcast::Sender<ServerMessage>,
}

impl BroadcastMessenger {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastMessenger {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Messenger for BroadcastMessenger {
    async fn deliver(&self, msg: ServerMessage) -> Result<(), DeliveryError> {
        self.tx.send(msg).map(|_| ()).map_err(|e| match e.0.group_id() {
            Some(group_id) => DeliveryError::NoListeners(group_id),
            None => DeliveryError::NoConnections,
        })
    }
}
