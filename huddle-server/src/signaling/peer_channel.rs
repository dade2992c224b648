use huddle_core::SignalMessage;
use std::fmt;
use tokio::sync::mpsc;
use tracing::error;
use uuid::Uuid;

/// Server-side identity of one WebSocket connection.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct ChannelId(Uuid);

impl ChannelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound half of a connection: text frames queued here are written to the
/// socket by the connection's send task.
#[derive(Debug, Clone)]
pub struct PeerChannel {
    id: ChannelId,
    tx: mpsc::UnboundedSender<String>,
}

impl PeerChannel {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id: ChannelId::new(),
            tx,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// False once the connection's send task has stopped.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    pub fn send_text(&self, text: String) -> bool {
        match self.tx.send(text) {
            Ok(()) => true,
            Err(_) => {
                error!("Failed to queue frame for closed connection {}", self.id);
                false
            }
        }
    }

    pub fn send_signal(&self, msg: &SignalMessage) -> bool {
        match msg.to_json() {
            Ok(json) => self.send_text(json),
            Err(e) => {
                error!("Failed to serialize signal message: {}", e);
                false
            }
        }
    }
}
