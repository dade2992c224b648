use crate::error::ServerError;
use crate::room::{RegistrySnapshot, RouterHandle};
use crate::signaling::{ChannelId, InboundMessage, PeerChannel, Rejection, parse_inbound};
use dashmap::DashMap;
use huddle_core::SignalMessage;
use std::sync::Arc;
use tracing::{debug, error, warn};

struct SignalingInner {
    connections: DashMap<ChannelId, PeerChannel>,
}

/// Entry point for connection handlers: validates frames, replies with
/// `error` messages, and hands routing work to the room router.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
    router: RouterHandle,
}

impl SignalingService {
    pub fn new(router: RouterHandle) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                connections: DashMap::new(),
            }),
            router,
        }
    }

    pub fn add_connection(&self, channel: PeerChannel) {
        self.inner.connections.insert(channel.id(), channel);
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    pub async fn handle_text(&self, channel: &PeerChannel, text: &str) {
        debug!("Received message from client {}: {}", channel.id(), text);

        let result = match parse_inbound(text) {
            Ok(InboundMessage::Join { room_id, peer_id }) => {
                self.router.join(room_id, peer_id, channel.clone()).await
            }
            Ok(InboundMessage::Relay {
                kind,
                room_id,
                target_peer_id,
            }) => {
                self.router
                    .relay(kind, room_id, target_peer_id, text.to_owned())
                    .await
            }
            Err(rejection) => {
                self.reject(channel, rejection);
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("Failed to process message from client {}: {}", channel.id(), e);
        }
    }

    pub fn reject(&self, channel: &PeerChannel, rejection: Rejection) {
        warn!("Rejecting message from client {}: {}", channel.id(), rejection);
        channel.send_signal(&SignalMessage::error(rejection.to_string()));
    }

    /// Forgets the connection and drops all of its room memberships.
    pub async fn disconnect(&self, channel_id: ChannelId) {
        self.inner.connections.remove(&channel_id);

        if let Err(e) = self.router.leave(channel_id).await {
            error!("Failed to release memberships of client {}: {}", channel_id, e);
        }
    }

    pub async fn snapshot(&self) -> Result<RegistrySnapshot, ServerError> {
        self.router.snapshot().await
    }
}
