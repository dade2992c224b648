use crate::capability::MediaConstraints;
use crate::retry::RetryPolicy;
use crate::signaling::DEFAULT_CONNECT_TIMEOUT;
use huddle_core::{PeerId, RoomId};
use std::time::Duration;

pub const DEFAULT_SIGNALING_URL: &str = "ws://localhost:8080";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub signaling_url: String,
    pub room_id: RoomId,
    /// Generated when absent.
    pub peer_id: Option<PeerId>,
    pub connect_timeout: Duration,
    pub media_retry: RetryPolicy,
    pub constraints: MediaConstraints,
}

impl SessionConfig {
    pub fn new(room_id: impl Into<RoomId>) -> Self {
        Self {
            signaling_url: DEFAULT_SIGNALING_URL.to_string(),
            room_id: room_id.into(),
            peer_id: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            media_retry: RetryPolicy::default(),
            constraints: MediaConstraints::default(),
        }
    }

    pub fn with_signaling_url(mut self, url: impl Into<String>) -> Self {
        self.signaling_url = url.into();
        self
    }

    pub fn with_peer_id(mut self, peer_id: impl Into<PeerId>) -> Self {
        self.peer_id = Some(peer_id.into());
        self
    }

    pub fn with_media_retry(mut self, policy: RetryPolicy) -> Self {
        self.media_retry = policy;
        self
    }
}
