use crate::session::SessionEvent;
use huddle_core::{Error, PeerId};

/// Notifications from a [`CallSession`](crate::session::CallSession).
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    /// Emitted by the session negotiating with `peer_id`.
    Peer { peer_id: PeerId, event: SessionEvent },
    /// `error` message sent by the relay.
    RelayError { message: String },
    /// Failures that belong to no single peer, such as losing the relay.
    Error(Error),
}
