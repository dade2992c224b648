use crate::capability::RemoteTrack;
use crate::session::ConnectionState;
use huddle_core::{Error, PeerId};
use std::collections::BTreeMap;

/// Tracks received from one remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMedia {
    pub stream_id: String,
    pub tracks: Vec<RemoteTrack>,
}

pub type RemoteMediaSnapshot = BTreeMap<PeerId, RemoteMedia>;

/// Notifications for whoever drives the session (UI, CLI, tests).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(ConnectionState),
    RemoteMediaUpdated(RemoteMediaSnapshot),
    Error(Error),
}
