use crate::room::Room;
use crate::signaling::{ChannelId, PeerChannel, RelayKind};
use huddle_core::{PeerId, RoomId};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// What happened to a relayed message. Only `Delivered` reaches anyone; the
/// sender is never told about the other outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    RoomNotFound,
    TargetNotFound,
    TargetClosed,
}

/// Read-only view of the registry: room -> sorted member ids.
pub type RegistrySnapshot = BTreeMap<RoomId, Vec<PeerId>>;

/// Process-wide room membership. Rooms are created on first join and
/// removed as soon as their last member leaves.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, room_id: RoomId, peer_id: PeerId, channel: PeerChannel) {
        let room = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            info!("Creating new room: {}", room_id);
            Room::new(room_id.clone())
        });

        info!("Peer {} joined room {}", peer_id, room_id);
        room.admit(peer_id, channel);
    }

    /// Forwards `raw` unchanged to `target` in `room_id`.
    pub fn relay(
        &self,
        kind: RelayKind,
        room_id: &RoomId,
        target: &PeerId,
        raw: String,
    ) -> RelayOutcome {
        let Some(room) = self.rooms.get(room_id) else {
            info!("Dropping {}: room {} not found", kind.as_str(), room_id);
            return RelayOutcome::RoomNotFound;
        };

        let Some(channel) = room.member(target) else {
            info!(
                "Dropping {}: target peer {} not found in room {}",
                kind.as_str(),
                target,
                room_id
            );
            return RelayOutcome::TargetNotFound;
        };

        if !channel.is_open() || !channel.send_text(raw) {
            info!(
                "Dropping {}: target peer {} in room {} is not open",
                kind.as_str(),
                target,
                room_id
            );
            return RelayOutcome::TargetClosed;
        }

        RelayOutcome::Delivered
    }

    /// Removes every membership bound to `channel_id` and deletes rooms left
    /// empty. Safe to repeat.
    pub fn leave(&mut self, channel_id: ChannelId) -> Vec<(RoomId, PeerId)> {
        let mut removed = Vec::new();

        self.rooms.retain(|room_id, room| {
            for peer_id in room.remove_channel(channel_id) {
                info!("Peer {} left room {}", peer_id, room_id);
                removed.push((room_id.clone(), peer_id));
            }

            if room.is_empty() {
                info!("Deleting empty room: {}", room_id);
                false
            } else {
                true
            }
        });

        removed
    }

    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.rooms
            .iter()
            .map(|(id, room)| (id.clone(), room.member_ids()))
            .collect()
    }
}
