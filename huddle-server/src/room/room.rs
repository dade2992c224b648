use crate::signaling::{ChannelId, PeerChannel};
use huddle_core::{PeerId, RoomId, SignalMessage};
use std::collections::HashMap;
use tracing::debug;

/// Membership of one room: peer id -> the connection that joined with it.
pub struct Room {
    id: RoomId,
    members: HashMap<PeerId, PeerChannel>,
}

impl Room {
    pub(crate) fn new(id: RoomId) -> Self {
        Self {
            id,
            members: HashMap::new(),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Registers `peer_id` and exchanges discovery notifications pairwise with
    /// every other member. Rejoining with a known id replaces its channel; a
    /// repeated join on the same channel changes nothing.
    pub(crate) fn admit(&mut self, peer_id: PeerId, channel: PeerChannel) {
        if self.members.get(&peer_id).map(PeerChannel::id) == Some(channel.id()) {
            debug!("Peer {} already joined room {} on this channel", peer_id, self.id);
            return;
        }

        self.members.insert(peer_id.clone(), channel.clone());

        for (existing_id, existing) in &self.members {
            if existing.id() != channel.id() && existing.is_open() {
                debug!("Announcing {} to {} in room {}", peer_id, existing_id, self.id);
                existing.send_signal(&SignalMessage::discovery(peer_id.clone(), self.id.clone()));
            }

            if existing_id != &peer_id && channel.is_open() {
                debug!("Announcing {} to {} in room {}", existing_id, peer_id, self.id);
                channel.send_signal(&SignalMessage::discovery(
                    existing_id.clone(),
                    self.id.clone(),
                ));
            }
        }
    }

    pub(crate) fn member(&self, peer_id: &PeerId) -> Option<&PeerChannel> {
        self.members.get(peer_id)
    }

    /// Drops every membership held by `channel_id`, returning the removed ids.
    pub(crate) fn remove_channel(&mut self, channel_id: ChannelId) -> Vec<PeerId> {
        let removed: Vec<PeerId> = self
            .members
            .iter()
            .filter(|(_, channel)| channel.id() == channel_id)
            .map(|(peer_id, _)| peer_id.clone())
            .collect();

        for peer_id in &removed {
            self.members.remove(peer_id);
        }

        removed
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn member_ids(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.members.keys().cloned().collect();
        ids.sort();
        ids
    }
}
