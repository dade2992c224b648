use crate::room::RegistrySnapshot;
use crate::signaling::{ChannelId, PeerChannel, RelayKind};
use huddle_core::{PeerId, RoomId};
use tokio::sync::oneshot;

/// Commands the signaling layer sends to the room router.
#[derive(Debug)]
pub enum RegistryCommand {
    /// A connection announced itself in a room.
    Join {
        room_id: RoomId,
        peer_id: PeerId,
        channel: PeerChannel,
    },

    /// Forward a negotiation frame verbatim to one member.
    Relay {
        kind: RelayKind,
        room_id: RoomId,
        target_peer_id: PeerId,
        raw: String,
    },

    /// The connection closed or errored.
    Leave { channel_id: ChannelId },

    Snapshot {
        reply: oneshot::Sender<RegistrySnapshot>,
    },
}
