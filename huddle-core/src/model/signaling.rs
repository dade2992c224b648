use crate::model::negotiation::{IceCandidateInit, SessionDescription};
use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

/// Every message exchanged over the signaling channel.
///
/// `offer`, `answer` and `ice-candidate` carry the sender in `peerId` and the
/// recipient in `targetPeerId`; the relay routes them on `roomId` +
/// `targetPeerId` alone and never looks at the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum SignalMessage {
    #[serde(rename = "join")]
    Join { room_id: RoomId, peer_id: PeerId },

    /// Discovery notification: `peer_id` is present in `room_id`.
    #[serde(rename = "peerId")]
    PeerDiscovered { peer_id: PeerId, room_id: RoomId },

    #[serde(rename = "offer")]
    Offer {
        offer: SessionDescription,
        room_id: RoomId,
        peer_id: PeerId,
        target_peer_id: PeerId,
    },

    #[serde(rename = "answer")]
    Answer {
        answer: SessionDescription,
        room_id: RoomId,
        peer_id: PeerId,
        target_peer_id: PeerId,
    },

    #[serde(rename = "ice-candidate")]
    IceCandidate {
        candidate: IceCandidateInit,
        room_id: RoomId,
        peer_id: PeerId,
        target_peer_id: PeerId,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

impl SignalMessage {
    pub fn discovery(peer_id: PeerId, room_id: RoomId) -> Self {
        Self::PeerDiscovered { peer_id, room_id }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The wire `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::PeerDiscovered { .. } => "peerId",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::Error { .. } => "error",
        }
    }

    /// Recipient of a targeted negotiation message.
    pub fn target_peer_id(&self) -> Option<&PeerId> {
        match self {
            Self::Offer { target_peer_id, .. }
            | Self::Answer { target_peer_id, .. }
            | Self::IceCandidate { target_peer_id, .. } => Some(target_peer_id),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
