use huddle_core::{PeerId, RoomId};
use serde_json::Value;
use thiserror::Error;

/// Negotiation messages the relay forwards without looking inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    Offer,
    Answer,
    IceCandidate,
}

impl RelayKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "ice-candidate",
        }
    }
}

/// A client frame the relay knows how to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Join {
        room_id: RoomId,
        peer_id: PeerId,
    },
    Relay {
        kind: RelayKind,
        room_id: RoomId,
        target_peer_id: PeerId,
    },
}

/// Reasons a frame is answered with an `error` message. The display text is
/// the message sent back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Missing roomId or peerId")]
    MissingJoinFields,

    #[error("Missing roomId or targetPeerId")]
    MissingRelayFields,

    #[error("Unknown message type")]
    UnknownType,

    #[error("Invalid message format")]
    Malformed,
}

/// Classifies a raw text frame. Only routing fields are read; payloads
/// (`offer`, `answer`, `candidate`) are left untouched.
pub fn parse_inbound(text: &str) -> Result<InboundMessage, Rejection> {
    let value: Value = serde_json::from_str(text).map_err(|_| Rejection::Malformed)?;

    match value.get("type").and_then(Value::as_str) {
        Some("join") => {
            match (string_field(&value, "roomId"), string_field(&value, "peerId")) {
                (Some(room_id), Some(peer_id)) => Ok(InboundMessage::Join {
                    room_id: RoomId::from(room_id),
                    peer_id: PeerId::from(peer_id),
                }),
                _ => Err(Rejection::MissingJoinFields),
            }
        }
        Some(kind @ ("offer" | "answer" | "ice-candidate")) => {
            let kind = match kind {
                "offer" => RelayKind::Offer,
                "answer" => RelayKind::Answer,
                _ => RelayKind::IceCandidate,
            };
            match (
                string_field(&value, "roomId"),
                string_field(&value, "targetPeerId"),
            ) {
                (Some(room_id), Some(target)) => Ok(InboundMessage::Relay {
                    kind,
                    room_id: RoomId::from(room_id),
                    target_peer_id: PeerId::from(target),
                }),
                _ => Err(Rejection::MissingRelayFields),
            }
        }
        _ => Err(Rejection::UnknownType),
    }
}

fn string_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
