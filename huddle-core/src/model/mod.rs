mod negotiation;
mod peer;
mod room;
mod signaling;

pub use negotiation::{IceCandidateInit, SdpType, SessionDescription};
pub use peer::PeerId;
pub use room::RoomId;
pub use signaling::SignalMessage;
