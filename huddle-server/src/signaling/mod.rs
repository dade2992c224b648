mod inbound;
mod peer_channel;
mod signaling_service;
mod ws_handler;

pub use inbound::*;
pub use peer_channel::*;
pub use signaling_service::*;
pub use ws_handler::*;
