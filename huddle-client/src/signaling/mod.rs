mod link_event;
mod signaling_link;

pub use link_event::*;
pub use signaling_link::*;
