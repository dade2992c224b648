mod media;
mod negotiation;
mod signaling_sink;

pub use media::*;
pub use negotiation::*;
pub use signaling_sink::*;
