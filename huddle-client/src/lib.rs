mod capability;
mod media;
mod retry;
mod rtc;
mod session;
mod signaling;

pub use capability::*;
pub use media::*;
pub use retry::*;
pub use rtc::*;
pub use session::*;
pub use signaling::*;
