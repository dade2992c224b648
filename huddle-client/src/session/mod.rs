mod call_event;
mod call_session;
mod connection_state;
mod orchestrator;
mod session_config;
mod session_event;

pub use call_event::*;
pub use call_session::*;
pub use connection_state::*;
pub use orchestrator::*;
pub use session_config::*;
pub use session_event::*;
