mod registry;
mod registry_command;
mod room;
mod room_router;

pub use registry::*;
pub use registry_command::*;
pub use room::*;
pub use room_router::*;
