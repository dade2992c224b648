mod acquisition;
mod synthetic;

pub use acquisition::*;
pub use synthetic::*;
