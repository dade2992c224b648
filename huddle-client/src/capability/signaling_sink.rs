use huddle_core::{Result, SignalMessage};

/// Outbound half of a relay connection.
pub trait SignalingSink: Send + Sync {
    fn send(&self, msg: &SignalMessage) -> Result<()>;
    fn is_open(&self) -> bool;
}
