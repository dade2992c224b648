use huddle_core::SignalMessage;

/// What the relay connection reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Message(SignalMessage),
    /// A text frame that is not a known signaling message.
    Invalid(String),
    /// Transport error; always followed by `Closed`.
    Failed(String),
    Closed,
}
