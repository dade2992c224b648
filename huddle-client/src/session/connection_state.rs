use std::fmt;

/// Lifecycle of one participant's session.
///
/// ```text
/// Idle -> Initializing -> Ready -> Negotiating <-> Connected
///             |                        |              |
///             +-> Failed <-------------+--------------+
/// any non-terminal state -> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Initializing,
    Ready,
    Negotiating,
    Connected,
    Failed,
    Closed,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }

    /// States in which offers, answers and ICE restarts may run.
    pub fn can_negotiate(self) -> bool {
        matches!(self, Self::Ready | Self::Negotiating | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Negotiating => "negotiating",
            Self::Connected => "connected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
