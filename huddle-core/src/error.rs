use thiserror::Error;

/// Failures surfaced by the relay and by a participant's session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("media acquisition failed: {0}")]
    MediaAcquisitionFailed(String),

    #[error("signaling unavailable: {0}")]
    SignalingUnavailable(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("negotiation failed: {0}")]
    NegotiationFailed(String),

    #[error("ICE failed: {0}")]
    IceFailed(String),
}

impl Error {
    /// The message without the variant prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::ConnectionClosed(detail)
            | Self::MediaAcquisitionFailed(detail)
            | Self::SignalingUnavailable(detail)
            | Self::InvalidMessage(detail)
            | Self::NegotiationFailed(detail)
            | Self::IceFailed(detail) => detail,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
