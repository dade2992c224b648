use crate::capability::{LocalMedia, MediaKind, MediaTrack};
use async_trait::async_trait;
use huddle_core::{IceCandidateInit, Result, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OfferOptions {
    pub ice_restart: bool,
}

impl OfferOptions {
    pub fn ice_restart() -> Self {
        Self { ice_restart: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceGatheringState {
    New,
    Gathering,
    Complete,
}

/// A track announced by the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub stream_id: String,
    pub track_id: String,
    pub kind: MediaKind,
}

/// Everything the transport reports back while a session is alive.
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationEvent {
    CandidateDiscovered(IceCandidateInit),
    TrackReceived(RemoteTrack),
    SignalingStateChanged(SignalingState),
    PeerConnectionStateChanged(PeerConnectionState),
    IceConnectionStateChanged(IceConnectionState),
    IceGatheringStateChanged(IceGatheringState),
}

/// Offer/answer and connectivity engine for a single peer connection.
/// Events are delivered out of band on a [`NegotiationEvent`] channel handed
/// out when the transport is constructed.
#[async_trait]
pub trait NegotiationTransport: Send + Sync {
    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription>;
    async fn create_answer(&self) -> Result<SessionDescription>;
    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;
    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;
    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<()>;
    async fn add_track(&self, track: Arc<dyn MediaTrack>, media: &LocalMedia) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// A freshly built transport together with its event stream.
pub struct PeerTransport {
    pub transport: Arc<dyn NegotiationTransport>,
    pub events: mpsc::UnboundedReceiver<NegotiationEvent>,
}

/// Builds one transport per remote peer.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(&self) -> Result<PeerTransport>;
}
