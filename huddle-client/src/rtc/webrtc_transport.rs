use crate::capability::{
    IceConnectionState, IceGatheringState, LocalMedia, MediaKind, MediaTrack, NegotiationEvent,
    NegotiationTransport, OfferOptions, PeerConnectionState, PeerTransport, RemoteTrack,
    SignalingState, TransportFactory,
};
use crate::rtc::RtcConfig;
use async_trait::async_trait;
use huddle_core::{Error, IceCandidateInit, Result, SdpType, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

/// [`NegotiationTransport`] backed by a webrtc-rs peer connection.
pub struct WebRtcTransport {
    peer_connection: Arc<RTCPeerConnection>,
}

impl WebRtcTransport {
    /// Builds the peer connection. Its callbacks feed the returned channel.
    pub async fn new(
        config: RtcConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<NegotiationEvent>)> {
        let mut m = MediaEngine::default();
        m.register_default_codecs().map_err(negotiation_error)?;
        let registry =
            register_default_interceptors(Registry::new(), &mut m).map_err(negotiation_error)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = if config.ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: config.ice_servers,
                ..Default::default()
            }]
        };

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(negotiation_error)?,
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self::register_callbacks(&peer_connection, event_tx);

        Ok((Self { peer_connection }, event_rx))
    }

    fn register_callbacks(
        peer_connection: &RTCPeerConnection,
        event_tx: mpsc::UnboundedSender<NegotiationEvent>,
    ) {
        let ice_tx = event_tx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx.send(NegotiationEvent::CandidateDiscovered(IceCandidateInit {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_mline_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                }));
            })
        }));

        let track_tx = event_tx.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>, _receiver, _transceiver| {
                let tx = track_tx.clone();

                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Audio => MediaKind::Audio,
                        RTPCodecType::Video => MediaKind::Video,
                        other => {
                            debug!("Ignoring remote track of kind {:?}", other);
                            return;
                        }
                    };
                    let _ = tx.send(NegotiationEvent::TrackReceived(RemoteTrack {
                        stream_id: track.stream_id(),
                        track_id: track.id(),
                        kind,
                    }));
                })
            },
        ));

        let signaling_tx = event_tx.clone();
        peer_connection.on_signaling_state_change(Box::new(move |s: RTCSignalingState| {
            let tx = signaling_tx.clone();

            Box::pin(async move {
                if let Some(state) = map_signaling_state(s) {
                    let _ = tx.send(NegotiationEvent::SignalingStateChanged(state));
                }
            })
        }));

        let state_tx = event_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!("Peer connection state changed: {:?}", s);
                    if let Some(state) = map_peer_connection_state(s) {
                        let _ = tx.send(NegotiationEvent::PeerConnectionStateChanged(state));
                    }
                })
            },
        ));

        let ice_state_tx = event_tx.clone();
        peer_connection.on_ice_connection_state_change(Box::new(
            move |s: RTCIceConnectionState| {
                let tx = ice_state_tx.clone();

                Box::pin(async move {
                    if let Some(state) = map_ice_connection_state(s) {
                        let _ = tx.send(NegotiationEvent::IceConnectionStateChanged(state));
                    }
                })
            },
        ));

        let gathering_tx = event_tx;
        peer_connection.on_ice_gathering_state_change(Box::new(move |s: RTCIceGathererState| {
            let tx = gathering_tx.clone();

            Box::pin(async move {
                if let Some(state) = map_gathering_state(s) {
                    let _ = tx.send(NegotiationEvent::IceGatheringStateChanged(state));
                }
            })
        }));
    }

    async fn to_rtc_description(
        &self,
        description: SessionDescription,
    ) -> Result<RTCSessionDescription> {
        let rtc = match description.kind {
            SdpType::Offer => RTCSessionDescription::offer(description.sdp),
            SdpType::Answer => RTCSessionDescription::answer(description.sdp),
            SdpType::Pranswer => RTCSessionDescription::pranswer(description.sdp),
            SdpType::Rollback => {
                let mut rollback = RTCSessionDescription::default();
                rollback.sdp_type = RTCSdpType::Rollback;
                if let Some(pending) = self.peer_connection.pending_local_description().await {
                    rollback.sdp = pending.sdp;
                }
                return Ok(rollback);
            }
        };
        rtc.map_err(negotiation_error)
    }
}

fn from_rtc_description(description: RTCSessionDescription) -> Result<SessionDescription> {
    let kind = match description.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => {
            return Err(Error::NegotiationFailed(
                "Peer connection produced a description without a type".to_string(),
            ));
        }
    };

    Ok(SessionDescription {
        kind,
        sdp: description.sdp,
    })
}

fn negotiation_error(e: webrtc::Error) -> Error {
    Error::NegotiationFailed(e.to_string())
}

fn map_signaling_state(s: RTCSignalingState) -> Option<SignalingState> {
    match s {
        RTCSignalingState::Stable => Some(SignalingState::Stable),
        RTCSignalingState::HaveLocalOffer => Some(SignalingState::HaveLocalOffer),
        RTCSignalingState::HaveRemoteOffer => Some(SignalingState::HaveRemoteOffer),
        RTCSignalingState::HaveLocalPranswer => Some(SignalingState::HaveLocalPranswer),
        RTCSignalingState::HaveRemotePranswer => Some(SignalingState::HaveRemotePranswer),
        RTCSignalingState::Closed => Some(SignalingState::Closed),
        RTCSignalingState::Unspecified => None,
    }
}

fn map_peer_connection_state(s: RTCPeerConnectionState) -> Option<PeerConnectionState> {
    match s {
        RTCPeerConnectionState::New => Some(PeerConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(PeerConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(PeerConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(PeerConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(PeerConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(PeerConnectionState::Closed),
        RTCPeerConnectionState::Unspecified => None,
    }
}

fn map_ice_connection_state(s: RTCIceConnectionState) -> Option<IceConnectionState> {
    match s {
        RTCIceConnectionState::New => Some(IceConnectionState::New),
        RTCIceConnectionState::Checking => Some(IceConnectionState::Checking),
        RTCIceConnectionState::Connected => Some(IceConnectionState::Connected),
        RTCIceConnectionState::Completed => Some(IceConnectionState::Completed),
        RTCIceConnectionState::Disconnected => Some(IceConnectionState::Disconnected),
        RTCIceConnectionState::Failed => Some(IceConnectionState::Failed),
        RTCIceConnectionState::Closed => Some(IceConnectionState::Closed),
        RTCIceConnectionState::Unspecified => None,
    }
}

fn map_gathering_state(s: RTCIceGathererState) -> Option<IceGatheringState> {
    match s {
        RTCIceGathererState::New => Some(IceGatheringState::New),
        RTCIceGathererState::Gathering => Some(IceGatheringState::Gathering),
        RTCIceGathererState::Complete => Some(IceGatheringState::Complete),
        _ => None,
    }
}

fn codec_for(kind: MediaKind) -> RTCRtpCodecCapability {
    match kind {
        MediaKind::Audio => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            ..Default::default()
        },
        MediaKind::Video => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
    }
}

/// Opens a fresh [`WebRtcTransport`] per remote peer.
#[derive(Debug, Clone, Default)]
pub struct WebRtcTransportFactory {
    config: RtcConfig,
}

impl WebRtcTransportFactory {
    pub fn new(config: RtcConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(&self) -> Result<PeerTransport> {
        let (transport, events) = WebRtcTransport::new(self.config.clone()).await?;
        Ok(PeerTransport {
            transport: Arc::new(transport),
            events,
        })
    }
}

#[async_trait]
impl NegotiationTransport for WebRtcTransport {
    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription> {
        let rtc_options = options.ice_restart.then(|| RTCOfferOptions {
            ice_restart: true,
            ..Default::default()
        });

        let offer = self
            .peer_connection
            .create_offer(rtc_options)
            .await
            .map_err(negotiation_error)?;
        from_rtc_description(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(negotiation_error)?;
        from_rtc_description(answer)
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        let desc = self.to_rtc_description(description).await?;
        self.peer_connection
            .set_local_description(desc)
            .await
            .map_err(negotiation_error)
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        let desc = self.to_rtc_description(description).await?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .map_err(negotiation_error)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: candidate.username_fragment,
        };

        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(|e| Error::IceFailed(e.to_string()))
    }

    async fn add_track(&self, track: Arc<dyn MediaTrack>, media: &LocalMedia) -> Result<()> {
        let local = Arc::new(TrackLocalStaticSample::new(
            codec_for(track.kind()),
            track.id().to_owned(),
            media.id().to_owned(),
        ));

        self.peer_connection
            .add_track(local as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(negotiation_error)?;

        debug!("Bound local {} track {}", track.kind(), track.id());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection
            .close()
            .await
            .map_err(|e| Error::ConnectionClosed(e.to_string()))
    }
}
