use crate::capability::{
    IceConnectionState, LocalMedia, MediaCapture, MediaConstraints, MediaKind, NegotiationEvent,
    NegotiationTransport, OfferOptions, PeerConnectionState, RemoteTrack, SignalingSink,
    SignalingState,
};
use crate::media::acquire_local_media;
use crate::retry::RetryPolicy;
use crate::session::{ConnectionState, RemoteMedia, RemoteMediaSnapshot, SessionEvent};
use huddle_core::{
    Error, IceCandidateInit, PeerId, Result, RoomId, SessionDescription, SignalMessage,
};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

struct SessionInner {
    state: ConnectionState,
    target: Option<PeerId>,
    local_media: Option<LocalMedia>,
    /// Whether closing this session stops the local tracks.
    owns_media: bool,
    remote_media: RemoteMediaSnapshot,
    signaling: Option<Arc<dyn SignalingSink>>,
    /// A local offer has been applied and no answer or rollback followed yet.
    local_offer_pending: bool,
}

/// Drives one participant's negotiation with a single remote peer.
///
/// The orchestrator holds the local media and the remote-media map. Every
/// multi-step operation re-checks for `Closed` between awaits, so a
/// concurrent [`disconnect`](Self::disconnect) stops it at the next step.
/// Failures of caller-invoked operations are reported as
/// [`SessionEvent::Error`]; only [`initialize`](Self::initialize) and
/// [`adopt_media`](Self::adopt_media) also return them.
///
/// The first target bound stays bound for the life of the session. A room
/// with N other participants needs N orchestrators, which share one
/// [`LocalMedia`] through [`adopt_media`](Self::adopt_media).
pub struct ConnectionOrchestrator {
    local_peer_id: PeerId,
    room_id: RoomId,
    capture: Arc<dyn MediaCapture>,
    transport: Arc<dyn NegotiationTransport>,
    media_retry: RetryPolicy,
    constraints: MediaConstraints,
    events: mpsc::UnboundedSender<SessionEvent>,
    inner: Mutex<SessionInner>,
}

impl ConnectionOrchestrator {
    pub fn new(
        local_peer_id: PeerId,
        room_id: RoomId,
        capture: Arc<dyn MediaCapture>,
        transport: Arc<dyn NegotiationTransport>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();

        let orchestrator = Self {
            local_peer_id,
            room_id,
            capture,
            transport,
            media_retry: RetryPolicy::default(),
            constraints: MediaConstraints::default(),
            events,
            inner: Mutex::new(SessionInner {
                state: ConnectionState::Idle,
                target: None,
                local_media: None,
                owns_media: false,
                remote_media: RemoteMediaSnapshot::new(),
                signaling: None,
                local_offer_pending: false,
            }),
        };

        (orchestrator, events_rx)
    }

    pub fn with_media_retry(mut self, policy: RetryPolicy) -> Self {
        self.media_retry = policy;
        self
    }

    pub fn with_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn local_peer_id(&self) -> &PeerId {
        &self.local_peer_id
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    pub async fn target(&self) -> Option<PeerId> {
        self.inner.lock().await.target.clone()
    }

    pub async fn local_media(&self) -> Option<LocalMedia> {
        self.inner.lock().await.local_media.clone()
    }

    pub async fn remote_media(&self) -> RemoteMediaSnapshot {
        self.inner.lock().await.remote_media.clone()
    }

    pub async fn attach_signaling(&self, sink: Arc<dyn SignalingSink>) {
        self.inner.lock().await.signaling = Some(sink);
    }

    /// Acquires local media (with retries) and attaches every track to the
    /// transport. The session owns that media and stops it on close.
    pub async fn initialize(&self) -> Result<LocalMedia> {
        let result = self.try_initialize().await;
        self.reported(result)
    }

    /// Attaches media acquired elsewhere. Closing this session leaves the
    /// tracks running for their other users.
    pub async fn adopt_media(&self, media: LocalMedia) -> Result<()> {
        let result = self.try_adopt_media(media).await;
        self.reported(result)
    }

    fn reported<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.report(e.clone());
        }
        result
    }

    async fn try_initialize(&self) -> Result<LocalMedia> {
        self.begin_initializing().await?;
        info!("Starting media initialization for {}", self.local_peer_id);

        let media =
            match acquire_local_media(self.capture.as_ref(), self.constraints, &self.media_retry)
                .await
            {
                Ok(media) => media,
                Err(e) => {
                    self.fail_unless_closed().await;
                    return Err(e);
                }
            };

        self.attach_media(media.clone(), true).await?;
        Ok(media)
    }

    async fn try_adopt_media(&self, media: LocalMedia) -> Result<()> {
        self.begin_initializing().await?;
        debug!("Adopting shared media {} for {}", media.id(), self.local_peer_id);
        self.attach_media(media, false).await
    }

    async fn begin_initializing(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            ConnectionState::Idle => {
                self.set_state(&mut inner, ConnectionState::Initializing);
                Ok(())
            }
            ConnectionState::Closed => Err(Error::ConnectionClosed(
                "Cannot initialize: session is already closed".to_string(),
            )),
            state => Err(Error::MediaAcquisitionFailed(format!(
                "Cannot initialize in state {}",
                state
            ))),
        }
    }

    async fn attach_media(&self, media: LocalMedia, owned: bool) -> Result<()> {
        let stop_if_owned = |media: &LocalMedia| {
            if owned {
                media.stop_all();
            }
        };

        for track in media.tracks() {
            if self.state().await == ConnectionState::Closed {
                stop_if_owned(&media);
                return Err(Error::ConnectionClosed(
                    "Session closed during media initialization".to_string(),
                ));
            }

            debug!("Adding {} track {} to transport", track.kind(), track.id());
            if let Err(e) = self.transport.add_track(track.clone(), &media).await {
                stop_if_owned(&media);
                self.fail_unless_closed().await;
                return Err(e);
            }
        }

        let mut inner = self.inner.lock().await;
        if inner.state == ConnectionState::Closed {
            stop_if_owned(&media);
            return Err(Error::ConnectionClosed(
                "Session closed during media initialization".to_string(),
            ));
        }

        info!("Local media ready: {} tracks", media.tracks().len());
        inner.local_media = Some(media);
        inner.owns_media = owned;
        self.set_state(&mut inner, ConnectionState::Ready);
        Ok(())
    }

    /// Records the remote peer this session negotiates with. Rebinding to a
    /// different peer is refused.
    pub async fn bind_target(&self, peer_id: PeerId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        Self::bind(&mut inner, peer_id)
    }

    fn bind(inner: &mut SessionInner, peer_id: PeerId) -> Result<()> {
        match &inner.target {
            None => {
                info!("Set target peer to {}", peer_id);
                inner.target = Some(peer_id);
                Ok(())
            }
            Some(bound) if *bound == peer_id => Ok(()),
            Some(bound) => Err(Error::NegotiationFailed(format!(
                "Session is bound to peer {}; cannot negotiate with {}",
                bound, peer_id
            ))),
        }
    }

    pub async fn create_offer(&self, target: PeerId) {
        if let Err(e) = self.try_create_offer(target).await {
            self.report(e);
        }
    }

    async fn try_create_offer(&self, target: PeerId) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            Self::check_negotiable(&inner, "create offer")?;
            Self::bind(&mut inner, target.clone())?;
            self.set_state(&mut inner, ConnectionState::Negotiating);
        }

        info!("Creating offer for peer {}", target);
        let offer = self.transport.create_offer(OfferOptions::default()).await?;
        self.ensure_open("after creating offer").await?;

        self.transport.set_local_description(offer.clone()).await?;
        self.mark_offer_pending("after setting local description").await?;

        self.send_signal(SignalMessage::Offer {
            offer,
            room_id: self.room_id.clone(),
            peer_id: self.local_peer_id.clone(),
            target_peer_id: target,
        })
        .await
    }

    pub async fn handle_offer(&self, offer: SessionDescription, from: PeerId) {
        if let Err(e) = self.try_handle_offer(offer, from).await {
            self.report(e);
        }
    }

    async fn try_handle_offer(&self, offer: SessionDescription, from: PeerId) -> Result<()> {
        let collision = {
            let mut inner = self.inner.lock().await;
            Self::check_negotiable(&inner, "handle offer")?;
            Self::bind(&mut inner, from.clone())?;

            // Both sides offered at once. The peer with the greater id yields.
            let collision = inner.local_offer_pending;
            if collision && self.local_peer_id < from {
                info!("Ignoring colliding offer from {}", from);
                return Ok(());
            }

            self.set_state(&mut inner, ConnectionState::Negotiating);
            collision
        };

        if collision {
            info!("Offer collision with {}; rolling back local offer", from);
            self.transport
                .set_local_description(SessionDescription::rollback())
                .await?;
            self.inner.lock().await.local_offer_pending = false;
            self.ensure_open("after rolling back local offer").await?;
        }

        info!("Setting remote description with offer from {}", from);
        self.transport.set_remote_description(offer).await?;
        self.ensure_open("after setting remote description").await?;

        let answer = self.transport.create_answer().await?;
        self.ensure_open("after creating answer").await?;

        self.transport.set_local_description(answer.clone()).await?;
        self.ensure_open("after setting local description").await?;

        self.send_signal(SignalMessage::Answer {
            answer,
            room_id: self.room_id.clone(),
            peer_id: self.local_peer_id.clone(),
            target_peer_id: from,
        })
        .await?;

        self.mark_connected().await;
        Ok(())
    }

    pub async fn handle_answer(&self, answer: SessionDescription) {
        if let Err(e) = self.try_handle_answer(answer).await {
            self.report(e);
        }
    }

    async fn try_handle_answer(&self, answer: SessionDescription) -> Result<()> {
        Self::check_negotiable(&*self.inner.lock().await, "handle answer")?;

        info!("Setting remote description with answer");
        let applied = self.transport.set_remote_description(answer).await;

        // The offer is settled either way; a rejected answer must not leave
        // later colliding offers ignored.
        self.inner.lock().await.local_offer_pending = false;
        applied?;

        self.mark_connected().await;
        Ok(())
    }

    /// Applies a remote candidate. A failure is reported but leaves the
    /// session running.
    pub async fn handle_ice_candidate(&self, candidate: IceCandidateInit) {
        if self.state().await == ConnectionState::Closed {
            self.report(Error::ConnectionClosed(
                "Cannot handle ICE candidate: session is closed".to_string(),
            ));
            return;
        }

        debug!("Adding ICE candidate {}", candidate.candidate);
        if let Err(e) = self.transport.add_ice_candidate(candidate).await {
            self.report(Error::IceFailed(e.detail().to_string()));
        }
    }

    /// Reacts to one event from the transport.
    pub async fn handle_negotiation_event(&self, event: NegotiationEvent) {
        match event {
            NegotiationEvent::CandidateDiscovered(candidate) => {
                self.forward_local_candidate(candidate).await;
            }

            NegotiationEvent::TrackReceived(track) => {
                self.add_remote_track(track).await;
            }

            NegotiationEvent::SignalingStateChanged(state) => {
                debug!("Signaling state changed to {:?}", state);
                if state == SignalingState::Closed {
                    self.on_transport_closed().await;
                }
            }

            NegotiationEvent::PeerConnectionStateChanged(state) => {
                info!("Peer connection state changed to {:?}", state);
                match state {
                    PeerConnectionState::Failed => {
                        self.fail(Error::NegotiationFailed(
                            "Peer connection failed".to_string(),
                        ))
                        .await;
                    }
                    PeerConnectionState::Closed => self.on_transport_closed().await,
                    _ => {}
                }
            }

            NegotiationEvent::IceConnectionStateChanged(state) => {
                info!("ICE connection state changed to {:?}", state);
                match state {
                    IceConnectionState::Disconnected => {
                        info!("ICE connection disconnected, attempting to reconnect");
                        self.restart_ice().await;
                    }
                    IceConnectionState::Failed => {
                        self.fail(Error::IceFailed("ICE connection failed".to_string()))
                            .await;
                    }
                    _ => {}
                }
            }

            NegotiationEvent::IceGatheringStateChanged(state) => {
                debug!("ICE gathering state changed to {:?}", state);
            }
        }
    }

    async fn forward_local_candidate(&self, candidate: IceCandidateInit) {
        let (state, target, sink) = {
            let inner = self.inner.lock().await;
            (inner.state, inner.target.clone(), inner.signaling.clone())
        };

        if state == ConnectionState::Closed {
            debug!("Dropping local ICE candidate: session is closed");
            return;
        }

        match (target, sink) {
            (Some(target), Some(sink)) if sink.is_open() => {
                let msg = SignalMessage::IceCandidate {
                    candidate,
                    room_id: self.room_id.clone(),
                    peer_id: self.local_peer_id.clone(),
                    target_peer_id: target,
                };
                if let Err(e) = sink.send(&msg) {
                    warn!("Failed to send ICE candidate: {}", e);
                }
            }
            _ => warn!("Cannot send ICE candidate: missing signaling channel or target peer"),
        }
    }

    async fn add_remote_track(&self, track: RemoteTrack) {
        let snapshot = {
            let mut inner = self.inner.lock().await;
            if inner.state == ConnectionState::Closed {
                return;
            }

            let Some(target) = inner.target.clone() else {
                warn!("Dropping remote track {}: no target peer bound", track.track_id);
                return;
            };

            info!("Received remote {} track from {}", track.kind, target);
            let media = inner
                .remote_media
                .entry(target)
                .or_insert_with(|| RemoteMedia {
                    stream_id: track.stream_id.clone(),
                    tracks: Vec::new(),
                });

            if media.stream_id != track.stream_id {
                media.stream_id = track.stream_id.clone();
                media.tracks.clear();
            }
            if !media.tracks.iter().any(|t| t.track_id == track.track_id) {
                media.tracks.push(track);
            }

            inner.remote_media.clone()
        };

        self.emit(SessionEvent::RemoteMediaUpdated(snapshot));
    }

    async fn restart_ice(&self) {
        if let Err(e) = self.try_restart_ice().await {
            self.report(e);
        }
    }

    async fn try_restart_ice(&self) -> Result<()> {
        let target = {
            let mut inner = self.inner.lock().await;
            Self::check_negotiable(&inner, "restart ICE")?;
            let target = inner.target.clone().ok_or_else(|| {
                Error::NegotiationFailed("Cannot restart ICE: no target peer bound".to_string())
            })?;
            self.set_state(&mut inner, ConnectionState::Negotiating);
            target
        };

        info!("Restarting ICE with {}", target);
        let offer = self.transport.create_offer(OfferOptions::ice_restart()).await?;
        self.ensure_open("after creating ICE restart offer").await?;

        self.transport.set_local_description(offer.clone()).await?;
        self.mark_offer_pending("after setting ICE restart offer").await?;

        self.send_signal(SignalMessage::Offer {
            offer,
            room_id: self.room_id.clone(),
            peer_id: self.local_peer_id.clone(),
            target_peer_id: target,
        })
        .await
    }

    async fn on_transport_closed(&self) {
        let media = {
            let mut inner = self.inner.lock().await;
            if inner.state == ConnectionState::Closed {
                return;
            }

            let err = if inner.state == ConnectionState::Initializing {
                Error::MediaAcquisitionFailed(
                    "Peer connection closed during media initialization".to_string(),
                )
            } else {
                Error::ConnectionClosed("Peer connection is closed".to_string())
            };

            self.set_state(&mut inner, ConnectionState::Closed);
            self.report(err);
            Self::release(&mut inner)
        };

        if let Some(media) = media {
            media.stop_all();
        }
        self.emit(SessionEvent::RemoteMediaUpdated(RemoteMediaSnapshot::new()));
    }

    /// Flips the first local audio track. Returns whether audio is now muted.
    pub async fn toggle_audio(&self) -> bool {
        self.toggle(MediaKind::Audio).await
    }

    /// Flips the first local video track. Returns whether video is now off.
    pub async fn toggle_video(&self) -> bool {
        self.toggle(MediaKind::Video).await
    }

    async fn toggle(&self, kind: MediaKind) -> bool {
        let inner = self.inner.lock().await;
        if inner.state == ConnectionState::Closed {
            return false;
        }

        let Some(track) = inner
            .local_media
            .as_ref()
            .and_then(|media| media.first_track(kind))
        else {
            return false;
        };

        let enabled = !track.is_enabled();
        track.set_enabled(enabled);
        !enabled
    }

    /// Tears the session down. Repeated calls do nothing.
    pub async fn disconnect(&self) {
        let media = {
            let mut inner = self.inner.lock().await;
            if inner.state == ConnectionState::Closed {
                return;
            }

            info!("Disconnecting session {}", self.local_peer_id);
            self.set_state(&mut inner, ConnectionState::Closed);
            Self::release(&mut inner)
        };

        if let Err(e) = self.transport.close().await {
            warn!("Failed to close transport: {}", e);
        }
        if let Some(media) = media {
            media.stop_all();
        }
        self.emit(SessionEvent::RemoteMediaUpdated(RemoteMediaSnapshot::new()));
    }

    /// Drops remote media and the signaling reference. The local media stays
    /// readable; it is returned only when this session owns it, for the
    /// caller to stop.
    fn release(inner: &mut SessionInner) -> Option<LocalMedia> {
        inner.remote_media.clear();
        inner.signaling = None;
        inner.local_offer_pending = false;
        if inner.owns_media {
            inner.local_media.clone()
        } else {
            None
        }
    }

    fn check_negotiable(inner: &SessionInner, action: &str) -> Result<()> {
        match inner.state {
            ConnectionState::Closed => Err(Error::ConnectionClosed(format!(
                "Cannot {}: session is closed",
                action
            ))),
            state if !state.can_negotiate() => Err(Error::NegotiationFailed(format!(
                "Cannot {} in state {}",
                action, state
            ))),
            _ => Ok(()),
        }
    }

    async fn ensure_open(&self, step: &str) -> Result<()> {
        if self.state().await == ConnectionState::Closed {
            return Err(Error::ConnectionClosed(format!("Session closed {}", step)));
        }
        Ok(())
    }

    async fn mark_offer_pending(&self, step: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state == ConnectionState::Closed {
            return Err(Error::ConnectionClosed(format!("Session closed {}", step)));
        }
        inner.local_offer_pending = true;
        Ok(())
    }

    async fn mark_connected(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state == ConnectionState::Negotiating {
            self.set_state(&mut inner, ConnectionState::Connected);
        }
    }

    async fn fail(&self, err: Error) {
        self.fail_unless_closed().await;
        self.report(err);
    }

    async fn fail_unless_closed(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.state.is_terminal() {
            self.set_state(&mut inner, ConnectionState::Failed);
        }
    }

    async fn send_signal(&self, msg: SignalMessage) -> Result<()> {
        let sink = {
            let inner = self.inner.lock().await;
            if inner.state == ConnectionState::Closed {
                return Err(Error::ConnectionClosed(format!(
                    "Cannot send {}: session is closed",
                    msg.kind()
                )));
            }
            inner.signaling.clone()
        };

        match sink {
            Some(sink) if sink.is_open() => sink.send(&msg),
            _ => Err(Error::SignalingUnavailable(format!(
                "Cannot send {}: signaling channel is not available",
                msg.kind()
            ))),
        }
    }

    fn set_state(&self, inner: &mut SessionInner, next: ConnectionState) {
        if inner.state != next {
            debug!("Session {}: {} -> {}", self.local_peer_id, inner.state, next);
            inner.state = next;
            self.emit(SessionEvent::StateChanged(next));
        }
    }

    fn report(&self, err: Error) {
        error!("Session {} error: {}", self.local_peer_id, err);
        self.emit(SessionEvent::Error(err));
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}
