use crate::capability::{
    LocalMedia, MediaCapture, MediaKind, PeerTransport, SignalingSink, TransportFactory,
};
use crate::media::acquire_local_media;
use crate::session::{
    CallEvent, ConnectionOrchestrator, RemoteMediaSnapshot, SessionConfig, SessionEvent,
};
use crate::signaling::{LinkEvent, SignalingLink};
use dashmap::DashMap;
use huddle_core::{Error, PeerId, Result, SignalMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

struct PeerEntry {
    orchestrator: Arc<ConnectionOrchestrator>,
    pump: JoinHandle<()>,
}

struct CallShared {
    local_peer_id: PeerId,
    config: SessionConfig,
    capture: Arc<dyn MediaCapture>,
    transports: Arc<dyn TransportFactory>,
    local_media: LocalMedia,
    link: Arc<SignalingLink>,
    peers: DashMap<PeerId, PeerEntry>,
    events: mpsc::UnboundedSender<CallEvent>,
}

/// A participant in one room: local media, one relay connection and one
/// [`ConnectionOrchestrator`] per remote peer.
///
/// Every orchestrator gets its own transport from the [`TransportFactory`]
/// and shares the local media. Relay messages are routed by their sender.
pub struct CallSession {
    shared: Arc<CallShared>,
    dispatch: Option<JoinHandle<()>>,
}

impl CallSession {
    /// Acquires media, connects to the relay and joins the configured room.
    /// Media or relay failures are returned and nothing keeps running.
    pub async fn start(
        config: SessionConfig,
        capture: Arc<dyn MediaCapture>,
        transports: Arc<dyn TransportFactory>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<CallEvent>)> {
        let local_peer_id = config.peer_id.clone().unwrap_or_else(PeerId::generate);
        info!(
            "Starting call session {} in room {}",
            local_peer_id, config.room_id
        );

        let local_media =
            acquire_local_media(capture.as_ref(), config.constraints, &config.media_retry).await?;

        let (link, link_events) =
            match SignalingLink::connect(&config.signaling_url, config.connect_timeout).await {
                Ok(connected) => connected,
                Err(e) => {
                    local_media.stop_all();
                    return Err(e);
                }
            };

        info!("Sending join message for peer {}", local_peer_id);
        let join = SignalMessage::Join {
            room_id: config.room_id.clone(),
            peer_id: local_peer_id.clone(),
        };
        if let Err(e) = link.send(&join) {
            link.close();
            local_media.stop_all();
            return Err(e);
        }

        let (events, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(CallShared {
            local_peer_id,
            config,
            capture,
            transports,
            local_media,
            link: Arc::new(link),
            peers: DashMap::new(),
            events,
        });
        let dispatch = tokio::spawn(shared.clone().dispatch_loop(link_events));

        Ok((
            Self {
                shared,
                dispatch: Some(dispatch),
            },
            events_rx,
        ))
    }

    pub fn local_peer_id(&self) -> &PeerId {
        &self.shared.local_peer_id
    }

    pub fn local_media(&self) -> &LocalMedia {
        &self.shared.local_media
    }

    /// Remote peers with an orchestrator, in id order.
    pub fn peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.shared.peers.iter().map(|e| e.key().clone()).collect();
        peers.sort();
        peers
    }

    pub fn orchestrator(&self, peer_id: &PeerId) -> Option<Arc<ConnectionOrchestrator>> {
        self.shared.peer(peer_id)
    }

    /// Remote media of every peer, merged.
    pub async fn remote_media(&self) -> RemoteMediaSnapshot {
        let orchestrators: Vec<_> = self
            .shared
            .peers
            .iter()
            .map(|e| e.orchestrator.clone())
            .collect();

        let mut snapshot = RemoteMediaSnapshot::new();
        for orchestrator in orchestrators {
            snapshot.extend(orchestrator.remote_media().await);
        }
        snapshot
    }

    /// Flips the first local audio track for every peer. Returns whether
    /// audio is now muted.
    pub fn toggle_audio(&self) -> bool {
        self.toggle(MediaKind::Audio)
    }

    /// Flips the first local video track for every peer. Returns whether
    /// video is now off.
    pub fn toggle_video(&self) -> bool {
        self.toggle(MediaKind::Video)
    }

    fn toggle(&self, kind: MediaKind) -> bool {
        let Some(track) = self.shared.local_media.first_track(kind) else {
            return false;
        };
        if track.is_stopped() {
            return false;
        }

        let enabled = !track.is_enabled();
        track.set_enabled(enabled);
        !enabled
    }

    /// Leaves the room and tears every peer session down. Safe to repeat.
    pub async fn end_call(&mut self) {
        info!("Ending call for {}", self.shared.local_peer_id);

        if let Some(dispatch) = self.dispatch.take() {
            dispatch.abort();
            let _ = dispatch.await;
        }
        self.shared.link.close();

        let peers: Vec<PeerId> = self.shared.peers.iter().map(|e| e.key().clone()).collect();
        for peer_id in peers {
            self.shared.close_peer(&peer_id).await;
        }
        self.shared.local_media.stop_all();
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        if let Some(dispatch) = self.dispatch.take() {
            dispatch.abort();
        }
        self.shared.link.close();

        let peers: Vec<PeerId> = self.shared.peers.iter().map(|e| e.key().clone()).collect();
        let mut orphans = Vec::with_capacity(peers.len());
        for peer_id in peers {
            if let Some((_, entry)) = self.shared.peers.remove(&peer_id) {
                entry.pump.abort();
                orphans.push(entry.orchestrator);
            }
        }

        if !orphans.is_empty() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        for orchestrator in orphans {
                            orchestrator.disconnect().await;
                        }
                    });
                }
                Err(_) => warn!("No runtime to close {} peer sessions", orphans.len()),
            }
        }

        self.shared.local_media.stop_all();
    }
}

impl CallShared {
    fn emit(&self, event: CallEvent) {
        if self.events.send(event).is_err() {
            debug!("Call event dropped: receiver closed");
        }
    }

    fn peer(&self, peer_id: &PeerId) -> Option<Arc<ConnectionOrchestrator>> {
        self.peers.get(peer_id).map(|e| e.orchestrator.clone())
    }

    async fn live_peer(&self, peer_id: &PeerId) -> Option<Arc<ConnectionOrchestrator>> {
        let orchestrator = self.peer(peer_id)?;
        if orchestrator.state().await.is_terminal() {
            None
        } else {
            Some(orchestrator)
        }
    }

    async fn close_peer(&self, peer_id: &PeerId) {
        if let Some((_, entry)) = self.peers.remove(peer_id) {
            entry.orchestrator.disconnect().await;
            entry.pump.abort();
        }
    }

    /// Returns the live session for `peer_id`, replacing a failed or closed
    /// one with a fresh session on a new transport.
    async fn open_peer(&self, peer_id: &PeerId) -> Option<Arc<ConnectionOrchestrator>> {
        if let Some(live) = self.live_peer(peer_id).await {
            return Some(live);
        }
        self.close_peer(peer_id).await;

        let PeerTransport {
            transport,
            mut events,
        } = match self.transports.create().await {
            Ok(created) => created,
            Err(e) => {
                error!("Failed to create transport for {}: {}", peer_id, e);
                self.emit(CallEvent::Error(e));
                return None;
            }
        };

        info!("Opening peer session with {}", peer_id);
        let (orchestrator, session_events) = ConnectionOrchestrator::new(
            self.local_peer_id.clone(),
            self.config.room_id.clone(),
            self.capture.clone(),
            transport,
        );
        let orchestrator = Arc::new(
            orchestrator
                .with_media_retry(self.config.media_retry)
                .with_constraints(self.config.constraints),
        );

        tokio::spawn(Self::forward_events(
            peer_id.clone(),
            session_events,
            self.events.clone(),
        ));
        let pump = tokio::spawn({
            let orchestrator = orchestrator.clone();
            let peer_id = peer_id.clone();
            async move {
                while let Some(event) = events.recv().await {
                    orchestrator.handle_negotiation_event(event).await;
                }
                debug!("Transport event stream for {} ended", peer_id);
            }
        });
        self.peers.insert(
            peer_id.clone(),
            PeerEntry {
                orchestrator: orchestrator.clone(),
                pump,
            },
        );

        orchestrator.attach_signaling(self.link.clone()).await;
        orchestrator
            .adopt_media(self.local_media.clone())
            .await
            .ok()?;
        Some(orchestrator)
    }

    /// Ends once the orchestrator, and with it the sender, is dropped.
    async fn forward_events(
        peer_id: PeerId,
        mut session_events: mpsc::UnboundedReceiver<SessionEvent>,
        events: mpsc::UnboundedSender<CallEvent>,
    ) {
        while let Some(event) = session_events.recv().await {
            let event = CallEvent::Peer {
                peer_id: peer_id.clone(),
                event,
            };
            if events.send(event).is_err() {
                break;
            }
        }
    }

    async fn dispatch_loop(self: Arc<Self>, mut link_events: mpsc::UnboundedReceiver<LinkEvent>) {
        while let Some(event) = link_events.recv().await {
            match event {
                LinkEvent::Message(msg) => self.dispatch(msg).await,
                LinkEvent::Invalid(text) => {
                    debug!("Unparsable signaling frame: {}", text);
                    self.emit(CallEvent::Error(Error::InvalidMessage(
                        "Failed to parse signaling message".to_string(),
                    )));
                }
                LinkEvent::Failed(_) => {
                    self.emit(CallEvent::Error(Error::SignalingUnavailable(
                        "Signaling server connection failed".to_string(),
                    )));
                }
                LinkEvent::Closed => {
                    self.emit(CallEvent::Error(Error::SignalingUnavailable(
                        "Signaling server disconnected".to_string(),
                    )));
                    break;
                }
            }
        }
    }

    /// Routes one relay message to the session of the peer that sent it.
    /// Negotiation messages addressed to another peer are ignored.
    async fn dispatch(&self, msg: SignalMessage) {
        let local = &self.local_peer_id;

        match msg {
            SignalMessage::PeerDiscovered { peer_id, .. } => {
                if peer_id == *local {
                    debug!("Ignoring own peer id {}", peer_id);
                } else if self.live_peer(&peer_id).await.is_some() {
                    debug!("Already negotiating with {}", peer_id);
                } else if let Some(orchestrator) = self.open_peer(&peer_id).await {
                    info!("Creating offer for discovered peer {}", peer_id);
                    orchestrator.create_offer(peer_id).await;
                }
            }
            SignalMessage::Offer {
                offer,
                peer_id,
                target_peer_id,
                ..
            } if target_peer_id == *local => {
                info!("Handling offer from {}", peer_id);
                if let Some(orchestrator) = self.open_peer(&peer_id).await {
                    orchestrator.handle_offer(offer, peer_id).await;
                }
            }
            SignalMessage::Answer {
                answer,
                peer_id,
                target_peer_id,
                ..
            } if target_peer_id == *local => match self.peer(&peer_id) {
                Some(orchestrator) => {
                    info!("Handling answer from {}", peer_id);
                    orchestrator.handle_answer(answer).await;
                }
                None => debug!("Dropping answer from unknown peer {}", peer_id),
            },
            SignalMessage::IceCandidate {
                candidate,
                peer_id,
                target_peer_id,
                ..
            } if target_peer_id == *local => match self.peer(&peer_id) {
                Some(orchestrator) => {
                    debug!("Handling ICE candidate from {}", peer_id);
                    orchestrator.handle_ice_candidate(candidate).await;
                }
                None => debug!("Dropping ICE candidate from unknown peer {}", peer_id),
            },
            SignalMessage::Error { message } => {
                self.emit(CallEvent::RelayError { message });
            }
            other => debug!("Ignoring {} message", other.kind()),
        }
    }
}
