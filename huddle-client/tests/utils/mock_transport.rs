use async_trait::async_trait;
use huddle_client::{LocalMedia, MediaTrack, NegotiationTransport, OfferOptions};
use huddle_core::{Error, IceCandidateInit, Result, SessionDescription};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::{Mutex, mpsc, oneshot};

/// Every call the orchestrator makes on its transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    CreateOffer { ice_restart: bool },
    CreateAnswer,
    SetLocal(SessionDescription),
    SetRemote(SessionDescription),
    AddIceCandidate(IceCandidateInit),
    AddTrack { track_id: String, stream_id: String },
    Close,
}

/// NegotiationTransport that records calls and hands out numbered SDP
/// blobs (`offer-1`, `answer-1`, ...).
#[derive(Clone)]
pub struct MockTransport {
    tx: mpsc::UnboundedSender<TransportCall>,
    offers: Arc<AtomicU32>,
    answers: Arc<AtomicU32>,
    fail_ice: Arc<AtomicBool>,
    fail_remote: Arc<AtomicBool>,
    offer_gate: Arc<Mutex<Option<oneshot::Receiver<()>>>>,
}

impl MockTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportCall>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            tx,
            offers: Arc::new(AtomicU32::new(0)),
            answers: Arc::new(AtomicU32::new(0)),
            fail_ice: Arc::new(AtomicBool::new(false)),
            fail_remote: Arc::new(AtomicBool::new(false)),
            offer_gate: Arc::new(Mutex::new(None)),
        };
        (transport, rx)
    }

    pub fn fail_ice_candidates(&self, fail: bool) {
        self.fail_ice.store(fail, Ordering::SeqCst);
    }

    pub fn fail_remote_descriptions(&self, fail: bool) {
        self.fail_remote.store(fail, Ordering::SeqCst);
    }

    /// Makes the next `create_offer` wait until the returned sender fires.
    pub async fn hold_next_offer(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.offer_gate.lock().await = Some(rx);
        tx
    }

    fn record(&self, call: TransportCall) {
        tracing::debug!("[MockTransport] {:?}", call);
        let _ = self.tx.send(call);
    }
}

#[async_trait]
impl NegotiationTransport for MockTransport {
    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription> {
        self.record(TransportCall::CreateOffer {
            ice_restart: options.ice_restart,
        });

        let gate = self.offer_gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let n = self.offers.fetch_add(1, Ordering::SeqCst) + 1;
        let suffix = if options.ice_restart { "-restart" } else { "" };
        Ok(SessionDescription::offer(format!("offer-{}{}", n, suffix)))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        self.record(TransportCall::CreateAnswer);
        let n = self.answers.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SessionDescription::answer(format!("answer-{}", n)))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.record(TransportCall::SetLocal(description));
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.record(TransportCall::SetRemote(description));
        if self.fail_remote.load(Ordering::SeqCst) {
            return Err(Error::NegotiationFailed("remote description rejected".to_string()));
        }
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<()> {
        self.record(TransportCall::AddIceCandidate(candidate));
        if self.fail_ice.load(Ordering::SeqCst) {
            return Err(Error::IceFailed("candidate rejected".to_string()));
        }
        Ok(())
    }

    async fn add_track(&self, track: Arc<dyn MediaTrack>, media: &LocalMedia) -> Result<()> {
        self.record(TransportCall::AddTrack {
            track_id: track.id().to_string(),
            stream_id: media.id().to_string(),
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record(TransportCall::Close);
        Ok(())
    }
}
