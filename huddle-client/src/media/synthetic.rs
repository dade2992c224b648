use crate::capability::{LocalMedia, MediaCapture, MediaConstraints, MediaKind, MediaTrack};
use async_trait::async_trait;
use huddle_core::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use uuid::Uuid;

/// Capture track with no device behind it.
#[derive(Debug)]
pub struct SyntheticTrack {
    id: String,
    kind: MediaKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

impl SyntheticTrack {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            id: format!("{}-{}", kind, Uuid::new_v4().simple()),
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        }
    }
}

impl MediaTrack for SyntheticTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Stopped synthetic {} track {}", self.kind, self.id);
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Media source for headless participants: one track per requested kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticCapture;

impl SyntheticCapture {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaCapture for SyntheticCapture {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<LocalMedia> {
        let mut tracks: Vec<Arc<dyn MediaTrack>> = Vec::new();
        if constraints.audio {
            tracks.push(Arc::new(SyntheticTrack::new(MediaKind::Audio)));
        }
        if constraints.video {
            tracks.push(Arc::new(SyntheticTrack::new(MediaKind::Video)));
        }

        if tracks.is_empty() {
            return Err(Error::MediaAcquisitionFailed(
                "No media kinds requested".to_string(),
            ));
        }

        Ok(LocalMedia::new(
            format!("stream-{}", Uuid::new_v4().simple()),
            tracks,
        ))
    }
}
