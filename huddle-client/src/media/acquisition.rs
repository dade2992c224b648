use crate::capability::{LocalMedia, MediaCapture, MediaConstraints};
use crate::retry::RetryPolicy;
use huddle_core::{Error, Result};
use tracing::{debug, error};

/// Acquires local media under `policy`. Running out of attempts yields
/// `MediaAcquisitionFailed` naming the attempt count.
pub async fn acquire_local_media(
    capture: &dyn MediaCapture,
    constraints: MediaConstraints,
    policy: &RetryPolicy,
) -> Result<LocalMedia> {
    policy
        .run(move |attempt| {
            debug!("Acquiring local media (attempt {})", attempt);
            capture.acquire(constraints)
        })
        .await
        .map_err(|e| {
            error!("Media acquisition failed: {}", e);
            Error::MediaAcquisitionFailed(format!(
                "Failed to get media stream after {} attempts",
                policy.max_attempts.max(1)
            ))
        })
}
