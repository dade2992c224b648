use crate::integration::{create_session, init_tracing, ready_session};
use crate::utils::*;
use huddle_client::MediaKind;

#[tokio::test]
async fn test_toggle_tracks() {
    init_tracing();

    let session = ready_session("A").await;
    let media = session.local_media().await;
    let audio = media
        .first_track(MediaKind::Audio)
        .expect("audio track");
    let video = media
        .first_track(MediaKind::Video)
        .expect("video track");

    assert!(session.orchestrator.toggle_audio().await, "audio now muted");
    assert!(!audio.is_enabled());
    assert!(video.is_enabled(), "video untouched");

    assert!(!session.orchestrator.toggle_audio().await, "audio unmuted");
    assert!(audio.is_enabled());

    assert!(session.orchestrator.toggle_video().await, "video now off");
    assert!(!video.is_enabled());

    session.orchestrator.disconnect().await;
    assert!(!session.orchestrator.toggle_audio().await);
    assert!(!session.orchestrator.toggle_video().await);
}

#[tokio::test]
async fn test_toggle_without_media() {
    init_tracing();

    let session = create_session("A", MockCapture::working());

    assert!(!session.orchestrator.toggle_audio().await);
    assert!(!session.orchestrator.toggle_video().await);
}
