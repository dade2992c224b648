use crate::integration::{init_tracing, ready_session};
use huddle_client::{
    MediaKind, NegotiationEvent, RemoteMedia, RemoteMediaSnapshot, RemoteTrack, SessionEvent,
};
use huddle_core::PeerId;

fn remote_track(stream: &str, track: &str, kind: MediaKind) -> RemoteTrack {
    RemoteTrack {
        stream_id: stream.to_string(),
        track_id: track.to_string(),
        kind,
    }
}

#[tokio::test]
async fn test_remote_tracks_keyed_by_target() {
    init_tracing();

    let mut session = ready_session("A").await;
    session.orchestrator.create_offer(PeerId::from("B")).await;
    session.clear();

    let audio = remote_track("s1", "audio-1", MediaKind::Audio);
    let video = remote_track("s1", "video-1", MediaKind::Video);

    for track in [audio.clone(), video.clone(), audio.clone()] {
        session
            .orchestrator
            .handle_negotiation_event(NegotiationEvent::TrackReceived(track))
            .await;
    }

    let mut expected = RemoteMediaSnapshot::new();
    expected.insert(
        PeerId::from("B"),
        RemoteMedia {
            stream_id: "s1".to_string(),
            tracks: vec![audio, video],
        },
    );
    assert_eq!(session.orchestrator.remote_media().await, expected);

    let updates: Vec<RemoteMediaSnapshot> = session
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            SessionEvent::RemoteMediaUpdated(snapshot) => Some(snapshot),
            _ => None,
        })
        .collect();
    assert_eq!(updates.len(), 3);
    assert_eq!(updates.last(), Some(&expected), "duplicate track not added twice");

    session.orchestrator.disconnect().await;
    assert!(session.orchestrator.remote_media().await.is_empty());
    assert!(session.drain_events().contains(&SessionEvent::RemoteMediaUpdated(
        RemoteMediaSnapshot::new()
    )));
}

#[tokio::test]
async fn test_remote_track_without_target_dropped() {
    init_tracing();

    let mut session = ready_session("A").await;
    session
        .orchestrator
        .handle_negotiation_event(NegotiationEvent::TrackReceived(remote_track(
            "s1",
            "audio-1",
            MediaKind::Audio,
        )))
        .await;

    assert!(session.orchestrator.remote_media().await.is_empty());
    assert!(session.drain_events().is_empty());
}
