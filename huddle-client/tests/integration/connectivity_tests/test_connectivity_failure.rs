use crate::integration::{init_tracing, ready_session};
use crate::utils::*;
use huddle_client::{ConnectionState, IceConnectionState, NegotiationEvent, PeerConnectionState};
use huddle_core::{Error, PeerId, SessionDescription};

#[tokio::test]
async fn test_ice_failure_marks_session_failed() {
    init_tracing();

    let mut session = ready_session("A").await;
    session.orchestrator.create_offer(PeerId::from("B")).await;
    session
        .orchestrator
        .handle_answer(SessionDescription::answer("answer-from-B"))
        .await;
    session.clear();

    session
        .orchestrator
        .handle_negotiation_event(NegotiationEvent::IceConnectionStateChanged(
            IceConnectionState::Failed,
        ))
        .await;

    assert_eq!(
        session.errors(),
        vec![Error::IceFailed("ICE connection failed".to_string())]
    );
    assert_eq!(session.orchestrator.state().await, ConnectionState::Failed);
    assert!(session.transport_calls().is_empty(), "no restart after failure");

    session.orchestrator.create_offer(PeerId::from("B")).await;
    assert_eq!(
        session.errors(),
        vec![Error::NegotiationFailed(
            "Cannot create offer in state failed".to_string()
        )]
    );

    session.orchestrator.disconnect().await;
    assert_eq!(session.orchestrator.state().await, ConnectionState::Closed);
    assert_eq!(session.transport_calls(), vec![TransportCall::Close]);
}

#[tokio::test]
async fn test_peer_connection_failure() {
    init_tracing();

    let mut session = ready_session("A").await;
    session.orchestrator.create_offer(PeerId::from("B")).await;
    session.clear();

    session
        .orchestrator
        .handle_negotiation_event(NegotiationEvent::PeerConnectionStateChanged(
            PeerConnectionState::Failed,
        ))
        .await;

    assert_eq!(
        session.drain_events(),
        vec![
            huddle_client::SessionEvent::StateChanged(ConnectionState::Failed),
            huddle_client::SessionEvent::Error(Error::NegotiationFailed(
                "Peer connection failed".to_string()
            )),
        ]
    );
}
