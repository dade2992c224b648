use crate::integration::{init_tracing, ready_session};
use crate::utils::*;
use huddle_client::{ConnectionState, IceConnectionState, NegotiationEvent};
use huddle_core::{Error, PeerId, RoomId, SessionDescription, SignalMessage};

#[tokio::test]
async fn test_ice_disconnect_triggers_one_restart() {
    init_tracing();

    let mut session = ready_session("A").await;
    session.orchestrator.create_offer(PeerId::from("B")).await;
    session
        .orchestrator
        .handle_answer(SessionDescription::answer("answer-from-B"))
        .await;
    assert_eq!(session.orchestrator.state().await, ConnectionState::Connected);
    session.clear();

    session
        .orchestrator
        .handle_negotiation_event(NegotiationEvent::IceConnectionStateChanged(
            IceConnectionState::Disconnected,
        ))
        .await;

    assert_eq!(
        session.transport_calls(),
        vec![
            TransportCall::CreateOffer { ice_restart: true },
            TransportCall::SetLocal(SessionDescription::offer("offer-2-restart")),
        ]
    );
    assert_eq!(
        session.sent_messages(),
        vec![SignalMessage::Offer {
            offer: SessionDescription::offer("offer-2-restart"),
            room_id: RoomId::from("r1"),
            peer_id: PeerId::from("A"),
            target_peer_id: PeerId::from("B"),
        }],
        "exactly one restart offer, addressed to the bound peer"
    );
    assert_eq!(
        session.states(),
        vec![ConnectionState::Negotiating],
        "restart does not report an error"
    );

    session
        .orchestrator
        .handle_answer(SessionDescription::answer("restart-answer-from-B"))
        .await;
    assert_eq!(session.orchestrator.state().await, ConnectionState::Connected);
}

#[tokio::test]
async fn test_ice_restart_needs_target() {
    init_tracing();

    let mut session = ready_session("A").await;
    session
        .orchestrator
        .handle_negotiation_event(NegotiationEvent::IceConnectionStateChanged(
            IceConnectionState::Disconnected,
        ))
        .await;

    assert_eq!(
        session.errors(),
        vec![Error::NegotiationFailed(
            "Cannot restart ICE: no target peer bound".to_string()
        )]
    );
    assert!(session.transport_calls().is_empty());
    assert!(session.sent_messages().is_empty());
    assert_eq!(session.orchestrator.state().await, ConnectionState::Ready);
}

#[tokio::test]
async fn test_benign_ice_states_ignored() {
    init_tracing();

    let mut session = ready_session("A").await;
    session.orchestrator.create_offer(PeerId::from("B")).await;
    session.clear();

    for state in [
        IceConnectionState::Checking,
        IceConnectionState::Connected,
        IceConnectionState::Completed,
    ] {
        session
            .orchestrator
            .handle_negotiation_event(NegotiationEvent::IceConnectionStateChanged(state))
            .await;
    }

    assert!(session.drain_events().is_empty());
    assert!(session.transport_calls().is_empty());
    assert!(session.sent_messages().is_empty());
}
