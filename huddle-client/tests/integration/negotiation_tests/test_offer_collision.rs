use crate::integration::{init_tracing, ready_session};
use crate::utils::*;
use huddle_client::ConnectionState;
use huddle_core::{PeerId, RoomId, SessionDescription, SignalMessage};

#[tokio::test]
async fn test_lower_id_keeps_its_offer() {
    init_tracing();

    let mut session = ready_session("A").await;
    session.orchestrator.create_offer(PeerId::from("B")).await;
    session.clear();

    session
        .orchestrator
        .handle_offer(SessionDescription::offer("offer-from-B"), PeerId::from("B"))
        .await;

    assert!(session.transport_calls().is_empty());
    assert!(session.sent_messages().is_empty());
    assert!(session.errors().is_empty());
    assert_eq!(
        session.orchestrator.state().await,
        ConnectionState::Negotiating
    );
}

#[tokio::test]
async fn test_higher_id_rolls_back_and_answers() {
    init_tracing();

    let mut session = ready_session("B").await;
    session.orchestrator.create_offer(PeerId::from("A")).await;
    session.clear();

    session
        .orchestrator
        .handle_offer(SessionDescription::offer("offer-from-A"), PeerId::from("A"))
        .await;

    assert_eq!(
        session.transport_calls(),
        vec![
            TransportCall::SetLocal(SessionDescription::rollback()),
            TransportCall::SetRemote(SessionDescription::offer("offer-from-A")),
            TransportCall::CreateAnswer,
            TransportCall::SetLocal(SessionDescription::answer("answer-1")),
        ]
    );
    assert_eq!(
        session.sent_messages(),
        vec![SignalMessage::Answer {
            answer: SessionDescription::answer("answer-1"),
            room_id: RoomId::from("r1"),
            peer_id: PeerId::from("B"),
            target_peer_id: PeerId::from("A"),
        }]
    );
    assert_eq!(session.orchestrator.state().await, ConnectionState::Connected);
    assert!(session.errors().is_empty());
}

#[tokio::test]
async fn test_rejected_answer_clears_pending_offer() {
    init_tracing();

    let mut session = ready_session("A").await;
    session.orchestrator.create_offer(PeerId::from("B")).await;
    session.clear();

    session.transport.fail_remote_descriptions(true);
    session
        .orchestrator
        .handle_answer(SessionDescription::answer("bad-answer-from-B"))
        .await;
    assert_eq!(
        session.errors(),
        vec![huddle_core::Error::NegotiationFailed(
            "remote description rejected".to_string()
        )]
    );
    session.transport.fail_remote_descriptions(false);
    session.transport_calls();

    // B's fresh offer is no longer treated as a collision.
    session
        .orchestrator
        .handle_offer(SessionDescription::offer("offer-from-B"), PeerId::from("B"))
        .await;

    assert_eq!(
        session.transport_calls(),
        vec![
            TransportCall::SetRemote(SessionDescription::offer("offer-from-B")),
            TransportCall::CreateAnswer,
            TransportCall::SetLocal(SessionDescription::answer("answer-1")),
        ]
    );
    assert_eq!(session.sent_messages().len(), 1);
    assert_eq!(session.orchestrator.state().await, ConnectionState::Connected);
}
