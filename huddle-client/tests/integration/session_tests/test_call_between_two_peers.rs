use crate::integration::{init_tracing, wait_for_state};
use crate::utils::*;
use huddle_client::ConnectionState;
use huddle_core::{PeerId, SessionDescription};

#[tokio::test]
async fn test_call_between_two_peers() {
    init_tracing();

    let relay = TestRelay::start().await.expect("Failed to start relay");

    let mut a = join_call(&relay, "A").await;
    relay
        .wait_for_members("r1", &["A"])
        .await
        .expect("A never joined");

    let mut b = join_call(&relay, "B").await;
    relay
        .wait_for_members("r1", &["A", "B"])
        .await
        .expect("B never joined");

    // Both sides offer on discovery; B has the greater id and yields.
    let a_to_b = a.wait_for_peer("B").await;
    let b_to_a = b.wait_for_peer("A").await;
    wait_for_state(&a_to_b, ConnectionState::Connected).await;
    wait_for_state(&b_to_a, ConnectionState::Connected).await;

    let a_calls = a.transports.drain_calls().await;
    let b_calls = b.transports.drain_calls().await;

    assert!(a_calls.contains(&TransportCall::SetRemote(SessionDescription::answer(
        "answer-1"
    ))));
    assert!(
        !a_calls.contains(&TransportCall::CreateAnswer),
        "A never answers the colliding offer"
    );
    assert!(b_calls.contains(&TransportCall::SetLocal(SessionDescription::rollback())));
    assert!(b_calls.contains(&TransportCall::SetRemote(SessionDescription::offer(
        "offer-1"
    ))));

    assert_eq!(a_to_b.target().await, Some(PeerId::from("B")));
    assert_eq!(b_to_a.target().await, Some(PeerId::from("A")));
    assert_eq!(a.transports.created().await, 1);
    assert_eq!(a.session.peers(), vec![PeerId::from("B")]);

    a.session.end_call().await;
    relay
        .wait_for_members("r1", &["B"])
        .await
        .expect("A still listed after hanging up");
    assert_eq!(a_to_b.state().await, ConnectionState::Closed);
    assert!(a.session.peers().is_empty());
    assert!(
        a.session
            .local_media()
            .tracks()
            .iter()
            .all(|t| t.is_stopped())
    );

    a.session.end_call().await;
    b.session.end_call().await;
    relay
        .wait_for_no_rooms()
        .await
        .expect("room not removed after last peer left");

    relay.stop();
}
