use crate::integration::init_tracing;
use crate::utils::{
    SILENCE_MS, TestClient, TestRelay, join_message, offer_message, wait_for_members,
};

#[tokio::test]
async fn test_relay_without_target_dropped() {
    init_tracing();

    let relay = TestRelay::start().await.expect("Failed to start relay");
    let url = relay.url();

    let mut a = TestClient::connect(&url, "A").await.expect("Failed to connect A");
    a.send_json(&join_message("r1", "A")).await.unwrap();
    wait_for_members(&relay.service, "r1", &["A"]).await.unwrap();

    // Unknown target and unknown room are dropped without an error reply.
    a.send_json(&offer_message("r1", "A", "ghost")).await.unwrap();
    a.send_json(&offer_message("nowhere", "A", "B")).await.unwrap();
    a.expect_silence(SILENCE_MS).await.unwrap();

    // A target that has already left is dropped the same way.
    let mut b = TestClient::connect(&url, "B").await.expect("Failed to connect B");
    b.send_json(&join_message("r1", "B")).await.unwrap();
    assert_eq!(a.recv_json().await.unwrap()["peerId"], "B");
    b.close().await.unwrap();
    wait_for_members(&relay.service, "r1", &["A"]).await.unwrap();

    a.send_json(&offer_message("r1", "A", "B")).await.unwrap();
    a.expect_silence(SILENCE_MS).await.unwrap();

    a.close().await.unwrap();
    relay.stop().await.unwrap();
}
