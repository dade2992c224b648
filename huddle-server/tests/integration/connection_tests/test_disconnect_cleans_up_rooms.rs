use crate::integration::init_tracing;
use crate::utils::{TestClient, TestRelay, join_message, wait_for_members, wait_for_no_rooms};

#[tokio::test]
async fn test_disconnect_cleans_up_rooms() {
    init_tracing();

    let relay = TestRelay::start().await.expect("Failed to start relay");
    let mut client = TestClient::connect(&relay.url(), "A")
        .await
        .expect("Failed to connect");

    client
        .send_json(&join_message("r1", "A"))
        .await
        .expect("Send failed");
    client
        .send_json(&join_message("r2", "A"))
        .await
        .expect("Send failed");

    wait_for_members(&relay.service, "r1", &["A"]).await.unwrap();
    wait_for_members(&relay.service, "r2", &["A"]).await.unwrap();

    client.close().await.expect("Failed to close client");

    wait_for_no_rooms(&relay.service)
        .await
        .expect("Rooms should be deleted once empty");
    assert_eq!(relay.service.connection_count(), 0);

    relay.stop().await.unwrap();
}
