use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{SILENCE_MS, TestClient, TestRelay, join_message, wait_for_members};

#[tokio::test]
async fn test_invalid_frames_rejected() {
    init_tracing();

    let relay = TestRelay::start().await.expect("Failed to start relay");
    let mut client = TestClient::connect(&relay.url(), "A")
        .await
        .expect("Failed to connect");

    let cases = [
        (json!({ "type": "join", "roomId": "r1" }).to_string(), "Missing roomId or peerId"),
        (json!({ "type": "join", "roomId": "", "peerId": "A" }).to_string(), "Missing roomId or peerId"),
        (
            json!({ "type": "offer", "roomId": "r1", "offer": {} }).to_string(),
            "Missing roomId or targetPeerId",
        ),
        (json!({ "type": "bogus" }).to_string(), "Unknown message type"),
        ("not json".to_string(), "Invalid message format"),
    ];

    for (frame, expected) in cases {
        client.send_raw(&frame).await.expect("Send failed");
        let reply = client.recv_json().await.expect("No reply");
        assert_eq!(reply["type"], "error", "frame {}", frame);
        assert_eq!(reply["message"], expected, "frame {}", frame);
    }

    client
        .send_binary(vec![0xff, 0xfe, 0x00])
        .await
        .expect("Send failed");
    let reply = client.recv_json().await.expect("No reply");
    assert_eq!(reply["message"], "Invalid message format");

    // Rejections never create rooms and the connection stays usable.
    assert!(relay.service.snapshot().await.unwrap().is_empty());
    client.expect_silence(SILENCE_MS).await.expect("Unexpected frame");

    client.close().await.expect("Failed to close client");
    relay.stop().await.unwrap();
}

#[tokio::test]
async fn test_incomplete_relay_not_forwarded() {
    init_tracing();

    let relay = TestRelay::start().await.expect("Failed to start relay");
    let url = relay.url();

    let mut a = TestClient::connect(&url, "A").await.expect("Failed to connect A");
    let mut b = TestClient::connect(&url, "B").await.expect("Failed to connect B");
    a.send_json(&join_message("r1", "A")).await.unwrap();
    wait_for_members(&relay.service, "r1", &["A"]).await.unwrap();
    b.send_json(&join_message("r1", "B")).await.unwrap();
    wait_for_members(&relay.service, "r1", &["A", "B"]).await.unwrap();
    assert_eq!(a.recv_json().await.unwrap()["peerId"], "B");
    assert_eq!(b.recv_json().await.unwrap()["peerId"], "A");

    let incomplete = [
        json!({
            "type": "offer",
            "offer": { "type": "offer", "sdp": "v=0" },
            "peerId": "B",
            "targetPeerId": "A",
        }),
        json!({
            "type": "ice-candidate",
            "candidate": { "candidate": "candidate:1" },
            "roomId": "r1",
            "peerId": "B",
        }),
    ];

    for frame in &incomplete {
        b.send_json(frame).await.expect("Send failed");
        let reply = b.recv_json().await.expect("No reply");
        assert_eq!(reply["type"], "error", "frame {}", frame);
        assert_eq!(reply["message"], "Missing roomId or targetPeerId");
    }

    // Only the sender hears about it; the intended target gets nothing.
    a.expect_silence(SILENCE_MS).await.expect("Incomplete message was forwarded");

    a.close().await.unwrap();
    b.close().await.unwrap();
    relay.stop().await.unwrap();
}
