use tandem_core::{PeerId, Role, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::{SIGNAL_TIMEOUT_MS, SILENCE_MS, TestClient, spawn_relay};

#[tokio::test]
async fn test_malformed_frame_ignored() {
    init_tracing();
    let base = spawn_relay().await.expect("relay failed to start");

    let mut alice = TestClient::connect(&base, Some("alice")).await.unwrap();
    let mut bob = TestClient::connect(&base, Some("bob")).await.unwrap();

    alice.send_raw("this is not json").await.unwrap();
    alice.send_raw("[1, 2, 3]").await.unwrap();
    alice.send_raw(r#"{"type": "no-such-kind"}"#).await.unwrap();
    alice.send_raw(r#"{"type": "join-room"}"#).await.unwrap();
    assert!(alice.expect_silence(SILENCE_MS).await);

    // Same socket still works afterwards.
    alice.join("chat").await.unwrap();
    bob.join("chat").await.unwrap();

    assert_eq!(
        alice.recv_signal(SIGNAL_TIMEOUT_MS).await.unwrap(),
        SignalMessage::OtherUser {
            user_id: PeerId::from("bob"),
            role: Role::Caller
        }
    );
    assert_eq!(
        bob.recv_signal(SIGNAL_TIMEOUT_MS).await.unwrap(),
        SignalMessage::UserJoined {
            user_id: PeerId::from("alice"),
            role: Role::Callee
        }
    );
}
