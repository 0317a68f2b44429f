use tandem_core::{PeerId, Role, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::{SIGNAL_TIMEOUT_MS, SILENCE_MS, TestClient, spawn_relay};

#[tokio::test]
async fn test_reregistration_releases_room() {
    init_tracing();
    let base = spawn_relay().await.expect("relay failed to start");

    let mut alice = TestClient::connect(&base, Some("alice")).await.unwrap();
    let mut bob_old = TestClient::connect(&base, Some("bob")).await.unwrap();

    alice.join("chat").await.unwrap();
    bob_old.join("chat").await.unwrap();
    alice.recv_signal(SIGNAL_TIMEOUT_MS).await.unwrap();
    bob_old.recv_signal(SIGNAL_TIMEOUT_MS).await.unwrap();

    // Same id on a fresh socket while the old one is still open.
    let mut bob_new = TestClient::connect(&base, Some("bob")).await.unwrap();
    assert_eq!(
        alice.recv_signal(SIGNAL_TIMEOUT_MS).await.unwrap(),
        SignalMessage::UserLeft {
            user_id: PeerId::from("bob")
        }
    );

    bob_new.join("chat").await.unwrap();
    assert_eq!(
        bob_new.recv_signal(SIGNAL_TIMEOUT_MS).await.unwrap(),
        SignalMessage::UserJoined {
            user_id: PeerId::from("alice"),
            role: Role::Callee
        }
    );
    assert_eq!(
        alice.recv_signal(SIGNAL_TIMEOUT_MS).await.unwrap(),
        SignalMessage::OtherUser {
            user_id: PeerId::from("bob"),
            role: Role::Caller
        }
    );

    // The displaced socket closing later does not evict the new membership.
    bob_old.close().await.unwrap();
    assert!(alice.expect_silence(SILENCE_MS).await);

    bob_new
        .send(&SignalMessage::Offer {
            to: PeerId::from("alice"),
            from: None,
            session: None,
            sdp: "v=0".into(),
        })
        .await
        .unwrap();
    assert!(matches!(
        alice.recv_signal(SIGNAL_TIMEOUT_MS).await.unwrap(),
        SignalMessage::Offer { .. }
    ));
}
