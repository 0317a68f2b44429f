use tandem_core::{PeerId, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::{SIGNAL_TIMEOUT_MS, SILENCE_MS, TestClient, spawn_relay};

#[tokio::test]
async fn test_unknown_target_dropped() {
    init_tracing();
    let base = spawn_relay().await.expect("relay failed to start");

    let mut alice = TestClient::connect(&base, Some("alice")).await.unwrap();
    let mut bob = TestClient::connect(&base, Some("bob")).await.unwrap();

    alice
        .send(&SignalMessage::Answer {
            to: PeerId::from("nobody"),
            from: None,
            session: None,
            sdp: "v=0".into(),
        })
        .await
        .unwrap();
    alice
        .send_raw(r#"{"type":"offer","sdp":"v=0"}"#)
        .await
        .unwrap();

    assert!(alice.expect_silence(SILENCE_MS).await);
    assert!(bob.expect_silence(SILENCE_MS).await);

    // Routing keeps working for live targets.
    alice
        .send(&SignalMessage::Offer {
            to: PeerId::from("bob"),
            from: None,
            session: None,
            sdp: "v=0".into(),
        })
        .await
        .unwrap();
    assert!(matches!(
        bob.recv_signal(SIGNAL_TIMEOUT_MS).await.unwrap(),
        SignalMessage::Offer { .. }
    ));
}
