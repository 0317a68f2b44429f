use tandem_core::{PeerId, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::{SIGNAL_TIMEOUT_MS, TestClient, spawn_relay};

#[tokio::test]
async fn test_registration_handshake() {
    init_tracing();
    let base = spawn_relay().await.expect("relay failed to start");

    let named = TestClient::connect(&base, Some("driver-42"))
        .await
        .expect("named connect failed");
    assert_eq!(named.peer_id, PeerId::from("driver-42"));

    let mut anonymous = TestClient::connect(&base, None)
        .await
        .expect("anonymous connect failed");
    assert!(!anonymous.peer_id.as_str().is_empty());
    assert_ne!(anonymous.peer_id, named.peer_id);

    anonymous
        .send(&SignalMessage::Register {
            user_id: PeerId::from("rider-7"),
        })
        .await
        .unwrap();

    match anonymous.recv_signal(SIGNAL_TIMEOUT_MS).await.unwrap() {
        SignalMessage::Registered { user_id } => assert_eq!(user_id, PeerId::from("rider-7")),
        other => panic!("expected registered, got {:?}", other),
    }
    assert!(matches!(
        anonymous.recv_signal(SIGNAL_TIMEOUT_MS).await.unwrap(),
        SignalMessage::IceConfig { .. }
    ));
}
