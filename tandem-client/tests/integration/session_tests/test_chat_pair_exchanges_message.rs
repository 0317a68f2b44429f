use crate::integration::init_tracing;
use crate::utils::{CONNECT_TIMEOUT_MS, join, spawn_relay, wait_for_event};
use tandem_client::{ClientEvent, SupervisorState};
use tandem_core::{PeerId, Role};

/// Two clients join "chat", negotiate through the relay and exchange text.
#[tokio::test]
async fn test_chat_pair_exchanges_message() {
    init_tracing();

    let base = spawn_relay().await.unwrap();
    let mut alice = join(&base, "alice", "chat").await.unwrap();
    let mut bob = join(&base, "bob", "chat").await.unwrap();

    let paired = wait_for_event(&mut alice, CONNECT_TIMEOUT_MS, |e| {
        matches!(e, ClientEvent::Paired { .. })
    })
    .await
    .unwrap();
    assert_eq!(
        paired,
        ClientEvent::Paired {
            peer: PeerId::from("bob"),
            role: Role::Caller
        }
    );

    wait_for_event(&mut alice, CONNECT_TIMEOUT_MS, |e| *e == ClientEvent::ChannelOpen)
        .await
        .unwrap();
    wait_for_event(&mut bob, CONNECT_TIMEOUT_MS, |e| *e == ClientEvent::ChannelOpen)
        .await
        .unwrap();
    assert_eq!(alice.state(), SupervisorState::InRoomPaired);
    assert_eq!(bob.state(), SupervisorState::InRoomPaired);

    assert!(alice.send("hello").await);
    let received = wait_for_event(&mut bob, CONNECT_TIMEOUT_MS, |e| {
        matches!(e, ClientEvent::Message(_))
    })
    .await
    .unwrap();
    assert_eq!(received, ClientEvent::Message("hello".into()));

    assert!(bob.send("hi alice").await);
    let received = wait_for_event(&mut alice, CONNECT_TIMEOUT_MS, |e| {
        matches!(e, ClientEvent::Message(_))
    })
    .await
    .unwrap();
    assert_eq!(received, ClientEvent::Message("hi alice".into()));

    alice.leave().await.unwrap();
    assert_eq!(alice.state(), SupervisorState::Left);
    bob.shutdown().await;
}
