use std::time::Duration;

use tandem_core::PeerId;
use tandem_server::RoomCommand;

use crate::integration::{create_test_coordinator, init_tracing};

#[tokio::test]
async fn test_leave_empty_room_is_noop() {
    init_tracing();

    let (cmd_tx, mut signal_rx, signaling) = create_test_coordinator();
    let alice = PeerId::from("alice");

    cmd_tx
        .send(RoomCommand::Leave {
            peer_id: alice.clone(),
            room: "nowhere".into(),
        })
        .await
        .unwrap();
    cmd_tx
        .send(RoomCommand::Disconnect {
            peer_id: alice.clone(),
        })
        .await
        .unwrap();

    // The coordinator keeps serving after the no-ops.
    cmd_tx
        .send(RoomCommand::Join {
            peer_id: alice.clone(),
            room: "chat".into(),
        })
        .await
        .unwrap();
    cmd_tx
        .send(RoomCommand::Join {
            peer_id: PeerId::from("bob"),
            room: "chat".into(),
        })
        .await
        .unwrap();

    let (to, _) = tokio::time::timeout(Duration::from_secs(2), signal_rx.recv())
        .await
        .expect("coordinator stalled")
        .unwrap();
    assert_eq!(to, alice);
    assert_eq!(signaling.signals_for(&alice).await.len(), 1);
}
