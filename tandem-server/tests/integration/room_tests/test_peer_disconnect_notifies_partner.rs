use tandem_core::{PeerId, SignalMessage};
use tandem_server::RoomCommand;

use crate::integration::{create_test_coordinator, init_tracing};

#[tokio::test]
async fn test_peer_disconnect_notifies_partner() {
    init_tracing();

    let (cmd_tx, mut signal_rx, _signaling) = create_test_coordinator();
    let alice = PeerId::from("alice");
    let bob = PeerId::from("bob");

    for peer_id in [&alice, &bob] {
        cmd_tx
            .send(RoomCommand::Join {
                peer_id: peer_id.clone(),
                room: "chat".into(),
            })
            .await
            .unwrap();
    }
    signal_rx.recv().await.unwrap();
    signal_rx.recv().await.unwrap();

    cmd_tx
        .send(RoomCommand::Disconnect {
            peer_id: bob.clone(),
        })
        .await
        .unwrap();

    let (to, msg) = signal_rx.recv().await.unwrap();
    assert_eq!(to, alice);
    assert_eq!(msg, SignalMessage::UserLeft { user_id: bob });
}
