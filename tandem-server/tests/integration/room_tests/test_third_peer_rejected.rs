use tandem_core::{PeerId, SignalMessage};
use tandem_server::RoomCommand;

use crate::integration::{create_test_coordinator, init_tracing};

#[tokio::test]
async fn test_third_peer_rejected() {
    init_tracing();

    let (cmd_tx, mut signal_rx, signaling) = create_test_coordinator();

    for id in ["a", "b", "c"] {
        cmd_tx
            .send(RoomCommand::Join {
                peer_id: PeerId::from(id),
                room: "chat".into(),
            })
            .await
            .unwrap();
    }

    for _ in 0..3 {
        signal_rx.recv().await.unwrap();
    }

    assert_eq!(
        signaling.signals_for(&PeerId::from("c")).await,
        vec![SignalMessage::RoomFull {
            room: "chat".into()
        }]
    );
    assert_eq!(signaling.signals_for(&PeerId::from("a")).await.len(), 1);
    assert_eq!(signaling.signals_for(&PeerId::from("b")).await.len(), 1);

    // The rejected peer was never an occupant, so its disconnect is silent.
    cmd_tx
        .send(RoomCommand::Disconnect {
            peer_id: PeerId::from("c"),
        })
        .await
        .unwrap();
    cmd_tx
        .send(RoomCommand::Disconnect {
            peer_id: PeerId::from("b"),
        })
        .await
        .unwrap();

    let (to, msg) = signal_rx.recv().await.unwrap();
    assert_eq!(to, PeerId::from("a"));
    assert_eq!(
        msg,
        SignalMessage::UserLeft {
            user_id: PeerId::from("b")
        }
    );
    assert_eq!(signaling.count().await, 4);
}
