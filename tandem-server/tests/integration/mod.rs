pub mod connection_tests;
pub mod relay_tests;

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Level;

use tandem_core::{PeerId, SignalMessage};
use tandem_server::{RoomCommand, RoomCoordinator};

use crate::utils::MockSignalingOutput;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_test_coordinator() -> (
    mpsc::Sender<RoomCommand>,
    mpsc::UnboundedReceiver<(PeerId, SignalMessage)>,
    MockSignalingOutput,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<RoomCommand>(100);
    let (signaling, signal_rx) = MockSignalingOutput::new();

    let coordinator = RoomCoordinator::new(cmd_rx, Arc::new(signaling.clone()));

    tokio::spawn(async move {
        coordinator.run().await;
    });

    (cmd_tx, signal_rx, signaling)
}
