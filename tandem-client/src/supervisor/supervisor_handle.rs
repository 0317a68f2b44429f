use crate::supervisor::{ClientEvent, SupervisorCommand, SupervisorState};
use anyhow::{Context, Result, anyhow};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Application side of a running `ConnectionSupervisor`. Dropping it shuts the
/// session down.
pub struct SupervisorHandle {
    commands: mpsc::UnboundedSender<SupervisorCommand>,
    events: mpsc::UnboundedReceiver<ClientEvent>,
    state: watch::Receiver<SupervisorState>,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<SupervisorCommand>,
        events: mpsc::UnboundedReceiver<ClientEvent>,
        state: watch::Receiver<SupervisorState>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            commands,
            events,
            state,
            task,
        }
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SupervisorState> {
        self.state.clone()
    }

    pub async fn wait_for_state(&self, target: SupervisorState) -> Result<()> {
        let mut state = self.state.clone();
        state
            .wait_for(|s| *s == target)
            .await
            .map(|_| ())
            .map_err(|_| anyhow!("Supervisor stopped before reaching {:?}", target))
    }

    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.events.recv().await
    }

    /// Sends a text message over the data channel. `false` unless the channel is open.
    pub async fn send(&self, text: impl Into<String>) -> bool {
        let (reply, rx) = oneshot::channel();
        let cmd = SupervisorCommand::Send {
            text: text.into(),
            reply,
        };
        if self.commands.send(cmd).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Returns once `leave-room` is sent, the session is torn down and the relay link
    /// is closed.
    pub async fn leave(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SupervisorCommand::Leave { reply })
            .map_err(|_| anyhow!("Supervisor already stopped"))?;
        rx.await.context("Supervisor stopped while leaving")
    }

    /// Starts over on a fresh relay link with a clean negotiator.
    pub async fn reconnect(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SupervisorCommand::Reconnect { reply })
            .map_err(|_| anyhow!("Supervisor already stopped"))?;
        rx.await.context("Supervisor stopped while reconnecting")?
    }

    /// Stops the supervisor and waits for its cleanup.
    pub async fn shutdown(self) {
        let SupervisorHandle { commands, task, .. } = self;
        drop(commands);
        let _ = task.await;
    }
}
