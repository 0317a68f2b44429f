use crate::channel::DataChannel;
use crate::config::ClientConfig;
use crate::error::NegotiationError;
use crate::negotiator::SessionNegotiator;
use crate::signaling::{SignalConnector, SignalLink};
use crate::supervisor::{ClientEvent, SupervisorCommand, SupervisorHandle, SupervisorState};
use crate::transport::{SessionEvent, TransportEvent, TransportFactory};
use anyhow::Result;
use std::sync::Arc;
use tandem_core::{PeerId, Role, SignalMessage};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Owns one client session: the relay link, the negotiator and the data channel.
///
/// Everything runs on a single task. Transport callbacks and relay frames are queued
/// into it, so no state is shared and events of superseded attempts are filtered by
/// their session tag.
pub struct ConnectionSupervisor<F: TransportFactory, C: SignalConnector> {
    config: ClientConfig,
    connector: Arc<C>,
    negotiator: SessionNegotiator<F>,
    transport_rx: mpsc::UnboundedReceiver<SessionEvent>,
    link: Option<SignalLink>,
    channel: Option<DataChannel>,
    /// Set while paired without an open channel.
    deadline: Option<Instant>,
    state_tx: watch::Sender<SupervisorState>,
    events: mpsc::UnboundedSender<ClientEvent>,
    commands: mpsc::UnboundedReceiver<SupervisorCommand>,
}

impl<F: TransportFactory, C: SignalConnector> ConnectionSupervisor<F, C> {
    /// Opens the relay link and spawns the supervisor. Registration and joining the
    /// configured room happen on the spawned task.
    pub async fn connect(
        config: ClientConfig,
        factory: Arc<F>,
        connector: C,
    ) -> Result<SupervisorHandle> {
        let connector = Arc::new(connector);
        let link = connector.open().await?;

        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SupervisorState::Connecting);

        let negotiator = SessionNegotiator::new(
            factory,
            transport_tx,
            config.ice_servers.clone(),
            config.channel_label.clone(),
        );

        let supervisor = Self {
            config,
            connector,
            negotiator,
            transport_rx,
            link: Some(link),
            channel: None,
            deadline: None,
            state_tx,
            events: event_tx,
            commands: cmd_rx,
        };
        let task = tokio::spawn(supervisor.run());

        Ok(SupervisorHandle::new(cmd_tx, event_rx, state_rx, task))
    }

    async fn run(mut self) {
        info!("Connection supervisor started for room {}", self.config.room);

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },
                msg = next_signal(&mut self.link) => match msg {
                    Some(msg) => self.handle_signal(msg).await,
                    None => self.on_link_lost().await,
                },
                Some(event) = self.transport_rx.recv() => {
                    self.handle_transport_event(event).await;
                }
                _ = expire(self.deadline) => self.on_negotiation_timeout().await,
            }
        }

        self.shutdown().await;
        info!("Connection supervisor stopped");
    }

    async fn handle_command(&mut self, cmd: SupervisorCommand) {
        match cmd {
            SupervisorCommand::Send { text, reply } => {
                let sent = match &self.channel {
                    Some(channel) => channel.send(&text).await,
                    None => {
                        warn!("Dropping message, no data channel");
                        false
                    }
                };
                let _ = reply.send(sent);
            }
            SupervisorCommand::Leave { reply } => {
                self.leave().await;
                let _ = reply.send(());
            }
            SupervisorCommand::Reconnect { reply } => {
                let _ = reply.send(self.reconnect().await);
            }
        }
    }

    async fn handle_signal(&mut self, msg: SignalMessage) {
        debug!("Signal '{}' in state {:?}", msg.kind(), self.state());

        match msg {
            SignalMessage::Registered { user_id } => {
                info!("Registered as {}", user_id);
                self.emit(ClientEvent::Registered(user_id));

                if self.state() == SupervisorState::Connecting {
                    let room = self.config.room.clone();
                    if self.signal(SignalMessage::JoinRoom { room }) {
                        self.set_state(SupervisorState::InRoomWaiting);
                    }
                }
            }

            SignalMessage::IceConfig { ice_servers } => {
                debug!("Relay pushed {} ICE servers", ice_servers.len());
                self.negotiator.set_ice_servers(ice_servers);
            }

            SignalMessage::OtherUser { user_id, role } => {
                if self.on_paired(user_id.clone(), role) && role == Role::Caller {
                    let result = self.negotiator.start_as_caller(user_id).await;
                    match result {
                        Ok(offer) => {
                            self.channel = Some(DataChannel::new());
                            self.signal(offer);
                        }
                        Err(e) => self.on_negotiation_error(e).await,
                    }
                }
            }

            SignalMessage::UserJoined { user_id, role } => {
                self.on_paired(user_id, role);
            }

            SignalMessage::Offer {
                from: Some(from),
                session,
                sdp,
                ..
            } => match self.negotiator.accept_offer(from, session, sdp).await {
                Ok(answer) => {
                    self.channel = Some(DataChannel::new());
                    self.signal(answer);
                }
                Err(e) => self.on_negotiation_error(e).await,
            },

            SignalMessage::Answer {
                from: Some(from),
                session,
                sdp,
                ..
            } => {
                if let Err(e) = self.negotiator.apply_answer(from, session, sdp).await {
                    self.on_negotiation_error(e).await;
                }
            }

            SignalMessage::IceCandidate {
                from: Some(from),
                session,
                candidate,
                ..
            } => {
                let result = self
                    .negotiator
                    .add_remote_candidate(from, session, candidate)
                    .await;
                if let Err(e) = result {
                    self.on_negotiation_error(e).await;
                }
            }

            SignalMessage::UserLeft { user_id } => {
                let is_partner = self.negotiator.remote_peer() == Some(&user_id);
                if is_partner || self.state() == SupervisorState::InRoomPaired {
                    self.emit(ClientEvent::PeerLeft(user_id));
                    self.drop_session("remote peer left").await;
                } else {
                    debug!("Ignoring departure of {}", user_id);
                }
            }

            SignalMessage::RoomFull { room } => {
                warn!("Room {} is full", room);
                self.emit(ClientEvent::RoomFull(room));
                self.teardown().await;
                self.close_link(false).await;
                self.set_state(SupervisorState::Disconnected);
            }

            other => {
                warn!("Ignoring unexpected '{}' from relay", other.kind());
            }
        }
    }

    async fn handle_transport_event(&mut self, event: SessionEvent) {
        let SessionEvent { session, event } = event;
        if !self.negotiator.is_current_session(session) {
            debug!("Discarding {:?} from superseded session {}", event, session);
            return;
        }

        match event {
            TransportEvent::CandidateGenerated(candidate) => {
                if let Some(msg) = self.negotiator.local_candidate(session, candidate) {
                    self.signal(msg);
                }
            }
            TransportEvent::StateChanged(state) => {
                info!("Transport state {:?}", state);
                if state.is_terminal() {
                    self.drop_session("transport lost").await;
                }
            }
            TransportEvent::ChannelOpen(inner) => {
                self.deadline = None;
                self.channel.get_or_insert_with(DataChannel::new).attach(inner);
                self.emit(ClientEvent::ChannelOpen);
            }
            TransportEvent::ChannelMessage(text) => {
                self.emit(ClientEvent::Message(text));
            }
            TransportEvent::ChannelError(err) => {
                self.emit(ClientEvent::ChannelError(err));
            }
            TransportEvent::ChannelClosed => {
                if let Some(channel) = self.channel.as_mut() {
                    channel.mark_closed();
                }
                self.drop_session("data channel closed").await;
            }
        }
    }

    fn on_paired(&mut self, peer: PeerId, role: Role) -> bool {
        if !self.state().in_room() {
            warn!("Pairing announcement in state {:?}", self.state());
            return false;
        }
        info!("Paired with {} as {:?}", peer, role);
        if role == Role::Callee {
            self.negotiator.expect_remote(peer.clone(), role);
        }
        self.deadline = Some(Instant::now() + self.config.negotiation_timeout);
        self.set_state(SupervisorState::InRoomPaired);
        self.emit(ClientEvent::Paired { peer, role });
        true
    }

    async fn on_negotiation_error(&mut self, err: NegotiationError) {
        if !err.is_fatal() {
            debug!("Ignoring signal: {}", err);
            return;
        }
        self.emit(ClientEvent::NegotiationFailed(err.to_string()));
        self.drop_session("negotiation failed").await;
    }

    /// The offer, the answer or the channel never arrived in time.
    async fn on_negotiation_timeout(&mut self) {
        self.deadline = None;
        warn!(
            "No data channel {:?} after pairing in phase {:?}",
            self.config.negotiation_timeout,
            self.negotiator.phase()
        );
        self.emit(ClientEvent::NegotiationFailed(
            "negotiation timed out".to_owned(),
        ));
        self.drop_session("negotiation timed out").await;
    }

    async fn on_link_lost(&mut self) {
        warn!("Signaling link lost");
        self.link = None;
        self.teardown().await;
        if self.state() != SupervisorState::Left {
            self.set_state(SupervisorState::Disconnected);
        }
    }

    /// Peer, transport or channel loss. Leaves the room and goes passive until the
    /// application asks for a reconnect. Idempotent.
    async fn drop_session(&mut self, reason: &str) {
        if !self.state().in_room() {
            return;
        }
        info!("Session ended: {}", reason);
        self.teardown().await;
        self.close_link(true).await;
        self.set_state(SupervisorState::Disconnected);
    }

    async fn leave(&mut self) {
        if self.state() == SupervisorState::Left {
            return;
        }
        info!("Leaving room {}", self.config.room);
        let in_room = self.state().in_room();
        if in_room {
            let room = self.config.room.clone();
            self.signal(SignalMessage::LeaveRoom { room });
        }
        self.teardown().await;
        self.close_link(false).await;
        self.set_state(SupervisorState::Left);
    }

    async fn reconnect(&mut self) -> Result<()> {
        info!("Reconnecting to room {}", self.config.room);
        let in_room = self.state().in_room();
        self.teardown().await;
        self.close_link(in_room).await;
        self.set_state(SupervisorState::Connecting);

        match self.connector.open().await {
            Ok(link) => {
                self.link = Some(link);
                Ok(())
            }
            Err(e) => {
                warn!("Reconnect failed: {:#}", e);
                self.set_state(SupervisorState::Disconnected);
                Err(e)
            }
        }
    }

    async fn shutdown(&mut self) {
        let in_room = self.state().in_room();
        self.teardown().await;
        self.close_link(in_room).await;
    }

    /// Closes the data channel and the transport and returns the negotiator to idle.
    async fn teardown(&mut self) {
        self.deadline = None;
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
            self.emit(ClientEvent::ChannelClosed);
        }
        self.negotiator.reset().await;
    }

    async fn close_link(&mut self, leave_room: bool) {
        let Some(link) = self.link.take() else {
            return;
        };
        if leave_room {
            link.send(SignalMessage::LeaveRoom {
                room: self.config.room.clone(),
            });
        }
        link.close().await;
    }

    fn signal(&self, msg: SignalMessage) -> bool {
        match &self.link {
            Some(link) => link.send(msg),
            None => {
                warn!("No relay link, dropping '{}'", msg.kind());
                false
            }
        }
    }

    fn state(&self) -> SupervisorState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: SupervisorState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            info!("Supervisor state {:?} -> {:?}", previous, state);
            self.emit(ClientEvent::StateChanged(state));
        }
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }
}

async fn next_signal(link: &mut Option<SignalLink>) -> Option<SignalMessage> {
    match link {
        Some(link) => link.recv().await,
        None => std::future::pending().await,
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
