use crate::transport::{
    CandidateSink, ChannelTransport, PeerConnectionState, PeerTransport, SdpKind, SessionEvent,
    TransportEvent, TransportFactory,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tandem_core::{IceCandidate, IceServerConfig, SessionTag};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Builds a `webrtc` peer connection per attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtcTransportFactory;

#[async_trait]
impl TransportFactory for RtcTransportFactory {
    type Transport = RtcTransport;

    async fn create(
        &self,
        session: SessionTag,
        ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Arc<RtcTransport>> {
        RtcTransport::new(session, ice_servers, events)
            .await
            .map(Arc::new)
    }
}

pub struct RtcTransport {
    session: SessionTag,
    peer_connection: Arc<RTCPeerConnection>,
    /// Channel opened locally by the caller; the callee's arrives through `on_data_channel`.
    data_channel: Mutex<Option<Arc<RTCDataChannel>>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    closed: AtomicBool,
}

impl RtcTransport {
    pub async fn new(
        session: SessionTag,
        ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers.iter().map(to_rtc_ice_server).collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                Box::pin(async move {
                    info!("Peer connection state changed for session {}: {:?}", session, s);
                    if let Some(state) = map_state(s) {
                        let event = TransportEvent::StateChanged(state);
                        let _ = tx.send(SessionEvent::new(session, event));
                    }
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                match candidate.to_json() {
                    Ok(init) => {
                        let _ = tx.send(SessionEvent::new(
                            session,
                            TransportEvent::CandidateGenerated(from_rtc_candidate(init)),
                        ));
                    }
                    Err(e) => warn!("Failed to serialize local candidate: {}", e),
                }
            })
        }));

        let dc_tx = events.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            Box::pin(async move {
                debug!("Remote data channel '{}' announced for session {}", dc.label(), session);
                wire_channel(&dc, session, tx);
            })
        }));

        Ok(Self {
            session,
            peer_connection,
            data_channel: Mutex::new(None),
            events,
            closed: AtomicBool::new(false),
        })
    }

    pub fn session(&self) -> SessionTag {
        self.session
    }
}

#[async_trait]
impl CandidateSink for RtcTransport {
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(to_rtc_candidate(candidate))
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }
}

#[async_trait]
impl PeerTransport for RtcTransport {
    async fn create_offer(&self, channel_label: &str) -> Result<String> {
        let dc = self
            .peer_connection
            .create_data_channel(channel_label, None)
            .await
            .context("Failed to create data channel")?;
        wire_channel(&dc, self.session, self.events.clone());
        *self.data_channel.lock().await = Some(dc);

        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .context("Failed to create offer")?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await
            .context("Failed to set local description")?;

        Ok(offer.sdp)
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .context("Failed to create answer")?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await
            .context("Failed to set local description")?;

        Ok(answer.sdp)
    }

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        let desc = match kind {
            SdpKind::Offer => RTCSessionDescription::offer(sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(sdp)?,
        };
        self.peer_connection
            .set_remote_description(desc)
            .await
            .context("Failed to set remote description")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(dc) = self.data_channel.lock().await.take() {
            let _ = dc.close().await;
        }
        self.peer_connection
            .close()
            .await
            .context("Failed to close peer connection")?;
        Ok(())
    }
}

struct RtcChannel(Arc<RTCDataChannel>);

#[async_trait]
impl ChannelTransport for RtcChannel {
    fn label(&self) -> String {
        self.0.label().to_owned()
    }

    async fn send_text(&self, text: String) -> Result<()> {
        self.0
            .send_text(text)
            .await
            .context("Failed to send on data channel")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.0
            .close()
            .await
            .context("Failed to close data channel")?;
        Ok(())
    }
}

fn wire_channel(
    dc: &Arc<RTCDataChannel>,
    session: SessionTag,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let open_tx = events.clone();
    let dc_on_open = Arc::clone(dc);
    dc.on_open(Box::new(move || {
        let tx = open_tx.clone();
        let channel: Arc<dyn ChannelTransport> = Arc::new(RtcChannel(Arc::clone(&dc_on_open)));
        Box::pin(async move {
            info!("Data channel '{}' open for session {}", channel.label(), session);
            let _ = tx.send(SessionEvent::new(session, TransportEvent::ChannelOpen(channel)));
        })
    }));

    let msg_tx = events.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = msg_tx.clone();
        Box::pin(async move {
            if !msg.is_string {
                warn!("Ignoring {} byte binary message", msg.data.len());
                return;
            }
            match String::from_utf8(msg.data.to_vec()) {
                Ok(text) => {
                    let event = TransportEvent::ChannelMessage(text);
                    let _ = tx.send(SessionEvent::new(session, event));
                }
                Err(e) => warn!("Dropping non UTF-8 text message: {}", e),
            }
        })
    }));

    let close_tx = events.clone();
    dc.on_close(Box::new(move || {
        let tx = close_tx.clone();
        Box::pin(async move {
            info!("Data channel closed for session {}", session);
            let _ = tx.send(SessionEvent::new(session, TransportEvent::ChannelClosed));
        })
    }));

    dc.on_error(Box::new(move |err| {
        let tx = events.clone();
        Box::pin(async move {
            warn!("Data channel error for session {}: {}", session, err);
            let _ = tx.send(SessionEvent::new(
                session,
                TransportEvent::ChannelError(err.to_string()),
            ));
        })
    }));
}

fn to_rtc_ice_server(server: &IceServerConfig) -> RTCIceServer {
    RTCIceServer {
        urls: server.urls.clone(),
        username: server.username.clone().unwrap_or_default(),
        credential: server.credential.clone().unwrap_or_default(),
        ..Default::default()
    }
}

fn to_rtc_candidate(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_mline_index,
        username_fragment: candidate.username_fragment,
        ..Default::default()
    }
}

fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_mline_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn map_state(state: RTCPeerConnectionState) -> Option<PeerConnectionState> {
    match state {
        RTCPeerConnectionState::New => Some(PeerConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(PeerConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(PeerConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(PeerConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(PeerConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(PeerConnectionState::Closed),
        _ => None,
    }
}
