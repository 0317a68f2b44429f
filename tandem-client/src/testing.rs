use crate::transport::{
    CandidateSink, ChannelTransport, PeerTransport, SdpKind, SessionEvent, TransportEvent,
    TransportFactory,
};
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tandem_core::{IceCandidate, IceServerConfig, SessionTag};
use tokio::sync::mpsc;

#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MockTransport {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CandidateSink for MockTransport {
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        if !candidate.candidate.starts_with("candidate:") {
            bail!("malformed candidate");
        }
        self.record(format!("candidate:{}", candidate.candidate));
        Ok(())
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn create_offer(&self, channel_label: &str) -> Result<String> {
        self.record(format!("offer:{}", channel_label));
        Ok("offer-sdp".into())
    }

    async fn create_answer(&self) -> Result<String> {
        self.record("answer".into());
        Ok("answer-sdp".into())
    }

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        if sdp == MockFactory::BROKEN_SDP {
            bail!("unparseable description");
        }
        let kind = match kind {
            SdpKind::Offer => "offer",
            SdpKind::Answer => "answer",
        };
        self.record(format!("remote-{}:{}", kind, sdp));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out `MockTransport`s and keeps the event sender of the latest one so tests
/// can play the native side.
#[derive(Default)]
pub struct MockFactory {
    transports: Mutex<Vec<Arc<MockTransport>>>,
    latest: Mutex<Option<(SessionTag, mpsc::UnboundedSender<SessionEvent>)>>,
}

impl MockFactory {
    pub const BROKEN_SDP: &'static str = "broken";

    pub fn created(&self) -> usize {
        self.transports.lock().unwrap().len()
    }

    pub fn transport(&self, index: usize) -> Arc<MockTransport> {
        Arc::clone(&self.transports.lock().unwrap()[index])
    }

    pub fn latest_session(&self) -> Option<SessionTag> {
        self.latest.lock().unwrap().as_ref().map(|(session, _)| *session)
    }

    /// Posts `event` as if the latest transport raised it.
    pub fn emit(&self, event: TransportEvent) {
        let latest = self.latest.lock().unwrap();
        let (session, tx) = latest.as_ref().expect("no transport created yet");
        tx.send(SessionEvent::new(*session, event)).unwrap();
    }

    pub fn emit_for(&self, session: SessionTag, event: TransportEvent) {
        let latest = self.latest.lock().unwrap();
        let (_, tx) = latest.as_ref().expect("no transport created yet");
        tx.send(SessionEvent::new(session, event)).unwrap();
    }
}

#[async_trait]
impl TransportFactory for MockFactory {
    type Transport = MockTransport;

    async fn create(
        &self,
        session: SessionTag,
        _ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Arc<MockTransport>> {
        let transport = Arc::new(MockTransport::default());
        self.transports.lock().unwrap().push(Arc::clone(&transport));
        *self.latest.lock().unwrap() = Some((session, events));
        Ok(transport)
    }
}

#[derive(Default)]
pub struct MockChannel {
    sent: Mutex<Vec<String>>,
    closes: Mutex<usize>,
}

impl MockChannel {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        *self.closes.lock().unwrap()
    }
}

#[async_trait]
impl ChannelTransport for MockChannel {
    fn label(&self) -> String {
        "data".into()
    }

    async fn send_text(&self, text: String) -> Result<()> {
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        *self.closes.lock().unwrap() += 1;
        Ok(())
    }
}

/// The relay's end of a mocked signaling link.
pub struct RelayEnd {
    /// Frames the client sent.
    pub from_client: mpsc::UnboundedReceiver<tandem_core::SignalMessage>,
    /// Frames to deliver to the client.
    pub to_client: mpsc::UnboundedSender<tandem_core::SignalMessage>,
}

impl RelayEnd {
    pub fn push(&self, msg: tandem_core::SignalMessage) {
        self.to_client.send(msg).unwrap();
    }

    pub async fn expect(&mut self) -> tandem_core::SignalMessage {
        tokio::time::timeout(std::time::Duration::from_secs(2), self.from_client.recv())
            .await
            .expect("timed out waiting for client frame")
            .expect("client closed the link")
    }

    /// Waits until the client drops its end of the link.
    pub async fn expect_closed(&mut self) {
        let result = tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while self.from_client.recv().await.is_some() {}
        })
        .await;
        assert!(result.is_ok(), "link still open");
    }
}

/// Hands every opened link's relay end to the test.
pub struct MockConnector {
    ends: mpsc::UnboundedSender<RelayEnd>,
    refuse: Arc<AtomicBool>,
}

impl MockConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RelayEnd>, Arc<AtomicBool>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let refuse = Arc::new(AtomicBool::new(false));
        (
            Self {
                ends: tx,
                refuse: Arc::clone(&refuse),
            },
            rx,
            refuse,
        )
    }
}

#[async_trait]
impl crate::signaling::SignalConnector for MockConnector {
    async fn open(&self) -> Result<crate::signaling::SignalLink> {
        if self.refuse.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        self.ends
            .send(RelayEnd {
                from_client: out_rx,
                to_client: in_tx,
            })
            .unwrap();
        Ok(crate::signaling::SignalLink::new(out_tx, in_rx))
    }
}
