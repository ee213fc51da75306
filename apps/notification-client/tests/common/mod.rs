//! Shared test fixtures: a scripted in-memory broker and a notification
//! recorder.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use notification_client::infrastructure::stomp::{Command, Frame, StompCodec};
use notification_client::{
    NotificationId, NotificationMessage, Transport, TransportConnector, TransportError,
};

// =============================================================================
// Scripted Broker
// =============================================================================

/// How the broker answers one connection attempt.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Transport connect fails.
    Refuse,
    /// Transport opens, CONNECT is answered with ERROR.
    Reject,
    /// Transport opens, CONNECT is answered with CONNECTED and no heart-beats.
    Accept,
    /// As `Accept`, with the given CONNECTED `heart-beat` header.
    AcceptWithHeartBeat(&'static str),
}

struct BrokerState {
    queued: Mutex<VecDeque<Script>>,
    fallback: Script,
    connects: AtomicUsize,
    sessions: mpsc::UnboundedSender<ServerSide>,
}

/// Test-side view of the broker.
pub struct FakeBroker {
    state: Arc<BrokerState>,
    sessions: mpsc::UnboundedReceiver<ServerSide>,
}

/// Connector handed to the client under test.
#[derive(Clone)]
pub struct FakeConnector {
    state: Arc<BrokerState>,
}

impl FakeBroker {
    /// Broker that answers every attempt with `fallback` unless a script is queued.
    pub fn new(fallback: Script) -> (Self, FakeConnector) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(BrokerState {
            queued: Mutex::new(VecDeque::new()),
            fallback,
            connects: AtomicUsize::new(0),
            sessions: tx,
        });
        (
            Self {
                state: Arc::clone(&state),
                sessions: rx,
            },
            FakeConnector { state },
        )
    }

    /// Queue scripts for the next attempts, in order.
    pub fn queue(&self, scripts: impl IntoIterator<Item = Script>) {
        self.state.queued.lock().extend(scripts);
    }

    /// Transport connect attempts seen so far.
    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Wait for the next transport the broker opened.
    pub async fn next_session(&mut self) -> ServerSide {
        tokio::time::timeout(Duration::from_secs(120), self.sessions.recv())
            .await
            .expect("no session opened")
            .expect("broker dropped")
    }
}

#[async_trait]
impl TransportConnector for FakeConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Transport>, TransportError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        let script = self
            .state
            .queued
            .lock()
            .pop_front()
            .unwrap_or(self.state.fallback);

        let reply = match script {
            Script::Refuse => {
                return Err(TransportError::Connect("connection refused".to_string()));
            }
            Script::Reject => "ERROR\nmessage:bad credentials\n\n\0".to_string(),
            Script::Accept => "CONNECTED\nversion:1.2\nheart-beat:0,0\n\n\0".to_string(),
            Script::AcceptWithHeartBeat(hb) => {
                format!("CONNECTED\nversion:1.2\nheart-beat:{hb}\n\n\0")
            }
        };

        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let _ = self.state.sessions.send(ServerSide {
            to_client,
            from_client,
            closed: Arc::clone(&closed),
            codec: StompCodec::new(),
        });

        Ok(Box::new(FakeTransport {
            to_server,
            from_server,
            handshake_reply: Some(reply),
            closed,
        }))
    }
}

struct FakeTransport {
    to_server: mpsc::UnboundedSender<String>,
    from_server: mpsc::UnboundedReceiver<String>,
    handshake_reply: Option<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.to_server
            .send(text)
            .map_err(|_| TransportError::Io("broker went away".to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        if let Some(reply) = self.handshake_reply.take() {
            return Some(Ok(reply));
        }
        self.from_server.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Broker end of one transport.
pub struct ServerSide {
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
    codec: StompCodec,
}

impl ServerSide {
    /// Push a raw text message to the client.
    pub fn push_raw(&self, text: impl Into<String>) {
        self.to_client.send(text.into()).expect("client gone");
    }

    /// Push a frame to the client.
    pub fn push(&self, frame: &Frame) {
        self.push_raw(self.codec.encode(frame));
    }

    /// Push a MESSAGE frame on subscription `sub`.
    pub fn deliver(&self, sub: &str, destination: &str, body: &str) {
        self.push(
            &Frame::new(Command::Message)
                .with_header("subscription", sub)
                .with_header("destination", destination)
                .with_header("message-id", format!("{sub}-{}", body.len()))
                .with_header("content-type", "application/json")
                .with_body(body),
        );
    }

    /// Next frame the client sent, skipping heart-beats.
    pub async fn next_frame(&mut self) -> Frame {
        loop {
            let text = tokio::time::timeout(Duration::from_secs(120), self.from_client.recv())
                .await
                .expect("client sent nothing")
                .expect("client hung up");
            if let Some(frame) = self.codec.decode(&text).unwrap().into_iter().next() {
                return frame;
            }
        }
    }

    /// Next raw text message the client sent, heart-beats included.
    pub async fn next_raw(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(120), self.from_client.recv())
            .await
            .expect("client sent nothing")
            .expect("client hung up")
    }

    /// Read the CONNECT frame and both SUBSCRIBE frames.
    pub async fn handshake(&mut self) -> (Frame, Vec<Frame>) {
        let connect = self.next_frame().await;
        assert_eq!(connect.command, Command::Connect);
        let subscribes = vec![self.next_frame().await, self.next_frame().await];
        (connect, subscribes)
    }

    /// Whether the client closed its end.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Drop the connection from the server side.
    pub fn hang_up(self) {}
}

// =============================================================================
// Handler
// =============================================================================

/// Collects delivered notifications.
#[derive(Clone, Default)]
pub struct Recorder {
    received: Arc<Mutex<Vec<NotificationMessage>>>,
}

impl Recorder {
    /// Handler closure that records into this recorder.
    pub fn handler(&self) -> impl Fn(NotificationMessage) + Send + Sync + 'static {
        let received = Arc::clone(&self.received);
        move |n| received.lock().push(n)
    }

    pub fn len(&self) -> usize {
        self.received.lock().len()
    }

    pub fn take(&self) -> Vec<NotificationMessage> {
        std::mem::take(&mut *self.received.lock())
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub const USER: &str = "42";
pub const PRIVATE: &str = "/user/42/queue/notifications";
pub const BROADCAST: &str = "/topic/notifications";

/// Poll `condition` until it holds, panicking after two virtual minutes.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(120);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Let background tasks run for `duration` of (virtual) time.
pub async fn settle(duration: Duration) {
    tokio::time::sleep(duration).await;
}

pub fn notification_json(id: u64, title: &str) -> String {
    format!(
        r#"{{"id":{id},"type":"COMMENT","title":"{title}","message":"someone replied","timestamp":"2024-05-01T10:00:00Z","isRead":false,"actionUrl":"/posts/{id}"}}"#
    )
}

pub fn expected_notification(id: u64, title: &str) -> NotificationMessage {
    NotificationMessage {
        id: NotificationId::new(id.to_string()),
        kind: "COMMENT".to_string(),
        title: title.to_string(),
        message: "someone replied".to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        is_read: false,
        action_url: Some(format!("/posts/{id}")),
    }
}
