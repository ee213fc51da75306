//! Notification Client
//!
//! Keeps one logical STOMP session to the notification broker, subscribed to
//! the user's private queue and the broadcast topic, and hands every decoded
//! notification to the caller's handler.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected --connect()--> Connecting --CONNECTED--> Connected
//!      ^                          |                         |
//!      +------ failure / lost ----+-------------------------+
//!      |           (bounded retry back to Connecting)
//!      +------ disconnect() from any state
//! ```
//!
//! Each `connect()` starts a new cycle identified by a generation number and
//! a child cancellation token. `disconnect()` bumps the generation and
//! cancels the token, so a retry that is waiting out its backoff never
//! touches the transport again.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use super::session::{Session, SessionError};
use crate::application::ports::{NotificationHandler, TransportConnector};
use crate::domain::connection::ConnectionState;
use crate::domain::destination::UserId;
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::metrics;
use crate::infrastructure::stomp::Frame;
use crate::infrastructure::transport::WebSocketConnector;

/// Content type of frames published by [`NotificationClient::send_message`].
pub const JSON_CONTENT_TYPE: &str = "application/json";

// =============================================================================
// Shared State
// =============================================================================

struct Shared {
    state: ConnectionState,
    generation: u64,
    cycle: Option<CancellationToken>,
    outbound: Option<mpsc::UnboundedSender<Frame>>,
    reconnect: ReconnectPolicy,
}

impl Shared {
    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            tracing::debug!(from = %self.state, to = %state, "Connection state changed");
            self.state = state;
        }
        metrics::set_connection_state(state);
    }
}

struct ClientInner {
    id: Uuid,
    config: ClientConfig,
    user_id: UserId,
    handler: Arc<dyn NotificationHandler>,
    connector: Arc<dyn TransportConnector>,
    root: CancellationToken,
    shared: Mutex<Shared>,
}

// =============================================================================
// Client
// =============================================================================

/// Notification client for one user session.
///
/// Dropping the client cancels every task it spawned.
///
/// # Example
///
/// ```rust,no_run
/// use notification_client::{ClientConfig, NotificationClient, NotificationMessage, UserId};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = NotificationClient::new(
///     ClientConfig::new("ws://localhost:8080/ws"),
///     UserId::new("42")?,
///     |n: NotificationMessage| println!("{}: {}", n.title, n.message),
/// );
/// client.connect();
/// # Ok(())
/// # }
/// ```
pub struct NotificationClient {
    inner: Arc<ClientInner>,
}

impl NotificationClient {
    /// Create a client that connects over WebSocket.
    #[must_use]
    pub fn new(
        config: ClientConfig,
        user_id: UserId,
        handler: impl NotificationHandler,
    ) -> Self {
        Self::with_connector(config, user_id, handler, WebSocketConnector::new())
    }

    /// Create a client over any transport.
    #[must_use]
    pub fn with_connector(
        config: ClientConfig,
        user_id: UserId,
        handler: impl NotificationHandler,
        connector: impl TransportConnector + 'static,
    ) -> Self {
        let reconnect = ReconnectPolicy::new(ReconnectConfig::from_websocket_settings(
            &config.websocket,
        ));

        Self {
            inner: Arc::new(ClientInner {
                id: Uuid::new_v4(),
                config,
                user_id,
                handler: Arc::new(handler),
                connector: Arc::new(connector),
                root: CancellationToken::new(),
                shared: Mutex::new(Shared {
                    state: ConnectionState::Disconnected,
                    generation: 0,
                    cycle: None,
                    outbound: None,
                    reconnect,
                }),
            }),
        }
    }

    /// Start connecting in the background.
    ///
    /// No-op while a session is connecting or established. Failures are
    /// retried per the reconnect policy and reported through logs only.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn connect(&self) {
        let (generation, cancel) = {
            let mut shared = self.inner.shared.lock();
            if shared.state != ConnectionState::Disconnected {
                tracing::debug!(state = %shared.state, "connect() ignored");
                return;
            }

            if let Some(previous) = shared.cycle.take() {
                previous.cancel();
            }
            shared.generation += 1;
            let cancel = self.inner.root.child_token();
            shared.cycle = Some(cancel.clone());
            shared.set_state(ConnectionState::Connecting);
            (shared.generation, cancel)
        };

        let span = tracing::info_span!(
            "notification_client",
            client_id = %self.inner.id,
            user_id = %self.inner.user_id,
            generation
        );
        tokio::spawn(
            Arc::clone(&self.inner)
                .drive(generation, cancel)
                .instrument(span),
        );
    }

    /// Close the session and cancel any pending retry.
    ///
    /// While connected, a DISCONNECT frame is sent and the transport closed
    /// from the session task. Otherwise no transport call is made. The
    /// reconnect attempt counter is left untouched.
    pub fn disconnect(&self) {
        let mut shared = self.inner.shared.lock();
        shared.generation += 1;
        if let Some(cycle) = shared.cycle.take() {
            cycle.cancel();
        }

        if shared.state == ConnectionState::Disconnected {
            tracing::debug!(client_id = %self.inner.id, "disconnect() while disconnected");
            return;
        }

        tracing::info!(client_id = %self.inner.id, state = %shared.state, "Disconnecting");
        shared.outbound = None;
        shared.set_state(ConnectionState::Disconnected);
    }

    /// Publish `payload` as JSON to `destination`.
    ///
    /// Fire-and-forget: dropped with a warning when not connected or when
    /// `payload` fails to serialize.
    pub fn send_message<T>(&self, destination: &str, payload: &T)
    where
        T: Serialize + ?Sized,
    {
        let outbound = {
            let shared = self.inner.shared.lock();
            match (&shared.outbound, shared.state) {
                (Some(outbound), ConnectionState::Connected) => outbound.clone(),
                _ => {
                    tracing::warn!(destination, state = %shared.state, "Not connected, message dropped");
                    return;
                }
            }
        };

        let body = match serde_json::to_string(payload) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(destination, error = %e, "Failed to serialize message");
                return;
            }
        };

        if outbound
            .send(Frame::send(destination, JSON_CONTENT_TYPE, body))
            .is_err()
        {
            tracing::warn!(destination, "Session ended before message was sent");
            return;
        }
        metrics::record_message_sent();
    }

    /// Whether the client believes its session is established.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.shared.lock().state.is_connected()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.lock().state
    }

    /// Consecutive failed attempts since the last established session.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.shared.lock().reconnect.attempt_count()
    }

    /// User this client subscribes for.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.inner.user_id
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

impl Drop for NotificationClient {
    fn drop(&mut self) {
        self.inner.root.cancel();
    }
}

impl std::fmt::Debug for NotificationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationClient")
            .field("id", &self.inner.id)
            .field("user_id", &self.inner.user_id)
            .field("endpoint", &self.inner.config.endpoint)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Connect Cycle
// =============================================================================

impl ClientInner {
    async fn drive(self: Arc<Self>, generation: u64, cancel: CancellationToken) {
        loop {
            let error = match self.run_session(generation, &cancel).await {
                Ok(()) => {
                    tracing::info!("Session closed");
                    return;
                }
                Err(e) => e,
            };

            let retry = {
                let mut shared = self.shared.lock();
                if shared.generation != generation || cancel.is_cancelled() {
                    return;
                }
                shared.outbound = None;
                shared.set_state(ConnectionState::Disconnected);
                shared
                    .reconnect
                    .next_delay()
                    .map(|delay| (delay, shared.reconnect.attempt_count()))
            };

            let Some((delay, attempt)) = retry else {
                tracing::error!(
                    error = %error,
                    endpoint = %self.config.endpoint,
                    "Giving up on notification connection after maximum reconnect attempts"
                );
                return;
            };

            tracing::warn!(
                error = %error,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Notification connection failed, retrying"
            );
            metrics::record_reconnect();

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!("Retry cancelled");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }

            {
                let mut shared = self.shared.lock();
                if shared.generation != generation {
                    return;
                }
                shared.set_state(ConnectionState::Connecting);
            }
        }
    }

    async fn run_session(
        &self,
        generation: u64,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        tracing::info!(endpoint = %self.config.endpoint, "Connecting to notification broker");

        let session = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            session = Session::establish(self.connector.as_ref(), &self.config, &self.user_id) => session?,
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        if !self.mark_connected(generation, tx) {
            session.shutdown().await;
            return Ok(());
        }
        tracing::info!("Connected to notification broker");

        session.run(cancel, &mut rx, self.handler.as_ref()).await
    }

    fn mark_connected(&self, generation: u64, outbound: mpsc::UnboundedSender<Frame>) -> bool {
        let mut shared = self.shared.lock();
        if shared.generation != generation {
            return false;
        }
        shared.reconnect.reset();
        shared.outbound = Some(outbound);
        shared.set_state(ConnectionState::Connected);
        true
    }
}
