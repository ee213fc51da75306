//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `TransportConnector` / `Transport`: a text-message byte stream to the
//!   broker (WebSocket in production, in-memory in tests)
//!
//! ## Driver Ports (Inbound)
//!
//! - `NotificationHandler`: receives each decoded notification

use async_trait::async_trait;

use crate::domain::notification::NotificationMessage;

// =============================================================================
// Transport
// =============================================================================

/// Errors raised by a transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("transport connect failed: {0}")]
    Connect(String),

    /// An established connection failed while reading or writing.
    #[error("transport I/O failed: {0}")]
    Io(String),

    /// Operation attempted on a closed transport.
    #[error("transport closed")]
    Closed,
}

/// An open, bidirectional text-message connection.
///
/// `recv` must be cancel-safe: the session driver polls it inside
/// `tokio::select!` alongside timers and outbound traffic.
#[async_trait]
pub trait Transport: Send {
    /// Send one text message.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Receive the next text message. `None` means the peer closed.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Factory for transports.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Open a transport to `url`.
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError>;
}

// =============================================================================
// Handler
// =============================================================================

/// Receives decoded notifications.
///
/// Called from the client's session task, one notification at a time and
/// never concurrently for the same client. Implementations should return
/// quickly and hand heavy work off to another task.
pub trait NotificationHandler: Send + Sync + 'static {
    /// Handle one notification.
    fn on_notification(&self, notification: NotificationMessage);
}

impl<F> NotificationHandler for F
where
    F: Fn(NotificationMessage) + Send + Sync + 'static,
{
    fn on_notification(&self, notification: NotificationMessage) {
        self(notification);
    }
}
