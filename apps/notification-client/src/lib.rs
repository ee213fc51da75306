#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Notification Client - STOMP over WebSocket
//!
//! Keeps a user's session subscribed to their private notification queue and
//! the global broadcast topic, decodes each notification and hands it to a
//! caller-supplied handler. Lost or failed sessions are retried with a
//! bounded, cancellable backoff.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core types with no I/O
//!   - `notification`: Notification payload and its decode boundary
//!   - `connection`: Connection state
//!   - `destination`: User ids and STOMP destinations
//!
//! - **Application**: Port definitions
//!   - `ports`: Transport and handler interfaces
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `client`: `NotificationClient`, session driver, reconnect policy
//!   - `stomp`: STOMP 1.2 framing and heart-beats
//!   - `transport`: WebSocket adapter
//!   - `config`: Environment-driven configuration
//!   - `metrics`, `telemetry`: Observability
//!
//! # Data Flow
//!
//! ```text
//!                      ┌────────────────────────┐
//! /user/{id}/queue/... ┤                        │
//!                      ├─► STOMP session ─► decode ─► handler
//! /topic/notifications ┤                        │
//!                      └────────────────────────┘
//!          send_message ──► SEND ──► broker
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core types with no external dependencies.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::connection::ConnectionState;
pub use domain::destination::{
    BROADCAST_NOTIFICATIONS, Feed, UserId, UserIdError, user_notifications,
};
pub use domain::notification::{DecodeError, NotificationId, NotificationMessage};

// Ports
pub use application::ports::{NotificationHandler, Transport, TransportConnector, TransportError};

// Client
pub use infrastructure::client::{
    NotificationClient, ReconnectConfig, ReconnectPolicy, SessionError,
};

// Infrastructure config
pub use infrastructure::config::{ClientConfig, ConfigError, Environment, WebSocketSettings};

// Transport
pub use infrastructure::transport::WebSocketConnector;

// Metrics
pub use infrastructure::metrics::{MetricsError, init_metrics};

// Telemetry
pub use infrastructure::telemetry::{
    TelemetryConfig, TelemetryError, TelemetryGuard, init as init_telemetry,
};
