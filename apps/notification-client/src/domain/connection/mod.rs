//! Connection State
//!
//! The client's own belief about its link to the broker. It is never probed
//! from the transport, so a peer that vanishes silently is only noticed
//! when a read fails or a heart-beat deadline passes.

use std::fmt;

/// Lifecycle state of a notification client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No session. Subscriptions are not valid.
    #[default]
    Disconnected,
    /// Transport or STOMP negotiation in flight.
    Connecting,
    /// Session negotiated and both feeds subscribed.
    Connected,
}

impl ConnectionState {
    /// Check whether the session is established.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Stable lowercase name, used in logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
