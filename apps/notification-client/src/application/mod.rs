//! Application Layer - Port definitions.
//!
//! The contracts the notification client is written against: how it reaches
//! the broker, and how it hands notifications to the rest of the app.

/// Port interfaces for external systems (transport, handler).
pub mod ports;
