//! Domain Layer - Core notification types.
//!
//! Pure types with serialization support and no I/O: the notification
//! message and its decode boundary, connection state, and the destination
//! names the broker routes on.

/// Notification message and decoding.
pub mod notification;

/// Client connection state.
pub mod connection;

/// STOMP destination naming.
pub mod destination;
