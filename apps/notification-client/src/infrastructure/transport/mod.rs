//! Transport Adapters
//!
//! Concrete implementations of the transport port.

pub mod websocket;

pub use websocket::{WebSocketConnector, WebSocketTransport};
