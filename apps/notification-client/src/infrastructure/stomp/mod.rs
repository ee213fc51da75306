//! STOMP Protocol Layer
//!
//! The messaging protocol spoken over the WebSocket transport:
//!
//! - **Frame**: commands, headers, body
//! - **Codec**: STOMP 1.2 text encoding with header escaping
//! - **Heartbeat**: interval negotiation and liveness tracking

pub mod codec;
pub mod frame;
pub mod heartbeat;

pub use codec::{CodecError, HEARTBEAT, StompCodec};
pub use frame::{ACCEPT_VERSIONS, Command, Frame, header};
pub use heartbeat::{HeartbeatConfig, HeartbeatState, NegotiatedHeartbeat};
