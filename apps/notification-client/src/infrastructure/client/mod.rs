//! Notification Client
//!
//! The stateful side of the crate:
//!
//! - **`NotificationClient`**: public handle, state machine and connect cycles
//! - **Session**: one negotiated STOMP session and its message pump
//! - **Reconnect**: bounded backoff between attempts

pub mod notification_client;
pub mod reconnect;
pub mod session;

pub use notification_client::{JSON_CONTENT_TYPE, NotificationClient};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use session::{Session, SessionError};
