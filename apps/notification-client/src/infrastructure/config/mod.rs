//! Configuration Module
//!
//! Configuration loading for the notification client.

mod settings;

pub use settings::{
    ClientConfig, ConfigError, DEFAULT_DEVELOPMENT_URL, Environment, WS_PATH, WebSocketSettings,
    websocket_endpoint,
};
