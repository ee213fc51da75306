//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer, plus the client built on top of them.

/// Notification client, session driver and reconnect policy.
pub mod client;

/// Configuration loading.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// STOMP frame model, codec and heart-beating.
pub mod stomp;

/// OpenTelemetry tracing integration.
pub mod telemetry;

/// WebSocket transport adapter.
pub mod transport;
