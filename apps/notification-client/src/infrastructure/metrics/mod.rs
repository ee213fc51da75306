//! Prometheus Metrics Module
//!
//! Client metrics recorded through the `metrics` facade. Nothing is exported
//! unless a recorder is installed; the binary installs the Prometheus exporter
//! when `NOTIFY_METRICS_PORT` is set.
//!
//! # Metrics Categories
//!
//! - **Messages**: notifications received per channel, frames published
//! - **Decode failures**: payloads dropped at the decode boundary
//! - **Connection**: state gauge and reconnect attempts

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::domain::connection::ConnectionState;
use crate::domain::destination::Feed;

// =============================================================================
// Exporter
// =============================================================================

static EXPORTER_ADDR: OnceLock<SocketAddr> = OnceLock::new();

/// Error installing the Prometheus exporter.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter or recorder could not be installed.
    #[error("failed to install Prometheus exporter: {0}")]
    Install(#[from] BuildError),
}

/// Install the Prometheus recorder with an HTTP listener on `port`.
///
/// Must be called from inside a Tokio runtime. Later calls are no-ops and
/// return the address of the first listener.
///
/// # Errors
///
/// Returns an error if the recorder or listener cannot be installed.
pub fn init_metrics(port: u16) -> Result<SocketAddr, MetricsError> {
    if let Some(addr) = EXPORTER_ADDR.get() {
        return Ok(*addr);
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    register_metrics();
    Ok(*EXPORTER_ADDR.get_or_init(|| addr))
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "notification_client_messages_received_total",
        "Notifications decoded and handed to the handler"
    );
    describe_counter!(
        "notification_client_decode_failures_total",
        "Notification payloads dropped because they failed to decode"
    );
    describe_counter!(
        "notification_client_messages_sent_total",
        "SEND frames published to the broker"
    );
    describe_counter!(
        "notification_client_reconnects_total",
        "Reconnection attempts scheduled"
    );
    describe_gauge!(
        "notification_client_connection_state",
        "Connection state (0 = disconnected, 1 = connecting, 2 = connected)"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a notification delivered on `feed`.
pub fn record_message_received(feed: Feed) {
    counter!(
        "notification_client_messages_received_total",
        "channel" => feed.as_str()
    )
    .increment(1);
}

/// Record a payload on `feed` that failed to decode.
pub fn record_decode_failure(feed: Feed) {
    counter!(
        "notification_client_decode_failures_total",
        "channel" => feed.as_str()
    )
    .increment(1);
}

/// Record a SEND frame handed to the session.
pub fn record_message_sent() {
    counter!("notification_client_messages_sent_total").increment(1);
}

/// Record a scheduled reconnection attempt.
pub fn record_reconnect() {
    counter!("notification_client_reconnects_total").increment(1);
}

/// Publish the current connection state.
pub fn set_connection_state(state: ConnectionState) {
    gauge!("notification_client_connection_state").set(state_value(state));
}

const fn state_value(state: ConnectionState) -> f64 {
    match state {
        ConnectionState::Disconnected => 0.0,
        ConnectionState::Connecting => 1.0,
        ConnectionState::Connected => 2.0,
    }
}

// =============================================================================
// Tests
// =============================================================================
