//! Notification Client Binary
//!
//! Connects as one user and logs every notification it receives.
//!
//! # Usage
//!
//! ```bash
//! NOTIFY_USER_ID=42 cargo run --bin notification-client
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `NOTIFY_USER_ID`: user whose private queue to subscribe to
//! - `NOTIFY_API_URL_PRODUCTION`: API base URL (production builds only)
//!
//! ## Optional
//! - `NOTIFY_ENV`: production | development (default: by build mode)
//! - `NOTIFY_API_URL_DEVELOPMENT`: API base URL (default: <http://localhost:8080>)
//! - `NOTIFY_ACCESS_TOKEN`: bearer token sent with STOMP CONNECT
//! - `NOTIFY_RECONNECT_DELAY_MS`: delay before the first retry (default: 5000)
//! - `NOTIFY_RECONNECT_DELAY_MAX_MS`: retry delay ceiling (default: 5000)
//! - `NOTIFY_RECONNECT_MULTIPLIER`: delay growth per retry (default: 1.0)
//! - `NOTIFY_RECONNECT_JITTER`: random spread as a fraction (default: 0.0)
//! - `NOTIFY_MAX_RECONNECT_ATTEMPTS`: retry ceiling (default: 5)
//! - `NOTIFY_HEARTBEAT_OUTGOING_MS` / `NOTIFY_HEARTBEAT_INCOMING_MS`: (default: 10000)
//! - `NOTIFY_CONNECT_TIMEOUT_SECS`: handshake deadline (default: 10)
//! - `NOTIFY_METRICS_PORT`: Prometheus exporter port, 0 disables (default: 0)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: false)
//! - `RUST_LOG`: Log filter (default: `notification_client=info`)

use std::time::Duration;

use anyhow::Context;
use notification_client::infrastructure::telemetry;
use notification_client::{
    ClientConfig, NotificationClient, NotificationMessage, UserId, init_metrics,
};
use tokio::signal;

/// Time allowed for the DISCONNECT frame to go out before the runtime stops.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    let _telemetry_guard = telemetry::init().context("failed to initialise telemetry")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting notification client");

    let config = ClientConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    if config.metrics_port > 0 {
        let addr = init_metrics(config.metrics_port)?;
        tracing::info!(addr = %addr, "Prometheus exporter listening");
    }

    let user_id = std::env::var("NOTIFY_USER_ID").context("NOTIFY_USER_ID is required")?;
    let user_id = UserId::new(user_id).context("invalid NOTIFY_USER_ID")?;

    let client = NotificationClient::new(config, user_id, log_notification);
    client.connect();

    await_shutdown().await;

    client.disconnect();
    tokio::time::sleep(SHUTDOWN_GRACE).await;

    tracing::info!("Notification client stopped");
    Ok(())
}

fn log_notification(notification: NotificationMessage) {
    tracing::info!(
        id = %notification.id,
        kind = %notification.kind,
        title = %notification.title,
        timestamp = %notification.timestamp,
        is_read = notification.is_read,
        action_url = notification.action_url.as_deref(),
        "{}",
        notification.message
    );
}

/// Log the parsed configuration.
fn log_config(config: &ClientConfig) {
    let ws = &config.websocket;
    tracing::info!(
        environment = config.environment.as_str(),
        endpoint = %config.endpoint,
        max_reconnect_attempts = ws.max_reconnect_attempts,
        reconnect_delay_ms = millis(ws.reconnect_delay),
        reconnect_delay_max_ms = millis(ws.reconnect_delay_max),
        reconnect_multiplier = ws.reconnect_delay_multiplier,
        metrics_port = config.metrics_port,
        "Configuration loaded"
    );
    tracing::debug!(
        heartbeat_outgoing_ms = millis(ws.heartbeat_outgoing),
        heartbeat_incoming_ms = millis(ws.heartbeat_incoming),
        reconnect_jitter = ws.reconnect_jitter,
        connect_headers = config.connect_headers.len(),
        "Session settings"
    );
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
