//! Client Configuration Settings
//!
//! Configuration types for the notification client, loaded from environment
//! variables.

use std::time::Duration;

use url::Url;

/// Path appended to the API base URL to reach the broker endpoint.
pub const WS_PATH: &str = "/ws";

/// Default development API base URL.
pub const DEFAULT_DEVELOPMENT_URL: &str = "http://localhost:8080";

/// Build mode that selects the API base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Local development backend.
    Development,
    /// Deployed backend.
    Production,
}

impl Default for Environment {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Production
        }
    }
}

impl Environment {
    /// Parse environment from string. Unknown values fall back to the
    /// build-mode default.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            _ => Self::default(),
        }
    }

    /// Check if this is the production environment.
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Get the environment name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// WebSocket connection settings.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Outgoing heart-beat interval offered to the server (0 = none).
    pub heartbeat_outgoing: Duration,
    /// Incoming heart-beat interval requested from the server (0 = none).
    pub heartbeat_incoming: Duration,
    /// Delay before the first reconnection attempt.
    pub reconnect_delay: Duration,
    /// Ceiling for the reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier (1.0 = fixed delay).
    pub reconnect_delay_multiplier: f64,
    /// Reconnection delay jitter as a fraction (0.0 = none).
    pub reconnect_jitter: f64,
    /// Maximum reconnection attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Deadline for transport connect and for the CONNECTED reply.
    pub connect_timeout: Duration,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            heartbeat_outgoing: Duration::from_secs(10),
            heartbeat_incoming: Duration::from_secs(10),
            reconnect_delay: Duration::from_millis(5000),
            reconnect_delay_max: Duration::from_millis(5000),
            reconnect_delay_multiplier: 1.0,
            reconnect_jitter: 0.0,
            max_reconnect_attempts: 5,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Build mode the endpoint was selected for.
    pub environment: Environment,
    /// Broker WebSocket URL (`ws://` or `wss://`).
    pub endpoint: String,
    /// WebSocket connection settings.
    pub websocket: WebSocketSettings,
    /// Extra headers sent with STOMP CONNECT.
    pub connect_headers: Vec<(String, String)>,
    /// Prometheus exporter port (0 = disabled).
    pub metrics_port: u16,
}

impl ClientConfig {
    /// Create configuration for an explicit broker URL with default settings.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            environment: Environment::default(),
            endpoint: endpoint.into(),
            websocket: WebSocketSettings::default(),
            connect_headers: Vec::new(),
            metrics_port: 0,
        }
    }

    /// Replace the WebSocket settings.
    #[must_use]
    pub fn with_websocket(mut self, websocket: WebSocketSettings) -> Self {
        self.websocket = websocket;
        self
    }

    /// Add a header to the STOMP CONNECT frame.
    #[must_use]
    pub fn with_connect_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.connect_headers.push((name.into(), value.into()));
        self
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the production URL is required but missing, or if
    /// the selected base URL cannot be turned into a WebSocket endpoint.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = std::env::var("NOTIFY_ENV")
            .map(|s| Environment::from_str_case_insensitive(&s))
            .unwrap_or_default();

        let base_url = if environment.is_production() {
            let url = std::env::var("NOTIFY_API_URL_PRODUCTION")
                .map_err(|_| ConfigError::MissingEnvVar("NOTIFY_API_URL_PRODUCTION".to_string()))?;
            if url.trim().is_empty() {
                return Err(ConfigError::EmptyValue(
                    "NOTIFY_API_URL_PRODUCTION".to_string(),
                ));
            }
            url
        } else {
            std::env::var("NOTIFY_API_URL_DEVELOPMENT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DEVELOPMENT_URL.to_string())
        };

        let endpoint = websocket_endpoint(&base_url)?;

        let defaults = WebSocketSettings::default();
        let websocket = WebSocketSettings {
            heartbeat_outgoing: parse_env_duration_millis(
                "NOTIFY_HEARTBEAT_OUTGOING_MS",
                defaults.heartbeat_outgoing,
            ),
            heartbeat_incoming: parse_env_duration_millis(
                "NOTIFY_HEARTBEAT_INCOMING_MS",
                defaults.heartbeat_incoming,
            ),
            reconnect_delay: parse_env_duration_millis(
                "NOTIFY_RECONNECT_DELAY_MS",
                defaults.reconnect_delay,
            ),
            reconnect_delay_max: parse_env_duration_millis(
                "NOTIFY_RECONNECT_DELAY_MAX_MS",
                defaults.reconnect_delay_max,
            ),
            reconnect_delay_multiplier: parse_env_f64(
                "NOTIFY_RECONNECT_MULTIPLIER",
                defaults.reconnect_delay_multiplier,
            ),
            reconnect_jitter: parse_env_f64("NOTIFY_RECONNECT_JITTER", defaults.reconnect_jitter),
            max_reconnect_attempts: parse_env_u32(
                "NOTIFY_MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            ),
            connect_timeout: parse_env_duration_secs(
                "NOTIFY_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout,
            ),
        };

        let mut connect_headers = Vec::new();
        if let Ok(token) = std::env::var("NOTIFY_ACCESS_TOKEN")
            && !token.trim().is_empty()
        {
            connect_headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        Ok(Self {
            environment,
            endpoint,
            websocket,
            connect_headers,
            metrics_port: parse_env_u16("NOTIFY_METRICS_PORT", 0),
        })
    }

    /// Value for the STOMP CONNECT `host` header.
    ///
    /// Falls back to `/` when the endpoint has no host component.
    #[must_use]
    pub fn virtual_host(&self) -> String {
        Url::parse(&self.endpoint)
            .ok()
            .and_then(|url| url.host_str().map(str::to_owned))
            .unwrap_or_else(|| "/".to_string())
    }
}

/// Turn an API base URL into the broker WebSocket URL.
///
/// `http` maps to `ws`, `https` to `wss`, and `/ws` is appended unless the
/// path already ends with it.
///
/// # Errors
///
/// Returns an error if `base` is not a URL or uses another scheme.
pub fn websocket_endpoint(base: &str) -> Result<String, ConfigError> {
    let mut url = Url::parse(base.trim()).map_err(|e| ConfigError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme).map_err(|()| ConfigError::InvalidUrl {
        url: base.to_string(),
        reason: format!("cannot switch scheme to {scheme}"),
    })?;

    let path = url.path().trim_end_matches('/').to_string();
    if !path.ends_with(WS_PATH) {
        url.set_path(&format!("{path}{WS_PATH}"));
    }

    Ok(url.to_string())
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Base URL could not be parsed.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The offending value.
        url: String,
        /// Parser message.
        reason: String,
    },
    /// Base URL scheme is not http(s) or ws(s).
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
