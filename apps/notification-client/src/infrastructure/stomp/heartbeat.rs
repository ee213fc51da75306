//! Heart-beat Negotiation
//!
//! STOMP heart-beating keeps idle connections alive and detects dead peers.
//! The client advertises `cx,cy` in CONNECT, the server answers `sx,sy` in
//! CONNECTED, and each direction settles on the larger of the two values
//! unless either side sent 0.

use std::time::Duration;

use tokio::time::Instant;

/// Multiplier applied to the negotiated incoming interval before the peer
/// is considered dead.
pub const INCOMING_GRACE_FACTOR: u32 = 2;

/// Configuration for heart-beat behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Smallest interval at which the client can send heart-beats (0 = never).
    pub outgoing: Duration,
    /// Interval at which the client wants heart-beats from the server (0 = never).
    pub incoming: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            outgoing: Duration::from_secs(10),
            incoming: Duration::from_secs(10),
        }
    }
}

impl HeartbeatConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(outgoing: Duration, incoming: Duration) -> Self {
        Self { outgoing, incoming }
    }

    /// Disable heart-beating in both directions.
    #[must_use]
    pub const fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Create configuration from `WebSocketSettings`.
    #[must_use]
    pub const fn from_websocket_settings(settings: &crate::WebSocketSettings) -> Self {
        Self {
            outgoing: settings.heartbeat_outgoing,
            incoming: settings.heartbeat_incoming,
        }
    }

    /// Value for the CONNECT `heart-beat` header.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!(
            "{},{}",
            self.outgoing.as_millis(),
            self.incoming.as_millis()
        )
    }

    /// Settle intervals against the server's CONNECTED `heart-beat` header.
    ///
    /// A missing or unparsable header disables heart-beating.
    #[must_use]
    pub fn negotiate(&self, server_header: Option<&str>) -> NegotiatedHeartbeat {
        let Some((sx, sy)) = server_header.and_then(parse_header) else {
            if let Some(raw) = server_header {
                tracing::warn!(header = %raw, "Ignoring unparsable heart-beat header");
            }
            return NegotiatedHeartbeat::default();
        };

        NegotiatedHeartbeat {
            send_every: settle(self.outgoing, sy),
            expect_within: settle(self.incoming, sx).map(|d| d * INCOMING_GRACE_FACTOR),
        }
    }
}

/// Heart-beat intervals agreed for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NegotiatedHeartbeat {
    /// How often the client must send something.
    pub send_every: Option<Duration>,
    /// How long the client waits for inbound traffic before giving up.
    pub expect_within: Option<Duration>,
}

fn parse_header(raw: &str) -> Option<(Duration, Duration)> {
    let (x, y) = raw.split_once(',')?;
    let x = x.trim().parse::<u64>().ok()?;
    let y = y.trim().parse::<u64>().ok()?;
    Some((Duration::from_millis(x), Duration::from_millis(y)))
}

fn settle(ours: Duration, theirs: Duration) -> Option<Duration> {
    if ours.is_zero() || theirs.is_zero() {
        None
    } else {
        Some(ours.max(theirs))
    }
}

/// Tracks inbound liveness for one session.
#[derive(Debug)]
pub struct HeartbeatState {
    last_inbound: Instant,
}

impl Default for HeartbeatState {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatState {
    /// Create new heartbeat state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_inbound: Instant::now(),
        }
    }

    /// Record that something arrived from the server.
    pub fn record_inbound(&mut self) {
        self.last_inbound = Instant::now();
    }

    /// Get the time since anything last arrived.
    #[must_use]
    pub fn time_since_inbound(&self) -> Duration {
        self.last_inbound.elapsed()
    }

    /// Whether the server has been silent for longer than `tolerance`.
    #[must_use]
    pub fn is_expired(&self, tolerance: Duration) -> bool {
        self.time_since_inbound() > tolerance
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn default_config_values() {
        let config = HeartbeatConfig::default();
        assert_eq!(config.outgoing, Duration::from_secs(10));
        assert_eq!(config.incoming, Duration::from_secs(10));
        assert_eq!(config.header_value(), "10000,10000");
    }

    #[test]
    fn disabled_header() {
        assert_eq!(HeartbeatConfig::disabled().header_value(), "0,0");
    }

    #[test_case(10_000, 10_000, "0,0", None, None ; "server refuses")]
    #[test_case(10_000, 10_000, "5000,20000", Some(20_000), Some(20_000) ; "larger wins")]
    #[test_case(0, 10_000, "5000,5000", None, Some(20_000) ; "client never sends")]
    #[test_case(10_000, 0, "5000,5000", Some(10_000), None ; "client never expects")]
    fn negotiation(cx: u64, cy: u64, server: &str, send: Option<u64>, expect: Option<u64>) {
        let config = HeartbeatConfig::new(ms(cx), ms(cy));
        let settled = config.negotiate(Some(server));
        assert_eq!(settled.send_every, send.map(ms));
        assert_eq!(settled.expect_within, expect.map(ms));
    }

    #[test]
    fn missing_or_garbage_header_disables() {
        let config = HeartbeatConfig::default();
        assert_eq!(config.negotiate(None), NegotiatedHeartbeat::default());
        assert_eq!(config.negotiate(Some("soon")), NegotiatedHeartbeat::default());
    }

    #[tokio::test(start_paused = true)]
    async fn state_expires_after_silence() {
        let mut state = HeartbeatState::new();
        assert!(!state.is_expired(ms(100)));

        tokio::time::advance(ms(150)).await;
        assert!(state.is_expired(ms(100)));

        state.record_inbound();
        assert!(!state.is_expired(ms(100)));
    }
}
