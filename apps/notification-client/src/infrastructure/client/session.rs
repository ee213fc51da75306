//! STOMP Session
//!
//! One negotiated session over one transport: CONNECT handshake, the two
//! notification subscriptions, then a pump that dispatches MESSAGE frames,
//! forwards outbound frames and keeps heart-beats flowing until the session
//! is cancelled or lost.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{NotificationHandler, Transport, TransportConnector, TransportError};
use crate::domain::destination::{Feed, UserId};
use crate::domain::notification;
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::metrics;
use crate::infrastructure::stomp::{
    Command, Frame, HEARTBEAT, HeartbeatConfig, HeartbeatState, NegotiatedHeartbeat, StompCodec,
    header,
};

// =============================================================================
// Error Type
// =============================================================================

/// Reasons a session fails to start or ends unexpectedly.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport failed to connect, read or write.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No CONNECTED frame within the connect timeout.
    #[error("session negotiation timed out after {0:?}")]
    Timeout(Duration),

    /// Server answered CONNECT with ERROR.
    #[error("server rejected session: {0}")]
    Rejected(String),

    /// Server answered CONNECT with something other than CONNECTED.
    #[error("unexpected {0} frame during handshake")]
    UnexpectedFrame(Command),

    /// Server sent ERROR on an established session.
    #[error("server error: {0}")]
    Server(String),

    /// Nothing arrived within the negotiated heart-beat tolerance.
    #[error("no heart-beat from server for {0:?}")]
    HeartbeatTimeout(Duration),

    /// Server closed the connection.
    #[error("connection closed by server")]
    Closed,
}

// =============================================================================
// Session
// =============================================================================

struct Subscription {
    id: String,
    destination: String,
    feed: Feed,
}

/// An established STOMP session with both notification feeds subscribed.
pub struct Session {
    transport: Box<dyn Transport>,
    codec: StompCodec,
    heartbeat: NegotiatedHeartbeat,
    subscriptions: Vec<Subscription>,
}

impl Session {
    /// Open a transport, negotiate a session and subscribe to both feeds.
    ///
    /// The transport connect and the CONNECTED reply share one deadline,
    /// `config.websocket.connect_timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be opened, the server rejects
    /// the session, or the deadline passes.
    pub async fn establish(
        connector: &dyn TransportConnector,
        config: &ClientConfig,
        user_id: &UserId,
    ) -> Result<Self, SessionError> {
        let deadline = config.websocket.connect_timeout;
        let heartbeat = HeartbeatConfig::from_websocket_settings(&config.websocket);
        let codec = StompCodec::new();

        let (mut transport, negotiated) = tokio::time::timeout(deadline, async {
            tracing::debug!(endpoint = %config.endpoint, "Opening transport");
            let mut transport = connector.connect(&config.endpoint).await?;

            let connect = Frame::connect(
                &config.virtual_host(),
                &heartbeat.header_value(),
                &config.connect_headers,
            );
            transport.send_text(codec.encode(&connect)).await?;

            let connected = await_connected(transport.as_mut(), &codec).await?;
            tracing::debug!(
                version = connected.header(header::VERSION).unwrap_or("1.0"),
                heart_beat = connected.header(header::HEART_BEAT).unwrap_or("0,0"),
                "STOMP session negotiated"
            );
            let negotiated = heartbeat.negotiate(connected.header(header::HEART_BEAT));
            Ok::<_, SessionError>((transport, negotiated))
        })
        .await
        .map_err(|_| SessionError::Timeout(deadline))??;

        let mut subscriptions = Vec::with_capacity(Feed::all().len());
        for (index, feed) in Feed::all().iter().copied().enumerate() {
            let subscription = Subscription {
                id: format!("sub-{index}"),
                destination: feed.destination(user_id),
                feed,
            };
            transport
                .send_text(codec.encode(&Frame::subscribe(
                    &subscription.id,
                    &subscription.destination,
                )))
                .await?;
            tracing::info!(
                channel = feed.as_str(),
                destination = %subscription.destination,
                "Subscribed"
            );
            subscriptions.push(subscription);
        }

        Ok(Self {
            transport,
            codec,
            heartbeat: negotiated,
            subscriptions,
        })
    }

    /// Pump the session until `cancel` fires or the session is lost.
    ///
    /// Returns `Ok(())` only when cancelled, after flushing queued frames and
    /// sending DISCONNECT.
    ///
    /// # Errors
    ///
    /// Returns the reason the session was lost.
    pub async fn run(
        mut self,
        cancel: &CancellationToken,
        outbound: &mut mpsc::UnboundedReceiver<Frame>,
        handler: &dyn NotificationHandler,
    ) -> Result<(), SessionError> {
        let mut liveness = HeartbeatState::new();
        let mut send_tick = self.heartbeat.send_every.map(periodic);
        let mut check_tick = self.heartbeat.expect_within.map(periodic);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    // frames queued before disconnect() still go out
                    while let Ok(frame) = outbound.try_recv() {
                        if self.transport.send_text(self.codec.encode(&frame)).await.is_err() {
                            break;
                        }
                    }
                    self.shutdown().await;
                    return Ok(());
                }
                Some(frame) = outbound.recv() => {
                    self.transport.send_text(self.codec.encode(&frame)).await?;
                }
                () = tick(send_tick.as_mut()) => {
                    self.transport.send_text(HEARTBEAT.to_string()).await?;
                }
                () = tick(check_tick.as_mut()) => {
                    if let Some(tolerance) = self.heartbeat.expect_within
                        && liveness.is_expired(tolerance)
                    {
                        return Err(SessionError::HeartbeatTimeout(liveness.time_since_inbound()));
                    }
                }
                incoming = self.transport.recv() => {
                    let text = incoming.ok_or(SessionError::Closed)??;
                    liveness.record_inbound();
                    self.dispatch(&text, handler)?;
                }
            }
        }
    }

    /// Send DISCONNECT and close the transport. Failures are logged only.
    pub async fn shutdown(mut self) {
        let disconnect = self.codec.encode(&Frame::disconnect());
        if let Err(e) = self.transport.send_text(disconnect).await {
            tracing::debug!(error = %e, "DISCONNECT not delivered");
        }
        if let Err(e) = self.transport.close().await {
            tracing::debug!(error = %e, "Transport close failed");
        }
    }

    fn dispatch(&self, text: &str, handler: &dyn NotificationHandler) -> Result<(), SessionError> {
        let (frames, errors) = self.codec.decode_lenient(text);
        for e in &errors {
            tracing::warn!(error = %e, "Skipping undecodable STOMP frame");
        }

        for frame in frames {
            match frame.command {
                Command::Message => self.deliver(&frame, handler),
                Command::Error => {
                    let reason = frame
                        .header(header::MESSAGE)
                        .map_or_else(|| frame.body.clone(), str::to_owned);
                    return Err(SessionError::Server(reason));
                }
                Command::Receipt => {
                    tracing::debug!(receipt = frame.header(header::RECEIPT_ID), "Receipt");
                }
                other => tracing::debug!(command = %other, "Ignoring frame"),
            }
        }
        Ok(())
    }

    fn deliver(&self, frame: &Frame, handler: &dyn NotificationHandler) {
        let Some(feed) = self.feed_for(frame) else {
            tracing::debug!(
                subscription = frame.header(header::SUBSCRIPTION),
                destination = frame.header(header::DESTINATION),
                "MESSAGE for unknown subscription"
            );
            return;
        };

        match notification::decode(&frame.body) {
            Ok(message) => {
                tracing::debug!(channel = feed.as_str(), id = %message.id, kind = %message.kind, "Notification received");
                metrics::record_message_received(feed);
                handler.on_notification(message);
            }
            Err(e) => {
                tracing::warn!(
                    channel = feed.as_str(),
                    message_id = frame.header(header::MESSAGE_ID),
                    error = %e,
                    "Dropping undecodable notification"
                );
                metrics::record_decode_failure(feed);
            }
        }
    }

    fn feed_for(&self, frame: &Frame) -> Option<Feed> {
        let by_id = frame
            .header(header::SUBSCRIPTION)
            .and_then(|id| self.subscriptions.iter().find(|s| s.id == id));
        let by_destination = || {
            frame
                .header(header::DESTINATION)
                .and_then(|d| self.subscriptions.iter().find(|s| s.destination == d))
        };
        by_id.or_else(by_destination).map(|s| s.feed)
    }
}

async fn await_connected(
    transport: &mut dyn Transport,
    codec: &StompCodec,
) -> Result<Frame, SessionError> {
    loop {
        let text = transport.recv().await.ok_or(SessionError::Closed)??;
        let frames = codec.decode(&text).map_err(|e| {
            SessionError::Transport(TransportError::Io(format!("bad handshake reply: {e}")))
        })?;

        // heart-beat only
        let Some(frame) = frames.into_iter().next() else {
            continue;
        };

        return match frame.command {
            Command::Connected => Ok(frame),
            Command::Error => Err(SessionError::Rejected(
                frame
                    .header(header::MESSAGE)
                    .map_or_else(|| frame.body.clone(), str::to_owned),
            )),
            other => Err(SessionError::UnexpectedFrame(other)),
        };
    }
}

fn periodic(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn periodic_waits_one_full_period() {
        let start = Instant::now();
        let mut interval = periodic(Duration::from_secs(3));
        interval.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_tick_never_fires() {
        let fired = tokio::time::timeout(Duration::from_secs(3600), tick(None)).await;
        assert!(fired.is_err());
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            SessionError::Rejected("bad token".into()).to_string(),
            "server rejected session: bad token"
        );
        assert_eq!(
            SessionError::UnexpectedFrame(Command::Message).to_string(),
            "unexpected MESSAGE frame during handshake"
        );
        assert_eq!(
            SessionError::Transport(TransportError::Closed).to_string(),
            "transport closed"
        );
    }
}
