//! STOMP Frame Model
//!
//! Commands, headers and body of a single STOMP 1.2 frame, plus
//! constructors for the client frames this crate sends.
//!
//! # References
//!
//! - [STOMP 1.2](https://stomp.github.io/stomp-specification-1.2.html)

use std::fmt;

// =============================================================================
// Command
// =============================================================================

/// STOMP frame command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client: open a session (1.0 style).
    Connect,
    /// Client: open a session (1.2 style).
    Stomp,
    /// Server: session accepted.
    Connected,
    /// Client: publish to a destination.
    Send,
    /// Client: subscribe to a destination.
    Subscribe,
    /// Client: cancel a subscription.
    Unsubscribe,
    /// Client: acknowledge a message.
    Ack,
    /// Client: reject a message.
    Nack,
    /// Client: begin a transaction.
    Begin,
    /// Client: commit a transaction.
    Commit,
    /// Client: abort a transaction.
    Abort,
    /// Client: close the session.
    Disconnect,
    /// Server: message for a subscription.
    Message,
    /// Server: receipt for a client frame.
    Receipt,
    /// Server: error, the connection is closed afterwards.
    Error,
}

impl Command {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// Parse a command line. Case sensitive, as on the wire.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "CONNECTED" => Self::Connected,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "ACK" => Self::Ack,
            "NACK" => Self::Nack,
            "BEGIN" => Self::Begin,
            "COMMIT" => Self::Commit,
            "ABORT" => Self::Abort,
            "DISCONNECT" => Self::Disconnect,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            _ => return None,
        })
    }

    /// Whether header values are escaped for this command.
    ///
    /// CONNECT and CONNECTED frames are exempt for 1.0 compatibility.
    #[must_use]
    pub const fn escapes_headers(&self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Frame
// =============================================================================

/// Well-known header names.
pub mod header {
    /// Protocol versions offered by the client.
    pub const ACCEPT_VERSION: &str = "accept-version";
    /// Negotiated protocol version.
    pub const VERSION: &str = "version";
    /// Virtual host.
    pub const HOST: &str = "host";
    /// Heart-beat intervals in milliseconds.
    pub const HEART_BEAT: &str = "heart-beat";
    /// Message destination.
    pub const DESTINATION: &str = "destination";
    /// Subscription id.
    pub const ID: &str = "id";
    /// Subscription id on MESSAGE frames.
    pub const SUBSCRIPTION: &str = "subscription";
    /// Server message id.
    pub const MESSAGE_ID: &str = "message-id";
    /// Body MIME type.
    pub const CONTENT_TYPE: &str = "content-type";
    /// Body length in bytes.
    pub const CONTENT_LENGTH: &str = "content-length";
    /// Receipt request.
    pub const RECEIPT: &str = "receipt";
    /// Receipt id on RECEIPT frames.
    pub const RECEIPT_ID: &str = "receipt-id";
    /// Short error description on ERROR frames.
    pub const MESSAGE: &str = "message";
    /// Acknowledgement mode.
    pub const ACK: &str = "ack";
}

/// Protocol versions the client accepts.
pub const ACCEPT_VERSIONS: &str = "1.2,1.1,1.0";

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    /// Headers in wire order. Repeated names are kept; lookups see the first.
    pub headers: Vec<(String, String)>,
    /// Frame body.
    pub body: String,
}

impl Frame {
    /// Create an empty frame.
    #[must_use]
    pub const fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of header `name`.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// CONNECT frame opening a session.
    #[must_use]
    pub fn connect(host: &str, heart_beat: &str, extra: &[(String, String)]) -> Self {
        let mut frame = Self::new(Command::Connect)
            .with_header(header::ACCEPT_VERSION, ACCEPT_VERSIONS)
            .with_header(header::HOST, host)
            .with_header(header::HEART_BEAT, heart_beat);
        frame.headers.extend(extra.iter().cloned());
        frame
    }

    /// SUBSCRIBE frame with automatic acknowledgement.
    #[must_use]
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .with_header(header::ID, id)
            .with_header(header::DESTINATION, destination)
            .with_header(header::ACK, "auto")
    }

    /// SEND frame carrying `body` of type `content_type`.
    #[must_use]
    pub fn send(destination: &str, content_type: &str, body: impl Into<String>) -> Self {
        Self::new(Command::Send)
            .with_header(header::DESTINATION, destination)
            .with_header(header::CONTENT_TYPE, content_type)
            .with_body(body)
    }

    /// DISCONNECT frame.
    #[must_use]
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }
}
