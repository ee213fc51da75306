//! Notification Types
//!
//! The canonical in-memory form of a notification pushed by the broker, and
//! the strict decode boundary that turns an untrusted frame body into one.
//!
//! # Wire Format
//!
//! ```json
//! {
//!   "id": 42,
//!   "type": "COMMENT",
//!   "title": "새 댓글",
//!   "message": "게시글에 댓글이 달렸습니다.",
//!   "timestamp": "2024-05-01T10:00:00",
//!   "isRead": false,
//!   "actionUrl": "/posts/7"
//! }
//! ```
//!
//! `id` may be a string or an integer. `timestamp` may be RFC 3339, a
//! zone-less local date-time (read as UTC), or epoch milliseconds.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Error Type
// =============================================================================

/// Why a frame body could not be turned into a [`NotificationMessage`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The body was empty or whitespace only.
    #[error("empty notification body")]
    Empty,

    /// The body was not JSON of the expected shape.
    #[error("malformed notification: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The body parsed but a field failed validation.
    #[error("invalid notification field `{field}`: {reason}")]
    Invalid {
        /// Wire name of the offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: &'static str,
    },
}

// =============================================================================
// Notification Id
// =============================================================================

/// Server-assigned notification identifier.
///
/// Always held as text; numeric ids from the wire are rendered in base 10.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Create an id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NotificationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Signed(n) => Self(n.to_string()),
            RawId::Unsigned(n) => Self(n.to_string()),
        })
    }
}

// =============================================================================
// Notification Message
// =============================================================================

/// A single notification delivered to the user.
///
/// Values are produced only by [`decode`] (or built directly in tests) and
/// are handed to the caller's handler by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    /// Server-assigned identifier.
    pub id: NotificationId,
    /// Category tag (e.g. `COMMENT`, `LIKE`, `NOTICE`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// When the server emitted the notification.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Whether the user has already read it.
    #[serde(default)]
    pub is_read: bool,
    /// Optional URL or in-app deep link to open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
}

impl NotificationMessage {
    fn validate(self) -> Result<Self, DecodeError> {
        if self.id.as_str().trim().is_empty() {
            return Err(DecodeError::Invalid {
                field: "id",
                reason: "must not be empty",
            });
        }
        if self.kind.trim().is_empty() {
            return Err(DecodeError::Invalid {
                field: "type",
                reason: "must not be empty",
            });
        }
        if self.title.trim().is_empty() {
            return Err(DecodeError::Invalid {
                field: "title",
                reason: "must not be empty",
            });
        }
        Ok(self)
    }
}

/// Decode and validate a notification from a JSON frame body.
///
/// # Errors
///
/// Returns [`DecodeError`] if the body is empty, is not a JSON object of the
/// notification shape, or carries an empty `id`, `type` or `title`.
pub fn decode(body: &str) -> Result<NotificationMessage, DecodeError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    let message: NotificationMessage = serde_json::from_str(trimmed)?;
    message.validate()
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(String),
        Millis(i64),
    }

    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Text(text) => parse_timestamp(&text).ok_or_else(|| {
            serde::de::Error::custom(format!("unrecognised timestamp `{text}`"))
        }),
        RawTimestamp::Millis(ms) => DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp {ms}ms out of range"))),
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
