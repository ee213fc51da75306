//! Destination Naming
//!
//! The broker routes notifications through two STOMP destinations:
//!
//! - `/user/{userId}/queue/notifications` - private feed for one user
//! - `/topic/notifications` - broadcast feed for everyone
//!
//! These names are fixed by the server and must match byte for byte.

use std::fmt;

/// Broadcast destination shared by every session.
pub const BROADCAST_NOTIFICATIONS: &str = "/topic/notifications";

/// Error returned when a user id cannot be embedded in a destination.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserIdError {
    /// The id was empty or whitespace.
    #[error("user id must not be empty")]
    Empty,
    /// The id contains a character that would change the destination path.
    #[error("user id contains forbidden character {0:?}")]
    ForbiddenChar(char),
}

/// Identifier of the user whose session owns a client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a user id.
    ///
    /// # Errors
    ///
    /// Returns [`UserIdError`] if the id is empty or contains `/`,
    /// whitespace, or a control character.
    pub fn new(id: impl Into<String>) -> Result<Self, UserIdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(UserIdError::Empty);
        }
        if let Some(c) = id
            .chars()
            .find(|c| *c == '/' || c.is_whitespace() || c.is_control())
        {
            return Err(UserIdError::ForbiddenChar(c));
        }
        Ok(Self(id))
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Private notification destination for `user_id`.
#[must_use]
pub fn user_notifications(user_id: &UserId) -> String {
    format!("/user/{user_id}/queue/notifications")
}

/// The two feeds a client subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    /// Per-user private queue.
    Private,
    /// Global broadcast topic.
    Broadcast,
}

impl Feed {
    /// Both feeds, in subscription order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Private, Self::Broadcast]
    }

    /// Destination for this feed.
    #[must_use]
    pub fn destination(self, user_id: &UserId) -> String {
        match self {
            Self::Private => user_notifications(user_id),
            Self::Broadcast => BROADCAST_NOTIFICATIONS.to_string(),
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Broadcast => "broadcast",
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn private_destination_format() {
        let user = UserId::new("1234").unwrap();
        assert_eq!(user_notifications(&user), "/user/1234/queue/notifications");
        assert_eq!(
            Feed::Private.destination(&user),
            "/user/1234/queue/notifications"
        );
    }

    #[test]
    fn broadcast_destination_is_fixed() {
        let user = UserId::new("a").unwrap();
        assert_eq!(Feed::Broadcast.destination(&user), "/topic/notifications");
    }

    #[test]
    fn feeds_in_subscription_order() {
        assert_eq!(Feed::all(), &[Feed::Private, Feed::Broadcast]);
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "blank")]
    fn empty_user_id_rejected(id: &str) {
        assert_eq!(UserId::new(id), Err(UserIdError::Empty));
    }

    #[test_case("a/b", '/' ; "slash")]
    #[test_case("a b", ' ' ; "space")]
    #[test_case("a\nb", '\n' ; "newline")]
    fn forbidden_characters_rejected(id: &str, c: char) {
        assert_eq!(UserId::new(id), Err(UserIdError::ForbiddenChar(c)));
    }
}
