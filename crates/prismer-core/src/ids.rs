//! Identifier types for prismer.
//!
//! Session ids are opaque correlation tokens minted by the agent or the
//! gateway; message ids are client-side UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum accepted length of a session token.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Length of the random suffix in generated session ids.
const GENERATED_SUFFIX_LEN: usize = 10;

/// An opaque session token threaded through chat requests.
///
/// The token is handed to the agent process as a command-line argument, so it
/// is restricted to `[A-Za-z0-9._:-]`, must not start with `-`, and is capped
/// at [`MAX_SESSION_ID_LEN`] characters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random `SessionId` of the form `session-<10 chars>`.
    #[must_use]
    pub fn generate() -> Self {
        let simple = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("session-{}", &simple[..GENERATED_SUFFIX_LEN]))
    }

    /// Return the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the bytes of the token.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for SessionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }
        if s.len() > MAX_SESSION_ID_LEN {
            return Err(IdError::TooLong {
                max: MAX_SESSION_ID_LEN,
                got: s.len(),
            });
        }
        if s.starts_with('-') {
            return Err(IdError::InvalidCharacter('-'));
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')))
        {
            return Err(IdError::InvalidCharacter(c));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A message identifier, unique within a conversation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageId(uuid::Uuid);

impl MessageId {
    /// Generate a new random `MessageId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Create a `MessageId` from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for MessageId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
        Ok(Self(uuid))
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for MessageId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.0.to_string()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input string is empty.
    #[error("identifier is empty")]
    Empty,

    /// The input exceeds the maximum length.
    #[error("identifier too long: max {max} characters, got {got}")]
    TooLong {
        /// The maximum accepted length.
        max: usize,
        /// The actual length.
        got: usize,
    },

    /// The input contains a character outside the allowed set.
    #[error("invalid character in identifier: {0:?}")]
    InvalidCharacter(char),

    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_session_id_shape() {
        let id = SessionId::generate();
        assert!(id.as_str().starts_with("session-"));
        assert_eq!(id.as_str().len(), "session-".len() + 10);
        assert_eq!(id.as_str().parse::<SessionId>().unwrap(), id);
    }

    #[test]
    fn session_ids_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn session_id_accepts_agent_tokens() {
        for raw in ["abc123", "session-x1_y2", "run:42", "v1.2"] {
            assert!(raw.parse::<SessionId>().is_ok(), "{raw}");
        }
    }

    #[test]
    fn session_id_rejects_flag_like_and_spaces() {
        assert_eq!(
            "--to".parse::<SessionId>(),
            Err(IdError::InvalidCharacter('-'))
        );
        assert_eq!(
            "a b".parse::<SessionId>(),
            Err(IdError::InvalidCharacter(' '))
        );
        assert_eq!("".parse::<SessionId>(), Err(IdError::Empty));
        let long = "a".repeat(MAX_SESSION_ID_LEN + 1);
        assert!(matches!(
            long.parse::<SessionId>(),
            Err(IdError::TooLong { .. })
        ));
    }

    #[test]
    fn session_id_serde_roundtrip() {
        let id: SessionId = "session-abc".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"session-abc\"");
        let parsed: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);

        let bad: Result<SessionId, _> = serde_json::from_str("\"-x\"");
        assert!(bad.is_err());
    }

    #[test]
    fn message_id_roundtrip() {
        let id = MessageId::generate();
        let parsed: MessageId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!(matches!(
            "not-a-uuid".parse::<MessageId>(),
            Err(IdError::InvalidUuid)
        ));
    }
}
