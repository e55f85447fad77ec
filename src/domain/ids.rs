//! Identifier types for conversations and messages.
//!
//! Server-issued identifiers are opaque strings: the backend decides their
//! shape, and some backends emit integers. Both forms normalize to text at
//! decode time so the rest of the crate only ever compares strings.
//!
//! Temporary message ids are issued client-side as random UUIDs.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire form of an opaque identifier: a JSON string or integer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    /// Textual identifier.
    Text(String),
    /// Signed integer identifier.
    Signed(i64),
    /// Unsigned integer identifier too large for `i64`.
    Unsigned(u64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Signed(n) => n.to_string(),
            RawId::Unsigned(n) => n.to_string(),
        }
    }
}

/// Declare an opaque, server-issued string identifier.
macro_rules! define_opaque_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(from = "RawId", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier string as-is.
            #[inline]
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow as `&str`.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<RawId> for $name {
            fn from(raw: RawId) -> Self {
                Self(String::from(raw))
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = core::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }
    };
}

/// Declare a client-generated UUID identifier.
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        // Paired with `new` for clippy::new_without_default.
        impl Default for $name {
            #[inline]
            fn default() -> Self {
                Self::new()
            }
        }

        impl $name {
            /// Create a new random identifier.
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_opaque_id!(
    /// Identifier of a conversation, assigned by the backend on creation.
    ConversationId
);

define_opaque_id!(
    /// Identifier of a message.
    ///
    /// Holds a [`TempMessageId`] rendered as text while the message is
    /// pending, and the server-issued id once confirmed.
    MessageId
);

define_uuid_id!(
    /// Client-side identifier of an optimistic message awaiting confirmation.
    TempMessageId
);

impl From<TempMessageId> for MessageId {
    fn from(value: TempMessageId) -> Self {
        Self(value.to_string())
    }
}

impl PartialEq<TempMessageId> for MessageId {
    fn eq(&self, other: &TempMessageId) -> bool {
        Uuid::parse_str(&self.0).is_ok_and(|uuid| uuid == other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_id_accepts_numbers() {
        let from_text: ConversationId = serde_json::from_str("\"c-1\"").unwrap();
        let from_int: ConversationId = serde_json::from_str("42").unwrap();

        assert_eq!(from_text.as_str(), "c-1");
        assert_eq!(from_int.as_str(), "42");
    }

    #[test]
    fn test_opaque_id_serializes_as_string() {
        let id = MessageId::new("m2");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"m2\"");
    }

    #[test]
    fn test_temp_id_matches_message_id() {
        let temp = TempMessageId::new();
        let id = MessageId::from(temp);

        assert_eq!(id, temp);
        assert_ne!(MessageId::new("m2"), temp);
    }
}
