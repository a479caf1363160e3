//! Newtype wrappers around opaque string identifiers.
//!
//! User identities come from the authentication collaborator and are
//! opaque strings (`"1"`, `"alice"`, a UUID, ...). Connection and message
//! identifiers are generated as UUIDv4 strings when the caller does not
//! supply one. Distinct types keep a `ConnectionId` from being passed where
//! a `UserId` is expected.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a newtype ID wrapper around `String`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier string.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }

            /// Return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Identity of a user as returned by token verification.
    UserId
);

define_id!(
    /// Opaque identifier of one live transport connection.
    ConnectionId
);

define_id!(
    /// Unique identifier of a chat/system/notification message.
    MessageId
);

/// Recipient sentinel meaning "every connected user".
pub const BROADCAST_RECIPIENT: &str = "*";

impl UserId {
    /// Whether this identity is the broadcast sentinel.
    pub fn is_broadcast(&self) -> bool {
        self.0 == BROADCAST_RECIPIENT
    }

    /// The broadcast sentinel identity.
    pub fn broadcast() -> Self {
        Self(BROADCAST_RECIPIENT.to_string())
    }
}
