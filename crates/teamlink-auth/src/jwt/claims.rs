//! JWT claims structure carried by access tokens.

use serde::{Deserialize, Serialize};

use teamlink_core::traits::auth::Identity;
use teamlink_core::types::UserId;

/// JWT claims payload embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the user ID.
    pub sub: String,
    /// Username for display.
    #[serde(default)]
    pub username: String,
    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    /// Returns the identity the token vouches for.
    pub fn identity(&self) -> Identity {
        let username = if self.username.is_empty() {
            self.sub.clone()
        } else {
            self.username.clone()
        };
        Identity {
            user_id: UserId::new(self.sub.clone()),
            username,
        }
    }
}
