//! Token verification collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Identity established by a verified bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User ID.
    pub user_id: UserId,
    /// Username (display).
    pub username: String,
}

/// Outcome of verifying a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenVerification {
    /// Whether the token is valid.
    pub is_valid: bool,
    /// Identity when valid.
    pub identity: Option<Identity>,
    /// Rejection reason when invalid.
    pub reason: Option<String>,
}

impl TokenVerification {
    /// A successful verification.
    pub fn valid(identity: Identity) -> Self {
        Self {
            is_valid: true,
            identity: Some(identity),
            reason: None,
        }
    }

    /// A failed verification with a reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            identity: None,
            reason: Some(reason.into()),
        }
    }
}

/// Verifies a bearer token and returns the identity it carries.
#[async_trait]
pub trait TokenVerifier: Send + Sync + std::fmt::Debug + 'static {
    /// Verify a raw token string.
    async fn verify_token(&self, token: &str) -> TokenVerification;
}
