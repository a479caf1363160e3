//! Connection authentication: validates the bearer token before upgrade.

use std::sync::Arc;

use teamlink_core::error::AppError;
use teamlink_core::traits::auth::{Identity, TokenVerifier};

/// Authenticates connections using a [`TokenVerifier`].
#[derive(Debug, Clone)]
pub struct WsAuthenticator {
    /// Token verifier.
    verifier: Arc<dyn TokenVerifier>,
}

impl WsAuthenticator {
    /// Creates a new authenticator.
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// Authenticates a bearer token (from the query string or header).
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Identity, AppError> {
        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AppError::authentication("Missing access token")),
        };

        let verification = self.verifier.verify_token(token).await;
        match verification.identity {
            Some(identity) if verification.is_valid && !identity.user_id.is_blank() => Ok(identity),
            _ => Err(AppError::authentication(
                verification
                    .reason
                    .unwrap_or_else(|| "Invalid access token".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use teamlink_core::traits::auth::TokenVerification;
    use teamlink_core::types::UserId;

    #[derive(Debug)]
    struct StaticVerifier;

    #[async_trait]
    impl TokenVerifier for StaticVerifier {
        async fn verify_token(&self, token: &str) -> TokenVerification {
            if token == "good" {
                TokenVerification::valid(Identity {
                    user_id: UserId::new("alice"),
                    username: "Alice".into(),
                })
            } else {
                TokenVerification::invalid("Token has expired")
            }
        }
    }

    #[tokio::test]
    async fn test_authenticate_paths() {
        let auth = WsAuthenticator::new(Arc::new(StaticVerifier));

        let identity = auth.authenticate(Some("good")).await.unwrap();
        assert_eq!(identity.user_id, UserId::new("alice"));

        let err = auth.authenticate(Some("bad")).await.unwrap_err();
        assert_eq!(err.message, "Token has expired");

        let err = auth.authenticate(None).await.unwrap_err();
        assert_eq!(err.message, "Missing access token");
        assert!(auth.authenticate(Some("  ")).await.is_err());
    }
}
