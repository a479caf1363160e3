//! JWT token verification.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::debug;

use teamlink_core::config::AuthConfig;
use teamlink_core::traits::auth::{TokenVerification, TokenVerifier};

use super::claims::Claims;

/// Validates HS256 bearer tokens and extracts the identity they carry.
#[derive(Clone)]
pub struct JwtVerifier {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtVerifier {
    /// Creates a new verifier from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a token string, mapping failures to a reason.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, String> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    "Token has expired".to_string()
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => "Invalid token format".to_string(),
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    "Invalid token signature".to_string()
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => "Invalid token issuer".to_string(),
                _ => format!("Token validation failed: {e}"),
            }
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err("Token has no subject".to_string());
        }

        Ok(data.claims)
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify_token(&self, token: &str) -> TokenVerification {
        match self.decode_claims(token) {
            Ok(claims) => TokenVerification::valid(claims.identity()),
            Err(reason) => {
                debug!(reason = %reason, "Token rejected");
                TokenVerification::invalid(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::encoder::JwtEncoder;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            issuer: None,
            leeway_seconds: 0,
        }
    }

    #[tokio::test]
    async fn test_valid_token_yields_identity() {
        let encoder = JwtEncoder::new(&config());
        let token = encoder
            .issue("2", "bob", chrono::Duration::minutes(5))
            .unwrap();

        let result = JwtVerifier::new(&config()).verify_token(&token).await;
        assert!(result.is_valid);
        let identity = result.identity.unwrap();
        assert_eq!(identity.user_id.as_str(), "2");
        assert_eq!(identity.username, "bob");
    }

    #[tokio::test]
    async fn test_wrong_secret_is_rejected() {
        let encoder = JwtEncoder::new(&AuthConfig {
            jwt_secret: "other".to_string(),
            ..config()
        });
        let token = encoder
            .issue("2", "bob", chrono::Duration::minutes(5))
            .unwrap();

        let result = JwtVerifier::new(&config()).verify_token(&token).await;
        assert!(!result.is_valid);
        assert!(result.identity.is_none());
        assert_eq!(result.reason.as_deref(), Some("Invalid token signature"));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let encoder = JwtEncoder::new(&config());
        let token = encoder
            .issue("2", "bob", chrono::Duration::minutes(-10))
            .unwrap();

        let result = JwtVerifier::new(&config()).verify_token(&token).await;
        assert!(!result.is_valid);
        assert_eq!(result.reason.as_deref(), Some("Token has expired"));
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let result = JwtVerifier::new(&config()).verify_token("not-a-jwt").await;
        assert!(!result.is_valid);
        assert!(result.reason.is_some());
    }
}
