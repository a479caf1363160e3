//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a serde default so partial files load.

pub mod app;
pub mod auth;
pub mod cache;
pub mod delivery;
pub mod logging;
pub mod presence;
pub mod realtime;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::auth::AuthConfig;
pub use self::cache::CacheConfig;
pub use self::delivery::DeliveryConfig;
pub use self::logging::LoggingConfig;
pub use self::presence::PresenceConfig;
pub use self::realtime::RealtimeConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Constructed once at startup and handed to each component's constructor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Token verification settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Side-store (cache) settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Connection registry and transport settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Presence tracker settings.
    #[serde(default)]
    pub presence: PresenceConfig,
    /// Delivery protocol and message store settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default.toml` with an environment-specific overlay
    /// and environment variables prefixed with `TEAMLINK__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("TEAMLINK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source_uses_defaults() {
        let config: AppConfig = config::Config::builder()
            .build()
            .and_then(|c| c.try_deserialize())
            .expect("empty config should deserialize");

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.delivery.default_ttl_seconds, 86_400);
        assert_eq!(config.presence.inactivity_threshold_seconds, 300);
        assert_eq!(config.cache.provider, "memory");
    }

    #[test]
    fn test_partial_toml_overrides() {
        let toml = r#"
            [delivery]
            ack_timeout_ms = 250

            [presence]
            sweep_interval_seconds = 5
        "#;
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .expect("partial config should deserialize");

        assert_eq!(config.delivery.ack_timeout_ms, 250);
        assert_eq!(config.delivery.cleanup_interval_seconds, 300);
        assert_eq!(config.presence.sweep_interval_seconds, 5);
    }
}
