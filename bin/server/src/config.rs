//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys use
//! a double underscore, e.g. `SESSION__SECRET_KEY` or `GITHUB__CLIENT_ID`.
//!
//! See [`OAuthProviderConfig`] and [`OidcProviderConfig`] for the provider
//! credential settings.

use keygate_identity::{OAuthProviderConfig, OidcProviderConfig};
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Provider unauthenticated visitors are sent to.
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Upper bound for any single request to an identity provider, in seconds.
    #[serde(default = "default_provider_timeout_seconds")]
    pub provider_timeout_seconds: u64,

    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// GitHub OAuth credentials.
    #[serde(default)]
    pub github: Option<OAuthProviderConfig>,

    /// Generic OpenID Connect provider.
    #[serde(default)]
    pub oidc: Option<OidcProviderConfig>,
}

/// Session-related configuration.
#[derive(Clone, Deserialize)]
pub struct SessionConfig {
    /// Key material for cookie encryption; at least 64 bytes.
    ///
    /// Changing it invalidates every outstanding session.
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Production mode: cookies get `Secure` and `SameSite=None`.
    /// Outside production they get neither `Secure` nor `SameSite=None`
    /// (browsers reject `SameSite=None` without `Secure`), and fall back to `Lax`.
    #[serde(default)]
    pub production: bool,

    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Interval between revocation-list cleanup runs, in seconds. Must be
    /// positive.
    #[serde(default = "default_revocation_cleanup_interval_seconds")]
    pub revocation_cleanup_interval_seconds: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_provider() -> String {
    "github".to_string()
}

fn default_provider_timeout_seconds() -> u64 {
    10
}

fn default_cookie_name() -> String {
    "keygate_session".to_string()
}

fn default_revocation_cleanup_interval_seconds() -> u64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            production: false,
            cookie_name: default_cookie_name(),
            revocation_cleanup_interval_seconds: default_revocation_cleanup_interval_seconds(),
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("production", &self.production)
            .field("cookie_name", &self.cookie_name)
            .field(
                "revocation_cleanup_interval_seconds",
                &self.revocation_cleanup_interval_seconds,
            )
            .finish()
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_has_correct_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.cookie_name, "keygate_session");
        assert_eq!(config.revocation_cleanup_interval_seconds, 300);
        assert!(!config.production);
        assert!(config.secret_key.is_none());
    }

    #[test]
    fn server_config_deserializes_with_defaults() {
        let json = r#"{
            "github": {
                "client_id": "id",
                "client_secret": "secret",
                "redirect_url": "http://localhost:8080/auth/github/callback"
            }
        }"#;

        let config: ServerConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.default_provider, "github");
        assert_eq!(config.provider_timeout_seconds, 10);
        assert!(config.github.is_some());
        assert!(config.oidc.is_none());
    }

    #[test]
    fn session_config_debug_redacts_key() {
        let config = SessionConfig {
            secret_key: Some("super-secret".to_string()),
            ..SessionConfig::default()
        };
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
