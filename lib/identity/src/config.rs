//! Provider registration settings.
//!
//! These types describe the credentials each provider is registered with.
//! They are loaded once at startup (see the server's configuration) and are
//! immutable afterwards.

use serde::{Deserialize, Serialize};

/// Credentials for a plain OAuth2 provider such as GitHub.
///
/// Endpoint fields default to the provider's public endpoints and only need
/// to be set for enterprise installations or tests.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthProviderConfig {
    /// The OAuth2 client ID registered with the provider.
    client_id: String,
    /// The OAuth2 client secret.
    client_secret: String,
    /// Callback URL registered with the provider
    /// (e.g. "https://app.example.com/auth/github/callback").
    redirect_url: String,
    /// OAuth2 scopes to request as a comma-separated string.
    #[serde(default)]
    scopes: Option<String>,
    /// Authorization endpoint override.
    #[serde(default)]
    auth_url: Option<String>,
    /// Token endpoint override.
    #[serde(default)]
    token_url: Option<String>,
    /// REST API base URL override.
    #[serde(default)]
    api_url: Option<String>,
}

impl OAuthProviderConfig {
    #[must_use]
    pub fn new(client_id: String, client_secret: String, redirect_url: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_url,
            scopes: None,
            auth_url: None,
            token_url: None,
            api_url: None,
        }
    }

    /// Overrides the provider endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, auth_url: String, token_url: String, api_url: String) -> Self {
        self.auth_url = Some(auth_url);
        self.token_url = Some(token_url);
        self.api_url = Some(api_url);
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    #[must_use]
    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    /// Returns the configured scopes, or `default` when none are configured.
    #[must_use]
    pub fn scopes_or<'a>(&'a self, default: &[&'a str]) -> Vec<&'a str> {
        match &self.scopes {
            Some(scopes) => split_scopes(scopes),
            None => default.to_vec(),
        }
    }

    #[must_use]
    pub fn auth_url(&self) -> Option<&str> {
        self.auth_url.as_deref()
    }

    #[must_use]
    pub fn token_url(&self) -> Option<&str> {
        self.token_url.as_deref()
    }

    #[must_use]
    pub fn api_url(&self) -> Option<&str> {
        self.api_url.as_deref()
    }
}

impl std::fmt::Debug for OAuthProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

/// Configuration for an OpenID Connect provider (e.g. Keycloak, Auth0).
#[derive(Clone, Serialize, Deserialize)]
pub struct OidcProviderConfig {
    /// Name the provider is routed under (`/auth/{name}`).
    #[serde(default = "default_oidc_name")]
    name: String,
    /// The OIDC issuer URL, used for discovery.
    issuer_url: String,
    client_id: String,
    client_secret: String,
    /// Callback URL registered with the provider.
    redirect_url: String,
    /// OAuth2 scopes to request as a comma-separated string.
    /// Default: "openid,email,profile"
    #[serde(default = "default_oidc_scopes")]
    scopes: String,
}

fn default_oidc_name() -> String {
    "oidc".to_string()
}

fn default_oidc_scopes() -> String {
    "openid,email,profile".to_string()
}

impl OidcProviderConfig {
    /// Creates a new OIDC configuration with default name and scopes.
    #[must_use]
    pub fn new(
        issuer_url: String,
        client_id: String,
        client_secret: String,
        redirect_url: String,
    ) -> Self {
        Self {
            name: default_oidc_name(),
            issuer_url,
            client_id,
            client_secret,
            redirect_url,
            scopes: default_oidc_scopes(),
        }
    }

    /// Sets the name the provider is registered under.
    #[must_use]
    pub fn with_name(mut self, name: String) -> Self {
        self.name = name;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn issuer_url(&self) -> &str {
        &self.issuer_url
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    #[must_use]
    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    /// Returns the OAuth2 scopes to request, parsed from the comma-separated string.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        split_scopes(&self.scopes)
    }
}

impl std::fmt::Debug for OidcProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcProviderConfig")
            .field("name", &self.name)
            .field("issuer_url", &self.issuer_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

fn split_scopes(scopes: &str) -> Vec<&str> {
    scopes
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oauth_config_uses_default_scopes() {
        let config = OAuthProviderConfig::new(
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://app.example.com/auth/github/callback".to_string(),
        );

        assert_eq!(config.scopes_or(&["user:email"]), vec!["user:email"]);
        assert!(config.auth_url().is_none());
    }

    #[test]
    fn oauth_config_deserializes_scopes() {
        let json = r#"{
            "client_id": "my-client",
            "client_secret": "secret",
            "redirect_url": "https://app.example.com/auth/github/callback",
            "scopes": "read:user, user:email"
        }"#;

        let config: OAuthProviderConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(
            config.scopes_or(&["ignored"]),
            vec!["read:user", "user:email"]
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let oauth = OAuthProviderConfig::new(
            "client-id".to_string(),
            "hunter2".to_string(),
            "https://app.example.com/cb".to_string(),
        );
        let oidc = OidcProviderConfig::new(
            "https://auth.example.com".to_string(),
            "client-id".to_string(),
            "hunter2".to_string(),
            "https://app.example.com/cb".to_string(),
        );

        assert!(!format!("{oauth:?}").contains("hunter2"));
        assert!(!format!("{oidc:?}").contains("hunter2"));
    }

    #[test]
    fn oidc_config_deserializes_with_defaults() {
        let json = r#"{
            "issuer_url": "https://auth.example.com",
            "client_id": "my-client",
            "client_secret": "secret",
            "redirect_url": "https://app.example.com/auth/oidc/callback"
        }"#;

        let config: OidcProviderConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(config.name(), "oidc");
        assert_eq!(config.scopes(), vec!["openid", "email", "profile"]);
    }

    #[test]
    fn oidc_config_with_name() {
        let config = OidcProviderConfig::new(
            "https://auth.example.com".to_string(),
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://app.example.com/auth/keycloak/callback".to_string(),
        )
        .with_name("keycloak".to_string());

        assert_eq!(config.name(), "keycloak");
        assert_eq!(config.issuer_url(), "https://auth.example.com");
    }
}
