//! The normalized identity produced by a successful provider exchange.
//!
//! Every provider maps its own profile shape onto [`Identity`], so the rest of
//! the gateway never needs to know which provider authenticated the visitor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated principal as reported by an identity provider.
///
/// The pair of `provider` and `user_id` uniquely identifies the principal.
/// Everything else is descriptive profile data and may be empty when the
/// provider does not supply it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Name of the provider that authenticated the user (e.g. "github").
    pub provider: String,
    /// The user's ID at the provider.
    pub user_id: String,
    /// Full display name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    /// Login or preferred username.
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub avatar_url: String,
    /// Free-text profile description (bio).
    #[serde(default)]
    pub description: String,
    /// Access token issued by the provider.
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// When the access token expires, if the provider said so.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Creates an identity with only the required fields set.
    #[must_use]
    pub fn new(provider: String, user_id: String, access_token: String) -> Self {
        Self {
            provider,
            user_id,
            name: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            nick_name: String::new(),
            location: String::new(),
            avatar_url: String::new(),
            description: String::new(),
            access_token,
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.unwrap_or_default();
        self
    }

    /// Sets the given and family names.
    #[must_use]
    pub fn with_names(mut self, first_name: Option<String>, last_name: Option<String>) -> Self {
        self.first_name = first_name.unwrap_or_default();
        self.last_name = last_name.unwrap_or_default();
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email.unwrap_or_default();
        self
    }

    /// Sets the nickname.
    #[must_use]
    pub fn with_nick_name(mut self, nick_name: Option<String>) -> Self {
        self.nick_name = nick_name.unwrap_or_default();
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location.unwrap_or_default();
        self
    }

    #[must_use]
    pub fn with_avatar_url(mut self, avatar_url: Option<String>) -> Self {
        self.avatar_url = avatar_url.unwrap_or_default();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.unwrap_or_default();
        self
    }

    /// Sets the refresh token and access token expiry.
    #[must_use]
    pub fn with_token_details(
        mut self,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.refresh_token = refresh_token;
        self.expires_at = expires_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github_identity() -> Identity {
        Identity::new(
            "github".to_string(),
            "12345".to_string(),
            "gho_token".to_string(),
        )
        .with_name(Some("Ada Lovelace".to_string()))
        .with_email(Some("a@example.com".to_string()))
        .with_nick_name(Some("ada".to_string()))
    }

    #[test]
    fn builder_sets_profile_fields() {
        let identity = github_identity();

        assert_eq!(identity.provider, "github");
        assert_eq!(identity.user_id, "12345");
        assert_eq!(identity.name, "Ada Lovelace");
        assert_eq!(identity.email, "a@example.com");
        assert_eq!(identity.nick_name, "ada");
        assert!(identity.first_name.is_empty());
        assert!(identity.refresh_token.is_none());
    }

    #[test]
    fn missing_optional_values_become_empty() {
        let identity = github_identity()
            .with_location(None)
            .with_description(None);

        assert!(identity.location.is_empty());
        assert!(identity.description.is_empty());
    }

    #[test]
    fn deserializes_with_missing_profile_fields() {
        let json = r#"{
            "provider": "github",
            "user_id": "7",
            "access_token": "tok"
        }"#;

        let identity: Identity = serde_json::from_str(json).expect("deserialize");

        assert_eq!(identity.user_id, "7");
        assert!(identity.email.is_empty());
        assert!(identity.expires_at.is_none());
    }
}
