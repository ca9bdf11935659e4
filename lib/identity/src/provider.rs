//! The provider-client capability and the data exchanged with it.
//!
//! A login has two halves. [`ProviderClient::begin_redirect`] produces the
//! provider's consent URL together with a [`PendingAuth`] that the caller must
//! keep until the provider redirects back. [`ProviderClient::complete_exchange`]
//! receives that pending state plus the validated callback code and turns them
//! into an [`Identity`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};
use crate::identity::Identity;

/// Where to send the browser, and what to remember until it comes back.
#[derive(Debug, Clone)]
pub struct AuthRedirect {
    /// The provider's authorization URL.
    pub url: String,
    /// State needed to complete the exchange on callback.
    pub pending: PendingAuth,
}

/// Authorization state kept between redirect and callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuth {
    /// Provider that issued the redirect.
    pub provider: String,
    /// The OAuth `state` parameter sent to the provider.
    pub csrf_state: String,
    /// PKCE code verifier.
    pub pkce_verifier: String,
    /// OIDC nonce, for providers that issue ID tokens.
    #[serde(default)]
    pub nonce: Option<String>,
}

/// Query parameters delivered to the callback endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Error code when the provider refused (e.g. "access_denied").
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Checks the callback against the pending authorization and returns the
    /// authorization code.
    ///
    /// # Errors
    ///
    /// - `Denied` if the provider reported an error
    /// - `StateMismatch` if the pending state belongs to another provider or
    ///   the `state` parameter is missing or different
    /// - `MissingCode` if no code was supplied
    pub fn authorization_code(
        &self,
        provider: &str,
        pending: &PendingAuth,
    ) -> std::result::Result<&str, ProviderError> {
        if let Some(error) = &self.error {
            let reason = match &self.error_description {
                Some(description) => format!("{error}: {description}"),
                None => error.clone(),
            };
            return Err(ProviderError::Denied {
                provider: provider.to_string(),
                reason,
            });
        }

        if pending.provider != provider || self.state.as_deref() != Some(&pending.csrf_state) {
            return Err(ProviderError::StateMismatch {
                provider: provider.to_string(),
            });
        }

        self.code
            .as_deref()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| ProviderError::MissingCode {
                provider: provider.to_string(),
            })
    }
}

/// An identity provider the gateway can log users in with.
///
/// Implementations own the protocol details (URL construction, token
/// exchange, token validation, profile lookup). They must not touch session
/// state; the flow controller does that.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// The name this provider is registered and routed under.
    fn name(&self) -> &str;

    /// Builds the authorization URL for a new login attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect cannot be constructed.
    async fn begin_redirect(&self) -> Result<AuthRedirect, ProviderError>;

    /// Exchanges the callback code for tokens and a normalized identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange, token validation or profile lookup fails.
    async fn complete_exchange(
        &self,
        pending: &PendingAuth,
        code: &str,
    ) -> Result<Identity, ProviderError>;

    /// Ends the provider-side session, for protocols that have one.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the logout.
    async fn sign_out(&self, _identity: Option<&Identity>) -> Result<(), ProviderError> {
        Ok(())
    }
}
