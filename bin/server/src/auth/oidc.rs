//! Generic OpenID Connect login using the openidconnect crate.

use async_trait::async_trait;
use chrono::Utc;
use keygate_identity::{
    AuthRedirect, Identity, OidcProviderConfig, PendingAuth, ProviderClient, ProviderError,
    Result,
};
use openidconnect::core::{CoreAuthenticationFlow, CoreClient, CoreProviderMetadata};
use openidconnect::{
    AuthorizationCode, ClientId, ClientSecret, CsrfToken, IssuerUrl, Nonce, OAuth2TokenResponse,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse,
};

/// OIDC login provider, configured from the issuer's discovery document.
pub struct OidcProvider {
    name: String,
    provider_metadata: CoreProviderMetadata,
    client_id: ClientId,
    client_secret: ClientSecret,
    redirect_url: RedirectUrl,
    scopes: Vec<String>,
    http_client: reqwest::Client,
}

impl OidcProvider {
    /// Creates the provider by discovering the issuer's metadata.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Configuration` for invalid URLs and
    /// `ProviderError::Discovery` if the discovery document cannot be fetched.
    pub async fn discover(
        config: &OidcProviderConfig,
        http_client: reqwest::Client,
    ) -> Result<Self, ProviderError> {
        let name = config.name().to_string();

        let issuer_url = IssuerUrl::new(config.issuer_url().to_string()).map_err(|e| {
            ProviderError::Configuration {
                provider: name.clone(),
                reason: format!("invalid issuer URL: {e}"),
            }
        })?;

        let redirect_url = RedirectUrl::new(config.redirect_url().to_string()).map_err(|e| {
            ProviderError::Configuration {
                provider: name.clone(),
                reason: format!("invalid redirect URL: {e}"),
            }
        })?;

        let provider_metadata = CoreProviderMetadata::discover_async(issuer_url, &http_client)
            .await
            .map_err(|e| ProviderError::Discovery {
                provider: name.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(provider = %name, issuer = %config.issuer_url(), "Discovered OIDC provider");

        Ok(Self {
            scopes: config.scopes().into_iter().map(str::to_string).collect(),
            client_id: ClientId::new(config.client_id().to_string()),
            client_secret: ClientSecret::new(config.client_secret().to_string()),
            name,
            provider_metadata,
            redirect_url,
            http_client,
        })
    }

    fn exchange_error(&self, reason: String) -> ProviderError {
        ProviderError::TokenExchange {
            provider: self.name.clone(),
            reason,
        }
    }
}

#[async_trait]
impl ProviderClient for OidcProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn begin_redirect(&self) -> Result<AuthRedirect, ProviderError> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let client = CoreClient::from_provider_metadata(
            self.provider_metadata.clone(),
            self.client_id.clone(),
            Some(self.client_secret.clone()),
        )
        .set_redirect_uri(self.redirect_url.clone());

        let mut auth_request = client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .set_pkce_challenge(pkce_challenge);

        // "openid" is always sent; skip it if configured explicitly
        for scope in self.scopes.iter().filter(|s| s.as_str() != "openid") {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token, nonce) = auth_request.url();

        Ok(AuthRedirect {
            url: auth_url.to_string(),
            pending: PendingAuth {
                provider: self.name.clone(),
                csrf_state: csrf_token.secret().clone(),
                pkce_verifier: pkce_verifier.secret().clone(),
                nonce: Some(nonce.secret().clone()),
            },
        })
    }

    async fn complete_exchange(
        &self,
        pending: &PendingAuth,
        code: &str,
    ) -> Result<Identity, ProviderError> {
        let nonce = pending
            .nonce
            .clone()
            .map(Nonce::new)
            .ok_or_else(|| ProviderError::MissingAuthState {
                provider: self.name.clone(),
            })?;

        let client = CoreClient::from_provider_metadata(
            self.provider_metadata.clone(),
            self.client_id.clone(),
            Some(self.client_secret.clone()),
        )
        .set_redirect_uri(self.redirect_url.clone());

        let token_request = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| self.exchange_error(format!("token endpoint error: {e}")))?;

        let token_response = token_request
            .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier.clone()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| self.exchange_error(e.to_string()))?;

        let id_token = token_response
            .id_token()
            .ok_or_else(|| self.exchange_error("no ID token in response".to_string()))?;

        let claims = id_token
            .claims(&client.id_token_verifier(), &nonce)
            .map_err(|e| ProviderError::TokenValidation {
                provider: self.name.clone(),
                reason: e.to_string(),
            })?;

        let name = claims
            .name()
            .and_then(|n| n.get(None))
            .map(|n| n.as_str().to_string());
        let first_name = claims
            .given_name()
            .and_then(|n| n.get(None))
            .map(|n| n.as_str().to_string());
        let last_name = claims
            .family_name()
            .and_then(|n| n.get(None))
            .map(|n| n.as_str().to_string());

        let expires_at = token_response
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);

        Ok(Identity::new(
            self.name.clone(),
            claims.subject().to_string(),
            token_response.access_token().secret().clone(),
        )
        .with_name(name)
        .with_names(first_name, last_name)
        .with_email(claims.email().map(|e| e.as_str().to_string()))
        .with_nick_name(claims.preferred_username().map(|u| u.as_str().to_string()))
        .with_token_details(
            token_response.refresh_token().map(|t| t.secret().clone()),
            expires_at,
        ))
    }
}
