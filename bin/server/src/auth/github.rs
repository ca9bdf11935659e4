//! GitHub OAuth2 login.
//!
//! GitHub is a plain OAuth2 provider: there is no ID token, so the identity is
//! read from the REST API (`GET /user`) with the freshly issued access token.
//! Accounts with a private email address report `email: null` there; in that
//! case the primary verified address is taken from `GET /user/emails`, which
//! the default `user:email` scope allows.

use async_trait::async_trait;
use chrono::Utc;
use keygate_identity::{
    AuthRedirect, Identity, OAuthProviderConfig, PendingAuth, ProviderClient, ProviderError,
    Result,
};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use tracing::instrument;

/// Name GitHub is registered and routed under.
pub const GITHUB_PROVIDER: &str = "github";

const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_API_URL: &str = "https://api.github.com";

/// Scopes requested when none are configured.
const DEFAULT_SCOPES: &[&str] = &["user:email"];

/// GitHub rejects API requests without a User-Agent.
const API_USER_AGENT: &str = concat!("keygate/", env!("CARGO_PKG_VERSION"));

/// GitHub login provider.
pub struct GithubProvider {
    client_id: ClientId,
    client_secret: ClientSecret,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_url: RedirectUrl,
    api_url: String,
    scopes: Vec<String>,
    http_client: reqwest::Client,
}

/// Subset of `GET /user` the identity is built from.
#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
    bio: Option<String>,
    location: Option<String>,
}

/// Entry of `GET /user/emails`.
#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

impl GithubProvider {
    /// Creates the provider from its registration settings.
    ///
    /// `http_client` is shared by the token exchange and the API calls; it
    /// should not follow redirects.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Configuration` if any endpoint URL is invalid.
    pub fn new(
        config: &OAuthProviderConfig,
        http_client: reqwest::Client,
    ) -> Result<Self, ProviderError> {
        let auth_url = AuthUrl::new(config.auth_url().unwrap_or(GITHUB_AUTH_URL).to_string())
            .map_err(|e| configuration_error(format!("invalid auth URL: {e}")))?;
        let token_url = TokenUrl::new(config.token_url().unwrap_or(GITHUB_TOKEN_URL).to_string())
            .map_err(|e| configuration_error(format!("invalid token URL: {e}")))?;
        let redirect_url = RedirectUrl::new(config.redirect_url().to_string())
            .map_err(|e| configuration_error(format!("invalid redirect URL: {e}")))?;

        Ok(Self {
            client_id: ClientId::new(config.client_id().to_string()),
            client_secret: ClientSecret::new(config.client_secret().to_string()),
            auth_url,
            token_url,
            redirect_url,
            api_url: config
                .api_url()
                .unwrap_or(GITHUB_API_URL)
                .trim_end_matches('/')
                .to_string(),
            scopes: config
                .scopes_or(DEFAULT_SCOPES)
                .into_iter()
                .map(str::to_string)
                .collect(),
            http_client,
        })
    }

    /// Reads the user profile with an access token.
    #[instrument(skip(self, access_token))]
    async fn fetch_user(&self, access_token: &str) -> Result<GithubUser, ProviderError> {
        let user: GithubUser = self.api_get("/user", access_token).await?;

        if user.email.is_some() {
            return Ok(user);
        }

        // Private email addresses are only listed by the emails endpoint
        let email = match self.api_get::<Vec<GithubEmail>>("/user/emails", access_token).await {
            Ok(emails) => emails
                .into_iter()
                .find(|e| e.primary && e.verified)
                .map(|e| e.email),
            Err(e) => {
                tracing::debug!(error = %e, "No email available from GitHub");
                None
            }
        };

        Ok(GithubUser { email, ..user })
    }

    async fn api_get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
    ) -> Result<T, ProviderError> {
        let response = self
            .http_client
            .get(format!("{}{path}", self.api_url))
            .bearer_auth(access_token)
            .header(USER_AGENT, API_USER_AGENT)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| profile_error(format!("{path} request failed: {e}")))?
            .error_for_status()
            .map_err(|e| profile_error(format!("{path} returned an error: {e}")))?;

        response
            .json()
            .await
            .map_err(|e| profile_error(format!("{path} returned an unexpected body: {e}")).into())
    }
}

#[async_trait]
impl ProviderClient for GithubProvider {
    fn name(&self) -> &str {
        GITHUB_PROVIDER
    }

    async fn begin_redirect(&self) -> Result<AuthRedirect, ProviderError> {
        let client = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_redirect_uri(self.redirect_url.clone());

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(pkce_challenge);

        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request.url();

        Ok(AuthRedirect {
            url: auth_url.to_string(),
            pending: PendingAuth {
                provider: GITHUB_PROVIDER.to_string(),
                csrf_state: csrf_token.secret().clone(),
                pkce_verifier: pkce_verifier.secret().clone(),
                nonce: None,
            },
        })
    }

    async fn complete_exchange(
        &self,
        pending: &PendingAuth,
        code: &str,
    ) -> Result<Identity, ProviderError> {
        let client = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone());

        let token = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier.clone()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| ProviderError::TokenExchange {
                provider: GITHUB_PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let access_token = token.access_token().secret().clone();
        let refresh_token = token.refresh_token().map(|t| t.secret().clone());
        let expires_at = token
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);

        let user = self.fetch_user(&access_token).await?;

        Ok(identity_from_user(user, access_token)
            .with_token_details(refresh_token, expires_at))
    }
}

fn identity_from_user(user: GithubUser, access_token: String) -> Identity {
    Identity::new(
        GITHUB_PROVIDER.to_string(),
        user.id.to_string(),
        access_token,
    )
    .with_name(user.name)
    .with_email(user.email)
    .with_nick_name(Some(user.login))
    .with_avatar_url(user.avatar_url)
    .with_description(user.bio)
    .with_location(user.location)
}

fn configuration_error(reason: String) -> ProviderError {
    ProviderError::Configuration {
        provider: GITHUB_PROVIDER.to_string(),
        reason,
    }
}

fn profile_error(reason: String) -> ProviderError {
    ProviderError::Profile {
        provider: GITHUB_PROVIDER.to_string(),
        reason,
    }
}
