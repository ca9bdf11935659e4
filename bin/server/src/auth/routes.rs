//! Authentication routes for login, callback, and logout.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use keygate_identity::{CallbackParams, ProviderError, RegistryError, SessionError};
use rootcause::Report;

use super::AppState;

/// Where the browser goes after a successful login.
const AFTER_LOGIN: &str = "/profile";

/// Starts a login by redirecting to the provider's consent page.
///
/// The pending authorization (CSRF state, PKCE verifier, nonce) is kept in an
/// encrypted short-lived cookie until the provider redirects back.
pub async fn begin_auth(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: PrivateCookieJar,
) -> Result<impl IntoResponse, AuthError> {
    let client = state
        .registry
        .resolve(&provider)
        .map_err(AuthError::UnknownProvider)?;

    let redirect = client
        .begin_redirect()
        .await
        .map_err(|report| AuthError::Redirect {
            provider: provider.clone(),
            report,
        })?;

    let jar = state
        .store
        .stash_pending(jar, &redirect.pending)
        .map_err(|error| AuthError::SessionWrite {
            provider: provider.clone(),
            error,
        })?;

    tracing::debug!(provider = %provider, "Redirecting to identity provider");

    Ok((jar, Redirect::temporary(&redirect.url)))
}

/// Handles the provider's redirect back after the user consented (or not).
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    jar: PrivateCookieJar,
) -> Result<impl IntoResponse, AuthError> {
    let client = state
        .registry
        .resolve(&provider)
        .map_err(AuthError::UnknownProvider)?;

    let exchange_error = |report: Report<ProviderError>| AuthError::Exchange {
        provider: provider.clone(),
        report,
    };
    let write_error = |error: SessionError| AuthError::SessionWrite {
        provider: provider.clone(),
        error,
    };

    let pending = state
        .store
        .pending(&jar)
        .ok_or_else(|| ProviderError::MissingAuthState {
            provider: provider.clone(),
        })
        .map_err(|e| exchange_error(e.into()))?;

    let code = params
        .authorization_code(&provider, &pending)
        .map_err(|e| exchange_error(e.into()))?;

    let identity = client
        .complete_exchange(&pending, code)
        .await
        .map_err(exchange_error)?;

    let mut session = state.store.load(&jar).await;
    session.set_identity(&identity).map_err(write_error)?;
    session.reissue(state.store.settings().max_age());

    let jar = state.store.save(jar, &session).map_err(write_error)?;
    let jar = state.store.discard_pending(jar);

    tracing::info!(
        provider = %provider,
        user_id = %identity.user_id,
        session_id = %session.id(),
        "User signed in"
    );

    Ok((jar, Redirect::to(AFTER_LOGIN)))
}

/// Signs the user out and returns to the landing page.
///
/// Always redirects, whether or not the provider is registered or a session
/// exists.
pub async fn sign_out(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: PrivateCookieJar,
) -> impl IntoResponse {
    let mut session = state.store.load(&jar).await;

    match state.registry.resolve(&provider) {
        Ok(client) => {
            let identity = session.identity().ok();
            if let Err(e) = client.sign_out(identity.as_ref()).await {
                tracing::warn!(provider = %provider, error = %e, "Provider sign-out failed");
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "Sign-out for unregistered provider");
        }
    }

    let jar = state.store.clear(jar, &mut session).await;

    (jar, Redirect::temporary("/"))
}

/// Authentication errors.
#[derive(Debug)]
pub enum AuthError {
    /// No provider is registered under the requested name.
    UnknownProvider(RegistryError),
    /// The provider could not build a consent redirect.
    Redirect {
        provider: String,
        report: Report<ProviderError>,
    },
    /// The callback was rejected or the code exchange failed.
    Exchange {
        provider: String,
        report: Report<ProviderError>,
    },
    /// The session or pending-state cookie could not be written.
    SessionWrite {
        provider: String,
        error: SessionError,
    },
}

impl AuthError {
    /// Name of the provider the failed request was addressed to.
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            Self::UnknownProvider(RegistryError::NotConfigured { provider })
            | Self::Redirect { provider, .. }
            | Self::Exchange { provider, .. }
            | Self::SessionWrite { provider, .. } => provider,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let provider = self.provider();

        let (status, message) = match &self {
            Self::UnknownProvider(e) => {
                tracing::warn!(provider = %provider, error = %e, "Unknown provider requested");
                (StatusCode::NOT_FOUND, "Unknown identity provider")
            }
            Self::Redirect { report, .. } => {
                tracing::error!(provider = %provider, error = %report, "Failed to start login");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to start login")
            }
            Self::Exchange { report, .. } => {
                tracing::warn!(provider = %provider, error = %report, "Login failed");
                (StatusCode::UNAUTHORIZED, "Authentication failed")
            }
            Self::SessionWrite { error, .. } => {
                tracing::error!(provider = %provider, error = %error, "Failed to write session");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(provider: &str) -> Report<ProviderError> {
        ProviderError::TokenExchange {
            provider: provider.to_string(),
            reason: "bad_verification_code".to_string(),
        }
        .into()
    }

    #[test]
    fn every_error_names_its_provider() {
        let errors = [
            AuthError::UnknownProvider(RegistryError::NotConfigured {
                provider: "myspace".to_string(),
            }),
            AuthError::Redirect {
                provider: "myspace".to_string(),
                report: failure("myspace"),
            },
            AuthError::Exchange {
                provider: "myspace".to_string(),
                report: failure("myspace"),
            },
            AuthError::SessionWrite {
                provider: "myspace".to_string(),
                error: SessionError::TooLarge {
                    size: 5000,
                    limit: 4096,
                },
            },
        ];

        for error in &errors {
            assert_eq!(error.provider(), "myspace");
        }
    }

    #[test]
    fn errors_map_to_status_codes() {
        let exchange = AuthError::Exchange {
            provider: "github".to_string(),
            report: failure("github"),
        };
        assert_eq!(exchange.into_response().status(), StatusCode::UNAUTHORIZED);

        let redirect = AuthError::Redirect {
            provider: "github".to_string(),
            report: failure("github"),
        };
        assert_eq!(
            redirect.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let unknown = AuthError::UnknownProvider(RegistryError::NotConfigured {
            provider: "myspace".to_string(),
        });
        assert_eq!(unknown.into_response().status(), StatusCode::NOT_FOUND);
    }
}
