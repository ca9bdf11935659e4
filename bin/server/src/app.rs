//! Router assembly and startup wiring.

use axum::{Router, routing::get};
use axum_extra::extract::cookie::Key;
use keygate_identity::{ProviderClient, ProviderRegistry, Result};
use rootcause::Report;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState, CookieSettings, GithubProvider, OidcProvider, SessionStore};
use crate::config::{ServerConfig, SessionConfig};
use crate::error::StartupError;
use crate::health;
use crate::pages::{self, Pages};

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::landing))
        .route("/health", get(health::health))
        .route("/profile", get(pages::profile))
        .route("/auth/{provider}", get(auth::begin_auth))
        .route("/auth/{provider}/callback", get(auth::callback))
        .route("/logout/{provider}", get(auth::sign_out))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Constructs the application state from configuration.
///
/// Providers are built here; OIDC discovery happens now rather than on the
/// first login.
///
/// # Errors
///
/// Returns an error if no provider is configured, the default provider is not
/// among them, a provider cannot be constructed, the session key is invalid or
/// the revocation cleanup interval is zero.
pub async fn build_state(config: &ServerConfig) -> Result<AppState, StartupError> {
    revocation_cleanup_interval(&config.session)?;

    let http_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(config.provider_timeout_seconds))
        .build()
        .map_err(|e| StartupError::Configuration {
            details: format!("failed to create HTTP client: {e}"),
        })?;

    let mut providers: Vec<Arc<dyn ProviderClient>> = Vec::new();

    if let Some(github) = &config.github {
        let provider = GithubProvider::new(github, http_client.clone()).map_err(provider_error)?;
        providers.push(Arc::new(provider));
    }

    if let Some(oidc) = &config.oidc {
        tracing::info!(provider = %oidc.name(), "Discovering OIDC provider...");
        let provider = OidcProvider::discover(oidc, http_client.clone())
            .await
            .map_err(provider_error)?;
        providers.push(Arc::new(provider));
    }

    let mut registry = ProviderRegistry::new();
    registry.register(providers);
    check_providers(&registry, &config.default_provider)?;

    tracing::info!(providers = ?registry.names(), "Registered identity providers");

    let store = SessionStore::new(
        session_key(&config.session)?,
        CookieSettings::from_config(&config.session),
    );

    Ok(AppState::new(
        registry,
        store,
        Pages::new()?,
        config.default_provider.clone(),
    ))
}

fn check_providers(
    registry: &ProviderRegistry,
    default_provider: &str,
) -> std::result::Result<(), StartupError> {
    if registry.is_empty() {
        return Err(StartupError::Configuration {
            details: "no identity provider is configured".to_string(),
        });
    }

    if !registry.contains(default_provider) {
        return Err(StartupError::Configuration {
            details: format!(
                "default provider '{default_provider}' is not configured (available: {})",
                registry.names().join(", ")
            ),
        });
    }

    Ok(())
}

/// Derives the cookie key from configuration.
///
/// Without a configured secret a random key is generated, which invalidates
/// all sessions on restart; production refuses to start that way.
fn session_key(config: &SessionConfig) -> std::result::Result<Key, StartupError> {
    match &config.secret_key {
        Some(secret) => Key::try_from(secret.as_bytes()).map_err(|e| {
            StartupError::Configuration {
                details: format!("SESSION__SECRET_KEY is unusable: {e}"),
            }
        }),
        None if config.production => Err(StartupError::Configuration {
            details: "SESSION__SECRET_KEY is required in production".to_string(),
        }),
        None => {
            tracing::warn!(
                "No SESSION__SECRET_KEY configured; generated a random key, sessions will not survive a restart"
            );
            Ok(Key::generate())
        }
    }
}

/// Interval between revocation-list prunes.
///
/// # Errors
///
/// Returns `StartupError::Configuration` if the interval is zero.
pub fn revocation_cleanup_interval(
    config: &SessionConfig,
) -> std::result::Result<Duration, StartupError> {
    match config.revocation_cleanup_interval_seconds {
        0 => Err(StartupError::Configuration {
            details: "SESSION__REVOCATION_CLEANUP_INTERVAL_SECONDS must be positive".to_string(),
        }),
        seconds => Ok(Duration::from_secs(seconds)),
    }
}

fn provider_error(e: Report<keygate_identity::ProviderError>) -> StartupError {
    StartupError::Provider {
        details: e.to_string(),
    }
}
