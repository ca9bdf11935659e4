//! Authentication module for the keygate server.
//!
//! This module provides:
//! - Login with external identity providers (GitHub OAuth2, generic OIDC)
//! - An encrypted-cookie session store
//! - The login/callback/logout flow controller
//! - Extractors that gate pages on an authenticated identity
//!
//! # Flow
//!
//! Each request performs exactly one transition:
//! - `GET /auth/{provider}`: anonymous visitor is redirected to the provider,
//!   with the pending authorization kept in a short-lived cookie
//! - `GET /auth/{provider}/callback`: the code is exchanged for an identity,
//!   which is stored in the session before the visitor is sent to `/profile`
//! - `GET /logout/{provider}`: the session is revoked and the cookie removed
//!
//! Nothing here keeps per-visitor state in memory apart from the list of
//! signed-out session IDs, so requests from different visitors never contend.

pub mod github;
pub mod middleware;
pub mod oidc;
pub mod routes;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use keygate_identity::ProviderRegistry;
use std::sync::Arc;

use crate::pages::Pages;

pub use github::GithubProvider;
pub use middleware::{OptionalIdentity, RequireIdentity, require_identity};
pub use oidc::OidcProvider;
pub use routes::{begin_auth, callback, sign_out};
pub use store::{CookieSettings, SessionStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configured identity providers.
    pub registry: Arc<ProviderRegistry>,
    /// Session cookie store.
    pub store: Arc<SessionStore>,
    /// Page templates.
    pub pages: Arc<Pages>,
    /// Provider unauthenticated visitors are sent to.
    pub default_provider: Arc<str>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        registry: ProviderRegistry,
        store: SessionStore,
        pages: Pages,
        default_provider: String,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            store: Arc::new(store),
            pages: Arc::new(pages),
            default_provider: default_provider.into(),
        }
    }

    /// Path that starts a login with the default provider.
    #[must_use]
    pub fn login_path(&self) -> String {
        format!("/auth/{}", self.default_provider)
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.store.key().clone()
    }
}
