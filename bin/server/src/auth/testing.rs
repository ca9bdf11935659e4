//! Fixtures shared by the server's tests.

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::IntoResponse;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::Key;
use keygate_identity::{
    AuthRedirect, Identity, PendingAuth, ProviderClient, ProviderError, ProviderRegistry, Result,
};
use std::sync::Arc;

use super::{AppState, CookieSettings, SessionStore};
use crate::config::SessionConfig;
use crate::pages::Pages;

/// CSRF state the fake provider always issues.
pub const FAKE_STATE: &str = "csrf-1";

/// Code the fake provider accepts.
pub const GOOD_CODE: &str = "good";

/// Code for which the fake provider returns an identity too large for a cookie.
pub const HUGE_CODE: &str = "huge";

/// Provider double that never leaves the process.
pub struct FakeProvider {
    name: &'static str,
    broken: bool,
}

impl FakeProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            broken: false,
        }
    }

    /// A provider whose redirect construction and sign-out always fail.
    pub fn broken(name: &'static str) -> Self {
        Self { name, broken: true }
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn begin_redirect(&self) -> Result<AuthRedirect, ProviderError> {
        if self.broken {
            return Err(ProviderError::Configuration {
                provider: self.name.to_string(),
                reason: "redirect unavailable".to_string(),
            }
            .into());
        }

        Ok(AuthRedirect {
            url: format!("https://{}.test/authorize?state={FAKE_STATE}", self.name),
            pending: PendingAuth {
                provider: self.name.to_string(),
                csrf_state: FAKE_STATE.to_string(),
                pkce_verifier: "verifier-1".to_string(),
                nonce: None,
            },
        })
    }

    async fn complete_exchange(
        &self,
        _pending: &PendingAuth,
        code: &str,
    ) -> Result<Identity, ProviderError> {
        match code {
            GOOD_CODE => Ok(test_identity()),
            HUGE_CODE => Ok(test_identity().with_description(Some("x".repeat(8192)))),
            _ => Err(ProviderError::TokenExchange {
                provider: self.name.to_string(),
                reason: "bad_verification_code".to_string(),
            }
            .into()),
        }
    }

    async fn sign_out(&self, _identity: Option<&Identity>) -> Result<(), ProviderError> {
        if self.broken {
            return Err(ProviderError::Profile {
                provider: self.name.to_string(),
                reason: "end-session endpoint unreachable".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// The identity the fake provider logs in.
pub fn test_identity() -> Identity {
    Identity::new(
        "github".to_string(),
        "12345".to_string(),
        "gho_fake".to_string(),
    )
    .with_email(Some("a@example.com".to_string()))
    .with_nick_name(Some("octocat".to_string()))
}

/// State with a fake `github` provider and a broken `flaky` provider.
pub fn test_state() -> AppState {
    let mut registry = ProviderRegistry::new();
    registry.register([
        Arc::new(FakeProvider::new("github")) as Arc<dyn ProviderClient>,
        Arc::new(FakeProvider::broken("flaky")) as Arc<dyn ProviderClient>,
    ]);

    let store = SessionStore::new(
        Key::generate(),
        CookieSettings::from_config(&SessionConfig::default()),
    );

    AppState::new(
        registry,
        store,
        Pages::new().expect("templates"),
        "github".to_string(),
    )
}

/// A cookie jar as decoded from a request carrying `cookie_header`.
pub fn cookie_request(state: &AppState, cookie_header: &str) -> PrivateCookieJar {
    let mut headers = HeaderMap::new();
    if !cookie_header.is_empty() {
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(cookie_header).expect("valid header"),
        );
    }
    PrivateCookieJar::from_headers(&headers, state.store.key().clone())
}

/// The `Cookie` header a browser would send after receiving `jar`'s cookies.
pub fn cookie_header(jar: PrivateCookieJar) -> String {
    let response = (jar, ()).into_response();
    set_cookie_pairs(response.headers()).join("; ")
}

/// `name=value` pairs of the non-removal `Set-Cookie` headers.
pub fn set_cookie_pairs(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter(|pair| !pair.ends_with('='))
        .map(str::to_string)
        .collect()
}
