//! Authentication extractors for Axum.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use keygate_identity::{Identity, IdentityLookupError};
use std::convert::Infallible;
use std::fmt;

use super::{AppState, SessionStore};

/// Extractor for requiring an authenticated user.
///
/// If the user is not authenticated, they are redirected to the default
/// provider's login.
pub struct RequireIdentity(pub Identity);

impl FromRequestParts<AppState> for RequireIdentity {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_headers(&parts.headers, state.store.key().clone());

        require_identity(&state.store, &jar)
            .await
            .map(RequireIdentity)
            .map_err(|Unauthenticated| AuthRejection::NotAuthenticated {
                login_path: state.login_path(),
            })
    }
}

/// Extractor for optionally getting the authenticated user.
///
/// Returns None if the user is not authenticated.
pub struct OptionalIdentity(pub Option<Identity>);

impl FromRequestParts<AppState> for OptionalIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_headers(&parts.headers, state.store.key().clone());
        Ok(OptionalIdentity(require_identity(&state.store, &jar).await.ok()))
    }
}

/// Reads the authenticated identity from the request's session.
///
/// # Errors
///
/// Returns `Unauthenticated` if the session is anonymous or its identity
/// cannot be decoded.
pub async fn require_identity(
    store: &SessionStore,
    jar: &PrivateCookieJar,
) -> Result<Identity, Unauthenticated> {
    let session = store.load(jar).await;

    match session.identity() {
        Ok(identity) => Ok(identity),
        Err(IdentityLookupError::Absent) => Err(Unauthenticated),
        Err(IdentityLookupError::Invalid { reason }) => {
            tracing::warn!(
                session_id = %session.id(),
                reason = %reason,
                "Session identity is malformed; treating as unauthenticated"
            );
            Err(Unauthenticated)
        }
    }
}

/// The request carries no usable identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unauthenticated;

impl fmt::Display for Unauthenticated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not authenticated")
    }
}

impl std::error::Error for Unauthenticated {}

/// Rejection type for authentication extractors.
#[derive(Debug)]
pub enum AuthRejection {
    NotAuthenticated { login_path: String },
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated { login_path } => {
                Redirect::temporary(&login_path).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{cookie_header, cookie_request, test_identity, test_state};
    use keygate_identity::{Session, USER_KEY};

    fn saved_cookie(state: &AppState, session: &Session) -> String {
        let jar = state
            .store
            .save(PrivateCookieJar::new(state.store.key().clone()), session)
            .expect("save");
        cookie_header(jar)
    }

    #[tokio::test]
    async fn anonymous_request_is_unauthenticated() {
        let state = test_state();
        let jar = cookie_request(&state, "");

        assert_eq!(
            require_identity(&state.store, &jar).await,
            Err(Unauthenticated)
        );
    }

    #[tokio::test]
    async fn stored_identity_is_returned() {
        let state = test_state();
        let mut session = Session::new(state.store.settings().max_age());
        session.set_identity(&test_identity()).expect("set identity");
        let jar = cookie_request(&state, &saved_cookie(&state, &session));

        assert_eq!(
            require_identity(&state.store, &jar).await,
            Ok(test_identity())
        );
    }

    #[tokio::test]
    async fn malformed_identity_is_unauthenticated() {
        let state = test_state();
        let mut session = Session::new(state.store.settings().max_age());
        session
            .insert(USER_KEY, &serde_json::json!({ "unexpected": true }))
            .expect("insert");
        let jar = cookie_request(&state, &saved_cookie(&state, &session));

        assert_eq!(
            require_identity(&state.store, &jar).await,
            Err(Unauthenticated)
        );
    }

    #[test]
    fn rejection_redirects_to_login() {
        let response = AuthRejection::NotAuthenticated {
            login_path: "/auth/github".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), axum::http::StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(axum::http::header::LOCATION),
            Some(&axum::http::HeaderValue::from_static("/auth/github"))
        );
    }
}
