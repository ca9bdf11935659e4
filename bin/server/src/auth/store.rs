//! Cookie-backed session store.
//!
//! Sessions live entirely in an encrypted, authenticated cookie
//! (`PrivateCookieJar`, AES-256-GCM). The server keeps no session table; it
//! only remembers the IDs of sessions that were explicitly signed out, until
//! those sessions would have expired anyway.
//!
//! Operational consequences:
//! - Rotating the secret key invalidates every outstanding session.
//! - Restarting the process forgets sign-outs, so a cookie captured before
//!   logout validates again until its own expiry.
//! - Two tabs writing the session at once race; the last save wins.
//! - The revocation list grows by one entry per sign-out and an entry is only
//!   pruned once its session reaches the 30-day maximum age, so its size is
//!   bounded by the number of sign-outs in the last 30 days.

use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use keygate_identity::{PendingAuth, Session, SessionError, SessionId};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::config::SessionConfig;

/// Largest cookie (name plus encoded value) browsers are required to accept.
pub const BROWSER_COOKIE_LIMIT: usize = 4096;

/// Cookie holding the pending authorization between redirect and callback.
pub const AUTH_STATE_COOKIE: &str = "keygate_auth_state";

/// Lifetime of every session, counted from login.
pub const SESSION_MAX_AGE_DAYS: i64 = 30;

/// Lifetime of the pending authorization cookie.
const AUTH_STATE_MINUTES: i64 = 10;

/// Bytes AES-GCM adds to a cookie value: 12-byte nonce plus 16-byte tag.
const ENCRYPTION_OVERHEAD: usize = 12 + 16;

/// Cookie attributes shared by every session cookie.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    name: String,
    max_age: Duration,
    secure: bool,
    same_site: SameSite,
}

impl CookieSettings {
    /// Derives cookie attributes from session configuration.
    ///
    /// `Secure` and `SameSite` both follow the production flag, because
    /// browsers drop `SameSite=None` cookies that are not also `Secure`.
    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        let same_site = if config.production {
            SameSite::None
        } else {
            SameSite::Lax
        };

        Self {
            name: config.cookie_name.clone(),
            max_age: Duration::days(SESSION_MAX_AGE_DAYS),
            secure: config.production,
            same_site,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    #[must_use]
    pub fn same_site(&self) -> SameSite {
        self.same_site
    }
}

/// Translates between cookies and [`Session`] values.
pub struct SessionStore {
    key: Key,
    settings: CookieSettings,
    /// Signed-out session IDs and the time their session would have expired.
    revoked: RwLock<HashMap<SessionId, DateTime<Utc>>>,
}

impl SessionStore {
    /// Creates a store encrypting cookies with `key`.
    #[must_use]
    pub fn new(key: Key, settings: CookieSettings) -> Self {
        Self {
            key,
            settings,
            revoked: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cookie encryption key.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    #[must_use]
    pub fn settings(&self) -> &CookieSettings {
        &self.settings
    }

    /// Returns the request's session, or a fresh anonymous one.
    ///
    /// Missing, tampered, undecodable, expired and signed-out cookies are all
    /// treated as "no session".
    pub async fn load(&self, jar: &PrivateCookieJar) -> Session {
        let Some(cookie) = jar.get(&self.settings.name) else {
            return self.fresh();
        };

        let session: Session = match serde_json::from_str(cookie.value()) {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!(error = %e, "Discarding undecodable session cookie");
                return self.fresh();
            }
        };

        if session.is_expired() {
            tracing::debug!(session_id = %session.id(), "Discarding expired session");
            return self.fresh();
        }

        if self.is_revoked(session.id()).await {
            tracing::debug!(session_id = %session.id(), "Discarding signed-out session");
            return self.fresh();
        }

        session
    }

    /// Encrypts `session` into the session cookie.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Serialization` if the session cannot be encoded
    /// and `SessionError::TooLarge` if the cookie would exceed
    /// [`BROWSER_COOKIE_LIMIT`].
    pub fn save(
        &self,
        jar: PrivateCookieJar,
        session: &Session,
    ) -> Result<PrivateCookieJar, SessionError> {
        let payload = serde_json::to_string(session).map_err(|e| SessionError::Serialization {
            details: e.to_string(),
        })?;

        let size = self.settings.name.len() + 1 + encrypted_len(payload.len());
        if size > BROWSER_COOKIE_LIMIT {
            return Err(SessionError::TooLarge {
                size,
                limit: BROWSER_COOKIE_LIMIT,
            });
        }

        let cookie = Cookie::build((self.settings.name.clone(), payload))
            .path("/")
            .http_only(true)
            .secure(self.settings.secure)
            .same_site(self.settings.same_site)
            .max_age(to_cookie_duration(self.settings.max_age));

        Ok(jar.add(cookie))
    }

    /// Signs the session out.
    ///
    /// Empties `session`, records its ID as revoked and removes the cookie, so
    /// the next [`load`](Self::load) is anonymous even if the client replays
    /// the old cookie. Clearing an anonymous session only removes the cookie.
    pub async fn clear(&self, jar: PrivateCookieJar, session: &mut Session) -> PrivateCookieJar {
        if !session.is_empty() {
            self.revoked
                .write()
                .await
                .insert(session.id().clone(), session.expires_at());
            tracing::debug!(session_id = %session.id(), "Revoked session");
        }
        session.clear();

        jar.remove(Cookie::build((self.settings.name.clone(), "")).path("/"))
    }

    /// Returns true if the session ID was signed out.
    pub async fn is_revoked(&self, id: &SessionId) -> bool {
        self.revoked.read().await.contains_key(id)
    }

    /// Forgets revocations whose sessions have expired on their own.
    ///
    /// Returns the number of entries removed.
    pub async fn prune_revocations(&self) -> usize {
        let now = Utc::now();
        let mut revoked = self.revoked.write().await;
        let before = revoked.len();
        revoked.retain(|_, expires_at| *expires_at > now);
        before - revoked.len()
    }

    /// Stores a pending authorization until the provider redirects back.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Serialization` if the state cannot be encoded.
    pub fn stash_pending(
        &self,
        jar: PrivateCookieJar,
        pending: &PendingAuth,
    ) -> Result<PrivateCookieJar, SessionError> {
        let payload = serde_json::to_string(pending).map_err(|e| SessionError::Serialization {
            details: e.to_string(),
        })?;

        // Lax so the cookie survives the top-level redirect back from the provider.
        let cookie = Cookie::build((AUTH_STATE_COOKIE, payload))
            .path("/")
            .http_only(true)
            .secure(self.settings.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::minutes(AUTH_STATE_MINUTES));

        Ok(jar.add(cookie))
    }

    /// Reads the pending authorization, if a valid one is present.
    #[must_use]
    pub fn pending(&self, jar: &PrivateCookieJar) -> Option<PendingAuth> {
        let cookie = jar.get(AUTH_STATE_COOKIE)?;
        serde_json::from_str(cookie.value())
            .inspect_err(|e| tracing::debug!(error = %e, "Discarding undecodable auth state"))
            .ok()
    }

    /// Removes the pending authorization cookie.
    #[must_use]
    pub fn discard_pending(&self, jar: PrivateCookieJar) -> PrivateCookieJar {
        jar.remove(Cookie::build((AUTH_STATE_COOKIE, "")).path("/"))
    }

    fn fresh(&self) -> Session {
        Session::new(self.settings.max_age)
    }
}

/// Length of the base64 cookie value produced by encrypting `plaintext_len` bytes.
fn encrypted_len(plaintext_len: usize) -> usize {
    (plaintext_len + ENCRYPTION_OVERHEAD).div_ceil(3) * 4
}

fn to_cookie_duration(duration: Duration) -> time::Duration {
    time::Duration::seconds(duration.num_seconds())
}
