//! Session state carried between requests.
//!
//! A [`Session`] is a small key/value map plus an opaque ID and its
//! issue/expiry timestamps. The whole value round-trips through the client,
//! so it has to stay serializable and small; persistence and integrity
//! protection belong to whichever store encodes it.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use ulid::Ulid;

use crate::error::{IdentityLookupError, SessionError};
use crate::identity::Identity;

/// Session key under which the authenticated [`Identity`] is stored.
pub const USER_KEY: &str = "user";

/// Unique identifier for a session.
///
/// Session IDs are opaque ULID strings generated when a session is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh random session ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Returns the session ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-carried session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    values: BTreeMap<String, Value>,
}

impl Session {
    /// Creates an empty (anonymous) session valid for `max_age`.
    #[must_use]
    pub fn new(max_age: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            issued_at: now,
            expires_at: now + max_age,
            values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if no identity is stored in the session.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        !self.values.contains_key(USER_KEY)
    }

    /// Returns true if the session holds no values at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Decodes the value stored under `key`.
    ///
    /// Returns `None` if the key is absent and `Some(Err(_))` if the stored
    /// value does not decode as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<Result<T, serde_json::Error>> {
        self.values
            .get(key)
            .map(|value| T::deserialize(value.clone()))
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Serialization` if `value` cannot be encoded.
    pub fn insert<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value).map_err(|e| SessionError::Serialization {
            details: e.to_string(),
        })?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Removes every value, leaving an anonymous session.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Reads the authenticated identity.
    ///
    /// # Errors
    ///
    /// Returns `IdentityLookupError::Absent` for anonymous sessions and
    /// `IdentityLookupError::Invalid` if the stored value is not an identity.
    pub fn identity(&self) -> Result<Identity, IdentityLookupError> {
        match self.get::<Identity>(USER_KEY) {
            None => Err(IdentityLookupError::Absent),
            Some(Ok(identity)) => Ok(identity),
            Some(Err(e)) => Err(IdentityLookupError::Invalid {
                reason: e.to_string(),
            }),
        }
    }

    /// Stores the authenticated identity.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Serialization` if the identity cannot be encoded.
    pub fn set_identity(&mut self, identity: &Identity) -> Result<(), SessionError> {
        self.insert(USER_KEY, identity)
    }

    /// Re-issues the session: new ID, issue time of now, expiry `max_age`
    /// from now. Values are kept.
    ///
    /// Called on login so an ID observed before authentication never names
    /// an authenticated session.
    pub fn reissue(&mut self, max_age: Duration) {
        let now = Utc::now();
        self.id = SessionId::generate();
        self.issued_at = now;
        self.expires_at = now + max_age;
    }
}
