//! Error types for the identity crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ProviderError`: failures talking to an identity provider
//! - `RegistryError`: provider lookups against the registry
//! - `SessionError`: session serialization and cookie limits
//! - `IdentityLookupError`: reading the typed identity out of a session

use rootcause::Report;
use std::fmt;

/// A Result type alias using rootcause's Report for error handling.
///
/// Each layer adds its own context as errors propagate.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

/// Errors from a provider exchange.
///
/// None of the variants carry secrets; `reason` strings are safe to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Provider configuration is invalid (bad URLs, missing credentials).
    Configuration { provider: String, reason: String },
    /// Provider metadata discovery failed.
    Discovery { provider: String, reason: String },
    /// The provider redirected back with an error (e.g. the user denied consent).
    Denied { provider: String, reason: String },
    /// No pending authorization was found for the callback.
    MissingAuthState { provider: String },
    /// The callback `state` does not match the pending authorization.
    StateMismatch { provider: String },
    /// The callback carried no authorization code.
    MissingCode { provider: String },
    /// The code-for-token exchange failed.
    TokenExchange { provider: String, reason: String },
    /// The returned token failed validation.
    TokenValidation { provider: String, reason: String },
    /// Fetching the user profile failed.
    Profile { provider: String, reason: String },
}

impl ProviderError {
    /// Returns the name of the provider the error originated from.
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            Self::Configuration { provider, .. }
            | Self::Discovery { provider, .. }
            | Self::Denied { provider, .. }
            | Self::MissingAuthState { provider }
            | Self::StateMismatch { provider }
            | Self::MissingCode { provider }
            | Self::TokenExchange { provider, .. }
            | Self::TokenValidation { provider, .. }
            | Self::Profile { provider, .. } => provider,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { provider, reason } => {
                write!(f, "provider '{provider}' is misconfigured: {reason}")
            }
            Self::Discovery { provider, reason } => {
                write!(f, "provider '{provider}' discovery failed: {reason}")
            }
            Self::Denied { provider, reason } => {
                write!(f, "provider '{provider}' denied authorization: {reason}")
            }
            Self::MissingAuthState { provider } => {
                write!(f, "no pending authorization for provider '{provider}'")
            }
            Self::StateMismatch { provider } => {
                write!(f, "state mismatch in '{provider}' callback")
            }
            Self::MissingCode { provider } => {
                write!(f, "'{provider}' callback is missing the authorization code")
            }
            Self::TokenExchange { provider, reason } => {
                write!(f, "provider '{provider}' token exchange failed: {reason}")
            }
            Self::TokenValidation { provider, reason } => {
                write!(f, "provider '{provider}' token validation failed: {reason}")
            }
            Self::Profile { provider, reason } => {
                write!(f, "provider '{provider}' profile fetch failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// Errors from provider registry lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No provider is registered under the requested name.
    NotConfigured { provider: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured { provider } => {
                write!(f, "provider '{provider}' is not configured")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Errors from writing a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A session value could not be serialized.
    Serialization { details: String },
    /// The encoded session does not fit in a cookie.
    TooLarge { size: usize, limit: usize },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialization { details } => {
                write!(f, "failed to serialize session: {details}")
            }
            Self::TooLarge { size, limit } => {
                write!(f, "session cookie is {size} bytes, limit is {limit}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Why a session did not yield an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityLookupError {
    /// The session holds no identity; the visitor is anonymous.
    Absent,
    /// A value is stored under the identity key but does not decode.
    Invalid { reason: String },
}

impl fmt::Display for IdentityLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "session holds no identity"),
            Self::Invalid { reason } => write!(f, "session identity is invalid: {reason}"),
        }
    }
}

impl std::error::Error for IdentityLookupError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_names_provider() {
        let err = ProviderError::Denied {
            provider: "github".to_string(),
            reason: "access_denied".to_string(),
        };
        assert_eq!(err.provider(), "github");
        assert!(err.to_string().contains("github"));
        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn state_mismatch_display() {
        let err = ProviderError::StateMismatch {
            provider: "keycloak".to_string(),
        };
        assert!(err.to_string().contains("state mismatch"));
        assert!(err.to_string().contains("keycloak"));
    }

    #[test]
    fn registry_error_display() {
        let err = RegistryError::NotConfigured {
            provider: "gitlab".to_string(),
        };
        assert!(err.to_string().contains("gitlab"));
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn session_too_large_display() {
        let err = SessionError::TooLarge {
            size: 5000,
            limit: 4096,
        };
        assert!(err.to_string().contains("5000"));
        assert!(err.to_string().contains("4096"));
    }

    #[test]
    fn provider_error_converts_into_report() {
        let result: Result<(), ProviderError> = Err(ProviderError::MissingCode {
            provider: "github".to_string(),
        }
        .into());
        let report = result.expect_err("should be an error");
        assert!(report.to_string().contains("authorization code"));
    }
}
