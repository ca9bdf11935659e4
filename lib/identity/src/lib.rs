//! Identity, session and provider types for the keygate login gateway.
//!
//! This crate provides:
//! - The normalized `Identity` produced by a provider login
//! - The `Session` value carried between requests, with a typed identity accessor
//! - The `ProviderClient` capability and the `ProviderRegistry` that resolves
//!   provider names to clients
//! - Provider registration settings and error types
//!
//! It knows nothing about HTTP. The server crate decides how sessions are
//! encoded into cookies and how errors become responses.
//!
//! # Example
//!
//! ```
//! use keygate_identity::{Identity, Session};
//! use chrono::Duration;
//!
//! let identity = Identity::new(
//!     "github".to_string(),
//!     "12345".to_string(),
//!     "gho_access_token".to_string(),
//! )
//! .with_email(Some("a@example.com".to_string()));
//!
//! let mut session = Session::new(Duration::days(30));
//! assert!(session.is_anonymous());
//!
//! session.set_identity(&identity).expect("identity serializes");
//! assert_eq!(session.identity().expect("present").user_id, "12345");
//!
//! session.clear();
//! assert!(session.identity().is_err());
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod provider;
pub mod registry;
pub mod session;

// Re-export main types at crate root
pub use config::{OAuthProviderConfig, OidcProviderConfig};
pub use error::{IdentityLookupError, ProviderError, RegistryError, Result, SessionError};
pub use identity::Identity;
pub use provider::{AuthRedirect, CallbackParams, PendingAuth, ProviderClient};
pub use registry::ProviderRegistry;
pub use session::{Session, SessionId, USER_KEY};
