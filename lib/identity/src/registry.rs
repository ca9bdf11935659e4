//! Directory of configured identity providers.
//!
//! The registry is filled once during startup and then shared read-only
//! (typically behind an `Arc`), so request handlers never need to lock it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::provider::ProviderClient;

/// Provider clients keyed by their declared name.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs providers under their own names.
    ///
    /// A provider whose name is already registered replaces the earlier one.
    /// That only happens with duplicated configuration, so it is logged.
    pub fn register<I>(&mut self, providers: I)
    where
        I: IntoIterator<Item = Arc<dyn ProviderClient>>,
    {
        for provider in providers {
            let name = provider.name().to_string();
            if self.providers.insert(name.clone(), provider).is_some() {
                tracing::warn!(provider = %name, "provider registered twice, keeping the last one");
            } else {
                tracing::debug!(provider = %name, "registered identity provider");
            }
        }
    }

    /// Looks up a provider by name.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotConfigured` if no such provider exists.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ProviderClient>, RegistryError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotConfigured {
                provider: name.to_string(),
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Returns the registered provider names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, Result};
    use crate::identity::Identity;
    use crate::provider::{AuthRedirect, PendingAuth};
    use async_trait::async_trait;

    struct StubProvider {
        name: &'static str,
        url: &'static str,
    }

    #[async_trait]
    impl ProviderClient for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn begin_redirect(&self) -> Result<AuthRedirect, ProviderError> {
            Ok(AuthRedirect {
                url: self.url.to_string(),
                pending: PendingAuth {
                    provider: self.name.to_string(),
                    csrf_state: "state".to_string(),
                    pkce_verifier: "verifier".to_string(),
                    nonce: None,
                },
            })
        }

        async fn complete_exchange(
            &self,
            _pending: &PendingAuth,
            _code: &str,
        ) -> Result<Identity, ProviderError> {
            Ok(Identity::new(
                self.name.to_string(),
                "1".to_string(),
                "token".to_string(),
            ))
        }
    }

    fn stub(name: &'static str, url: &'static str) -> Arc<dyn ProviderClient> {
        Arc::new(StubProvider { name, url })
    }

    #[test]
    fn resolves_registered_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register([stub("github", "https://github.example/a")]);

        let provider = registry.resolve("github").expect("registered");
        assert_eq!(provider.name(), "github");
        assert!(registry.contains("github"));
    }

    #[test]
    fn unknown_provider_is_not_configured() {
        let registry = ProviderRegistry::new();

        assert_eq!(
            registry.resolve("gitlab").err(),
            Some(RegistryError::NotConfigured {
                provider: "gitlab".to_string()
            })
        );
    }

    #[tokio::test]
    async fn reregistration_keeps_last_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register([
            stub("github", "https://first.example"),
            stub("github", "https://second.example"),
        ]);

        assert_eq!(registry.len(), 1);
        let redirect = registry
            .resolve("github")
            .expect("registered")
            .begin_redirect()
            .await
            .expect("redirect");
        assert_eq!(redirect.url, "https://second.example");
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = ProviderRegistry::new();
        registry.register([stub("keycloak", "k"), stub("github", "g")]);

        assert_eq!(registry.names(), vec!["github", "keycloak"]);
        assert!(!registry.is_empty());
    }
}
