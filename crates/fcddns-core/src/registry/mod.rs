//! Provider registry and domain routing
//!
//! [`ProviderRegistry`] maps provider type names to factories, so providers
//! are instantiated from configuration without hard-coded if-else chains.
//! [`ProviderRoutes`] maps each managed domain to the provider that serves it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fcddns_core::{FcddnsConfig, ProviderRegistry, ProviderRoutes};
//!
//! let registry = ProviderRegistry::with_builtin();
//! fcddns_provider_cloudflare::register(&registry);
//!
//! let routes = ProviderRoutes::from_config(&registry, &config)?;
//! let provider = routes.provider_for("example.com");
//! ```

use crate::config::{ANY_DOMAIN, FcddnsConfig, ProviderConfig};
use crate::error::{Error, Result};
use crate::provider::MemoryDnsProviderFactory;
use crate::traits::{DnsProvider, DnsProviderFactory};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Provider registry for plugin-based DNS provider creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the providers built into the core
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register_provider("memory", Box::new(MemoryDnsProviderFactory));
        registry
    }

    /// Register a DNS provider factory under a type name
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        providers.insert(name.into(), factory);
    }

    /// Create a DNS provider from configuration
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let provider_type = config.type_name();
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);

        let factory = providers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.keys().cloned().collect()
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(name)
    }
}

/// Domain → provider routing table
///
/// A domain without its own entry falls back to the `*` entry, if any.
#[derive(Clone, Default)]
pub struct ProviderRoutes {
    routes: HashMap<String, Arc<dyn DnsProvider>>,
}

impl std::fmt::Debug for ProviderRoutes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.routes.iter().map(|(d, p)| (d, p.provider_name())))
            .finish()
    }
}

impl ProviderRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route every domain to `provider`
    pub fn single(provider: Arc<dyn DnsProvider>) -> Self {
        Self::new().with_route(ANY_DOMAIN, provider)
    }

    /// Instantiate every configured provider and route its domains to it
    pub fn from_config(registry: &ProviderRegistry, config: &FcddnsConfig) -> Result<Self> {
        let mut routes = Self::new();

        for binding in config.bindings() {
            let provider: Arc<dyn DnsProvider> =
                Arc::from(registry.create_provider(&binding.provider)?);
            for domain in &binding.domains {
                routes = routes.with_route(domain.trim(), Arc::clone(&provider));
            }
        }

        Ok(routes)
    }

    pub fn with_route(mut self, domain: impl Into<String>, provider: Arc<dyn DnsProvider>) -> Self {
        self.routes.insert(domain.into(), provider);
        self
    }

    /// The provider serving `domain`
    pub fn provider_for(&self, domain: &str) -> Option<Arc<dyn DnsProvider>> {
        self.routes
            .get(domain)
            .or_else(|| self.routes.get(ANY_DOMAIN))
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
