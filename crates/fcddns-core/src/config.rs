//! Configuration types for fcddns
//!
//! This module defines all configuration structures used by the core.

use serde::{Deserialize, Serialize};

/// Domain entry that routes every domain to the configured provider
pub const ANY_DOMAIN: &str = "*";

/// Main fcddns configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct FcddnsConfig {
    /// Shared secret credentials are signed with
    pub jwt_secret: String,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Domains served by the provider (`*` for any)
    #[serde(default = "default_domains")]
    pub domains: Vec<String>,

    /// Further providers, each serving its own domains
    #[serde(default)]
    pub extra_providers: Vec<ProviderBinding>,

    /// Credential validation settings
    #[serde(default)]
    pub credential: CredentialConfig,

    /// Reconciliation settings
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl std::fmt::Debug for FcddnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FcddnsConfig")
            .field("jwt_secret", &"<REDACTED>")
            .field("provider", &self.provider)
            .field("domains", &self.domains)
            .field("extra_providers", &self.extra_providers)
            .field("credential", &self.credential)
            .field("reconcile", &self.reconcile)
            .finish()
    }
}

impl FcddnsConfig {
    /// Create a configuration with defaults for everything but the secret
    pub fn new(jwt_secret: impl Into<String>, provider: ProviderConfig) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            provider,
            domains: default_domains(),
            extra_providers: Vec::new(),
            credential: CredentialConfig::default(),
            reconcile: ReconcileConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.jwt_secret.is_empty() {
            return Err(crate::Error::config("JWT secret cannot be empty"));
        }

        let mut seen = std::collections::HashSet::new();
        for binding in self.bindings() {
            if binding.domains.is_empty() {
                return Err(crate::Error::config(format!(
                    "No domains configured for provider '{}'",
                    binding.provider.type_name()
                )));
            }

            for domain in &binding.domains {
                let domain = domain.trim();
                if domain.is_empty() {
                    return Err(crate::Error::config(format!(
                        "Invalid domain entry: {domain:?}"
                    )));
                }
                if !seen.insert(domain.to_lowercase()) {
                    return Err(crate::Error::config(format!(
                        "Domain '{domain}' is routed to more than one provider"
                    )));
                }
            }

            binding.provider.validate()?;
        }

        Ok(())
    }

    /// The primary provider followed by every extra one
    pub fn bindings(&self) -> impl Iterator<Item = ProviderBinding> + '_ {
        std::iter::once(ProviderBinding {
            provider: self.provider.clone(),
            domains: self.domains.clone(),
        })
        .chain(self.extra_providers.iter().cloned())
    }
}

/// A provider together with the domains it serves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderBinding {
    pub provider: ProviderConfig,
    pub domains: Vec<String>,
}

fn default_domains() -> Vec<String> {
    vec![ANY_DOMAIN.to_string()]
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// API base URL override
        #[serde(default)]
        api_base: Option<String>,
    },

    /// Aliyun (Alibaba Cloud DNS) provider
    Aliyun {
        access_key_id: String,
        access_key_secret: String,
        /// API endpoint override
        #[serde(default)]
        endpoint: Option<String>,
    },

    /// In-memory provider (not persistent)
    Memory,

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

// Hand-written so API credentials never reach logs
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare { api_base, .. } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("api_base", api_base)
                .finish(),
            ProviderConfig::Aliyun {
                access_key_id,
                endpoint,
                ..
            } => f
                .debug_struct("Aliyun")
                .field("access_key_id", access_key_id)
                .field("access_key_secret", &"<REDACTED>")
                .field("endpoint", endpoint)
                .finish(),
            ProviderConfig::Memory => f.write_str("Memory"),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .finish_non_exhaustive(),
        }
    }
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_token, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Aliyun {
                access_key_id,
                access_key_secret,
                ..
            } => {
                if access_key_id.is_empty() || access_key_secret.is_empty() {
                    return Err(crate::Error::config(
                        "Aliyun access key ID and secret cannot be empty",
                    ));
                }
                Ok(())
            }
            ProviderConfig::Memory => Ok(()),
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Aliyun { .. } => "aliyun",
            ProviderConfig::Memory => "memory",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Credential validation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialConfig {
    #[serde(default)]
    pub expiry: ExpiryPolicy,
}

/// How the `exp` claim of a credential is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// Credentials never expire; revoke them by rotating the secret
    #[default]
    Never,
    /// `exp` is required and checked
    Enforce,
}

impl std::str::FromStr for ExpiryPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "never" => Ok(ExpiryPolicy::Never),
            "enforce" => Ok(ExpiryPolicy::Enforce),
            other => Err(crate::Error::config(format!(
                "Unknown credential expiry policy '{other}'. Valid: never, enforce"
            ))),
        }
    }
}

/// Reconciliation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub duplicate_slot_policy: DuplicateSlotPolicy,
}

/// What to do when several records carry the same slot marker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateSlotPolicy {
    /// The first listed record is authoritative; the rest are left alone
    #[default]
    FirstMatch,
    /// Refuse to mutate anything for the FQDN
    FailClosed,
}

impl std::str::FromStr for DuplicateSlotPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first-match" => Ok(DuplicateSlotPolicy::FirstMatch),
            "fail-closed" => Ok(DuplicateSlotPolicy::FailClosed),
            other => Err(crate::Error::config(format!(
                "Unknown duplicate slot policy '{other}'. Valid: first-match, fail-closed"
            ))),
        }
    }
}
