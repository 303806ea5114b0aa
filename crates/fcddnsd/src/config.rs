//! Daemon configuration from `FCDDNS_*` environment variables

use anyhow::{Context, Result};
use axum::http::HeaderName;
use fcddns_core::config::{ANY_DOMAIN, ProviderBinding};
use fcddns_core::{DuplicateSlotPolicy, ExpiryPolicy, FcddnsConfig, ProviderConfig};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Application configuration
pub struct Config {
    pub jwt_secret: String,
    pub provider_type: String,
    pub cloudflare_api_token: Option<String>,
    pub cloudflare_api_base: Option<String>,
    pub aliyun_access_key_id: Option<String>,
    pub aliyun_access_key_secret: Option<String>,
    pub aliyun_endpoint: Option<String>,
    /// Domains served by Aliyun next to a different primary provider
    pub aliyun_domains: Vec<String>,
    pub domains: Vec<String>,
    pub bind_addr: String,
    pub client_ip_header: Option<String>,
    pub request_timeout_secs: u64,
    pub credential_expiry: String,
    pub duplicate_slot_policy: String,
    pub log_level: String,
}

// Secrets stay out of logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"<REDACTED>")
            .field("provider_type", &self.provider_type)
            .field(
                "cloudflare_api_token",
                &self.cloudflare_api_token.as_ref().map(|_| "<REDACTED>"),
            )
            .field("cloudflare_api_base", &self.cloudflare_api_base)
            .field("aliyun_access_key_id", &self.aliyun_access_key_id)
            .field(
                "aliyun_access_key_secret",
                &self.aliyun_access_key_secret.as_ref().map(|_| "<REDACTED>"),
            )
            .field("aliyun_endpoint", &self.aliyun_endpoint)
            .field("aliyun_domains", &self.aliyun_domains)
            .field("domains", &self.domains)
            .field("bind_addr", &self.bind_addr)
            .field("client_ip_header", &self.client_ip_header)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("credential_expiry", &self.credential_expiry)
            .field("duplicate_slot_policy", &self.duplicate_slot_policy)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, treating empty values as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let request_timeout_secs = match var("FCDDNS_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("FCDDNS_REQUEST_TIMEOUT_SECS is not a number: {raw}"))?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            jwt_secret: var("FCDDNS_JWT_SECRET").context(
                "FCDDNS_JWT_SECRET is required. Set it via: export FCDDNS_JWT_SECRET=your_secret",
            )?,
            provider_type: var("FCDDNS_PROVIDER_TYPE")
                .unwrap_or_else(|| "cloudflare".to_string())
                .to_lowercase(),
            cloudflare_api_token: var("FCDDNS_CLOUDFLARE_API_TOKEN"),
            cloudflare_api_base: var("FCDDNS_CLOUDFLARE_API_BASE"),
            aliyun_access_key_id: var("FCDDNS_ALIYUN_ACCESS_KEY_ID"),
            aliyun_access_key_secret: var("FCDDNS_ALIYUN_ACCESS_KEY_SECRET"),
            aliyun_endpoint: var("FCDDNS_ALIYUN_ENDPOINT"),
            aliyun_domains: var("FCDDNS_ALIYUN_DOMAINS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            domains: split_list(&var("FCDDNS_DOMAINS").unwrap_or_else(|| ANY_DOMAIN.to_string())),
            bind_addr: var("FCDDNS_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            client_ip_header: var("FCDDNS_CLIENT_IP_HEADER").map(|h| h.trim().to_lowercase()),
            request_timeout_secs,
            credential_expiry: var("FCDDNS_CREDENTIAL_EXPIRY")
                .unwrap_or_else(|| "never".to_string()),
            duplicate_slot_policy: var("FCDDNS_DUPLICATE_SLOT_POLICY")
                .unwrap_or_else(|| "first-match".to_string()),
            log_level: var("FCDDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.len() < 16 {
            anyhow::bail!(
                "FCDDNS_JWT_SECRET appears too short ({} chars). Use at least 16 characters.",
                self.jwt_secret.len()
            );
        }

        match self.provider_type.as_str() {
            "cloudflare" => {
                let token = self.cloudflare_api_token.as_deref().unwrap_or_default();
                if token.is_empty() {
                    anyhow::bail!(
                        "FCDDNS_CLOUDFLARE_API_TOKEN is required when FCDDNS_PROVIDER_TYPE=cloudflare"
                    );
                }

                let token_lower = token.to_lowercase();
                if token_lower.contains("your_token")
                    || token_lower.contains("replace_me")
                    || token_lower == "token"
                {
                    anyhow::bail!(
                        "FCDDNS_CLOUDFLARE_API_TOKEN appears to be a placeholder. \
                        Use an actual API token from Cloudflare."
                    );
                }

                if let Some(base) = &self.cloudflare_api_base
                    && !base.starts_with("https://")
                    && !base.starts_with("http://")
                {
                    anyhow::bail!(
                        "FCDDNS_CLOUDFLARE_API_BASE must be an HTTP(S) URL. Got: {}",
                        base
                    );
                }
            }
            "aliyun" => {
                if !self.aliyun_domains.is_empty() {
                    anyhow::bail!(
                        "FCDDNS_ALIYUN_DOMAINS is only for Aliyun next to another provider. \
                        With FCDDNS_PROVIDER_TYPE=aliyun, list the domains in FCDDNS_DOMAINS."
                    );
                }
            }
            "memory" => {}
            other => anyhow::bail!(
                "FCDDNS_PROVIDER_TYPE '{}' is not supported. \
                Supported providers: cloudflare, aliyun, memory",
                other
            ),
        }

        if self.provider_type == "aliyun" || !self.aliyun_domains.is_empty() {
            self.validate_aliyun()?;
        }

        if self.domains.is_empty() {
            anyhow::bail!("FCDDNS_DOMAINS must contain at least one domain (or '*')");
        }
        for domain in &self.domains {
            if domain != ANY_DOMAIN {
                validate_domain_name(domain)?;
            }
        }
        for domain in &self.aliyun_domains {
            validate_domain_name(domain)?;
        }

        self.bind_addr()?;
        self.client_ip_header()?;

        if !(1..=300).contains(&self.request_timeout_secs) {
            anyhow::bail!(
                "FCDDNS_REQUEST_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.request_timeout_secs
            );
        }

        self.credential_expiry.parse::<ExpiryPolicy>()?;
        self.duplicate_slot_policy.parse::<DuplicateSlotPolicy>()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "FCDDNS_LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn validate_aliyun(&self) -> Result<()> {
        let id = self.aliyun_access_key_id.as_deref().unwrap_or_default();
        let secret = self.aliyun_access_key_secret.as_deref().unwrap_or_default();
        if id.is_empty() || secret.is_empty() {
            anyhow::bail!(
                "FCDDNS_ALIYUN_ACCESS_KEY_ID and FCDDNS_ALIYUN_ACCESS_KEY_SECRET are required \
                when Aliyun serves any domain"
            );
        }

        if let Some(endpoint) = &self.aliyun_endpoint
            && !endpoint.starts_with("https://")
            && !endpoint.starts_with("http://")
        {
            anyhow::bail!("FCDDNS_ALIYUN_ENDPOINT must be an HTTP(S) URL. Got: {}", endpoint);
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind_addr.parse().with_context(|| {
            format!("FCDDNS_BIND_ADDR is not a socket address: {}", self.bind_addr)
        })
    }

    pub fn client_ip_header(&self) -> Result<Option<HeaderName>> {
        self.client_ip_header
            .as_deref()
            .map(|name| {
                HeaderName::try_from(name).with_context(|| {
                    format!("FCDDNS_CLIENT_IP_HEADER is not a header name: {name}")
                })
            })
            .transpose()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Core configuration for the handler and provider routes
    pub fn fcddns_config(&self) -> Result<FcddnsConfig> {
        let provider = match self.provider_type.as_str() {
            "cloudflare" => ProviderConfig::Cloudflare {
                api_token: self.cloudflare_api_token.clone().unwrap_or_default(),
                api_base: self.cloudflare_api_base.clone(),
            },
            "aliyun" => self.aliyun_provider(),
            _ => ProviderConfig::Memory,
        };

        let mut config = FcddnsConfig::new(self.jwt_secret.clone(), provider);
        config.domains = self.domains.clone();
        if !self.aliyun_domains.is_empty() {
            config.extra_providers.push(ProviderBinding {
                provider: self.aliyun_provider(),
                domains: self.aliyun_domains.clone(),
            });
        }
        config.credential.expiry = self.credential_expiry.parse()?;
        config.reconcile.duplicate_slot_policy = self.duplicate_slot_policy.parse()?;
        config.validate()?;
        Ok(config)
    }

    fn aliyun_provider(&self) -> ProviderConfig {
        ProviderConfig::Aliyun {
            access_key_id: self.aliyun_access_key_id.clone().unwrap_or_default(),
            access_key_secret: self.aliyun_access_key_secret.clone().unwrap_or_default(),
            endpoint: self.aliyun_endpoint.clone(),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Basic RFC 1035 domain name checks
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}
