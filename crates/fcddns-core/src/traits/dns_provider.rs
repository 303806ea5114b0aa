// # DNS Provider Trait
//
// Defines the interface the reconciliation core needs from a DNS provider.
//
// ## Implementations
//
// - Cloudflare: `fcddns-provider-cloudflare` crate
// - In-memory: `fcddns_core::provider::MemoryDnsProvider`
//
// ## Usage
//
// ```rust,ignore
// use fcddns_core::DnsProvider;
//
// async fn show(provider: &dyn DnsProvider) -> fcddns_core::Result<()> {
//     for zone in provider.list_zones("example.com").await? {
//         let records = provider.list_a_records(&zone.id, "home.example.com").await?;
//         println!("{}: {} record(s)", zone.name, records.len());
//     }
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A provider zone (administrative unit for a domain)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider-internal zone identifier
    pub id: String,
    /// Domain name of the zone
    pub name: String,
}

impl Zone {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// An A record as observed at the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedRecord {
    /// Provider record identifier
    pub id: String,
    /// Fully qualified record name
    pub name: String,
    /// IPv4 address the record points at
    pub content: String,
    /// Time-to-live (1 = provider automatic)
    pub ttl: u32,
    /// Whether the provider proxies traffic for this record
    pub proxied: bool,
    /// Free-text comment; carries the slot marker for records we own
    pub comment: Option<String>,
}

/// Desired A record contents for a create or update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSpec {
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
    pub comment: String,
}

/// Trait for DNS provider implementations
///
/// # Trust Level: Untrusted
///
/// Providers only translate these calls into API requests. They:
/// - hold no state between requests (no caching of zones or records)
/// - never retry; a failed call is returned as an error
/// - never decide whether a mutation is needed (owned by the reconciler)
///
/// Results from the provider are not trusted either: zone lookups are
/// re-filtered for exact names and records are re-filtered for the exact FQDN
/// by the core.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List zones matching `name`. Providers may match loosely.
    async fn list_zones(&self, name: &str) -> Result<Vec<Zone>, crate::Error>;

    /// List A records in `zone_id` named `fqdn`
    async fn list_a_records(
        &self,
        zone_id: &str,
        fqdn: &str,
    ) -> Result<Vec<ManagedRecord>, crate::Error>;

    /// Create an A record
    async fn create_a_record(
        &self,
        zone_id: &str,
        record: &RecordSpec,
    ) -> Result<ManagedRecord, crate::Error>;

    /// Overwrite an existing A record
    async fn update_a_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &RecordSpec,
    ) -> Result<ManagedRecord, crate::Error>;

    /// Delete an A record
    async fn delete_a_record(&self, zone_id: &str, record_id: &str) -> Result<(), crate::Error>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
