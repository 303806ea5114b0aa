// # Memory DNS Provider
//
// In-memory implementation of DnsProvider.
//
// ## Purpose
//
// Holds zones and A records in process memory. Useful for tests, demos and
// local development (`FCDDNS_PROVIDER_TYPE=memory`).
//
// ## Behavior
//
// - Zone search is fuzzy (substring), like hosted provider search endpoints
// - Record listing matches the exact name
// - All state is lost on restart

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::traits::{DnsProvider, DnsProviderFactory, ManagedRecord, RecordSpec, Zone};

#[derive(Debug, Default)]
struct Inner {
    zones: Vec<Zone>,
    records: HashMap<String, Vec<ManagedRecord>>,
    next_id: u64,
}

/// In-memory DNS provider
///
/// Clones share the same state.
///
/// # Example
///
/// ```rust,no_run
/// use fcddns_core::provider::MemoryDnsProvider;
/// use fcddns_core::traits::{DnsProvider, Zone};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let provider = MemoryDnsProvider::new();
///     provider.add_zone(Zone::new("zone-1", "example.com")).await;
///
///     let zones = provider.list_zones("example.com").await?;
///     assert_eq!(zones.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDnsProvider {
    inner: Arc<RwLock<Inner>>,
    mutations: Arc<AtomicUsize>,
}

impl MemoryDnsProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone
    pub async fn add_zone(&self, zone: Zone) {
        let mut guard = self.inner.write().await;
        guard.records.entry(zone.id.clone()).or_default();
        guard.zones.push(zone);
    }

    /// Seed a record directly, bypassing the mutation counter
    pub async fn insert_record(&self, zone_id: &str, record: ManagedRecord) {
        let mut guard = self.inner.write().await;
        guard
            .records
            .entry(zone_id.to_string())
            .or_default()
            .push(record);
    }

    /// All records of a zone, in insertion order
    pub async fn records(&self, zone_id: &str) -> Vec<ManagedRecord> {
        let guard = self.inner.read().await;
        guard.records.get(zone_id).cloned().unwrap_or_default()
    }

    /// Number of create/update/delete calls served
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DnsProvider for MemoryDnsProvider {
    async fn list_zones(&self, name: &str) -> Result<Vec<Zone>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .zones
            .iter()
            .filter(|zone| zone.name.contains(name))
            .cloned()
            .collect())
    }

    async fn list_a_records(&self, zone_id: &str, fqdn: &str) -> Result<Vec<ManagedRecord>, Error> {
        let guard = self.inner.read().await;
        let records = guard
            .records
            .get(zone_id)
            .ok_or_else(|| Error::provider("memory", format!("unknown zone {zone_id}")))?;

        Ok(records.iter().filter(|r| r.name == fqdn).cloned().collect())
    }

    async fn create_a_record(
        &self,
        zone_id: &str,
        record: &RecordSpec,
    ) -> Result<ManagedRecord, Error> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.inner.write().await;

        guard.next_id += 1;
        let created = ManagedRecord {
            id: format!("rec-{}", guard.next_id),
            name: record.name.clone(),
            content: record.content.clone(),
            ttl: record.ttl,
            proxied: record.proxied,
            comment: Some(record.comment.clone()),
        };

        guard
            .records
            .get_mut(zone_id)
            .ok_or_else(|| Error::provider("memory", format!("unknown zone {zone_id}")))?
            .push(created.clone());

        Ok(created)
    }

    async fn update_a_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &RecordSpec,
    ) -> Result<ManagedRecord, Error> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.inner.write().await;

        let existing = guard
            .records
            .get_mut(zone_id)
            .and_then(|records| records.iter_mut().find(|r| r.id == record_id))
            .ok_or_else(|| {
                Error::provider("memory", format!("record {record_id} does not exist"))
            })?;

        existing.name = record.name.clone();
        existing.content = record.content.clone();
        existing.ttl = record.ttl;
        existing.proxied = record.proxied;
        existing.comment = Some(record.comment.clone());

        Ok(existing.clone())
    }

    async fn delete_a_record(&self, zone_id: &str, record_id: &str) -> Result<(), Error> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.inner.write().await;

        let records = guard
            .records
            .get_mut(zone_id)
            .ok_or_else(|| Error::provider("memory", format!("unknown zone {zone_id}")))?;
        let before = records.len();
        records.retain(|r| r.id != record_id);

        if records.len() == before {
            return Err(Error::provider("memory", format!("record {record_id} does not exist")));
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for creating memory providers
pub struct MemoryDnsProviderFactory;

impl DnsProviderFactory for MemoryDnsProviderFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>, Error> {
        match config {
            ProviderConfig::Memory => Ok(Box::new(MemoryDnsProvider::new())),
            _ => Err(Error::config("Invalid config for memory provider")),
        }
    }
}
