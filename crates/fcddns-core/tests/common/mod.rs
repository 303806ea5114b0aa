//! Test doubles and common utilities for reconciliation contract tests
//!
//! The provider double wraps the in-memory provider and counts every call,
//! so tests can assert exactly which provider operations a request issued.

#![allow(dead_code)]

use fcddns_core::error::{Error, Result};
use fcddns_core::traits::{DnsProvider, ManagedRecord, RecordSpec, Zone};
use fcddns_core::{
    Credential, CredentialSigner, DdnsRequest, DuplicateSlotPolicy, ExpiryPolicy, FcddnsConfig,
    MemoryDnsProvider, ProviderConfig, ProviderRoutes, RequestHandler,
};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const SECRET: &str = "contract_test_secret";
pub const ZONE_ID: &str = "zone-1";
pub const DOMAIN: &str = "example.com";
pub const FQDN: &str = "test.example.com";

/// A provider that records every call and can be told to fail mutations
#[derive(Clone, Default)]
pub struct CountingProvider {
    pub inner: MemoryDnsProvider,
    list_zones_calls: Arc<AtomicUsize>,
    list_records_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
    fail_mutations: Arc<AtomicBool>,
    fail_lookups: Arc<AtomicBool>,
}

impl CountingProvider {
    /// A provider holding the `example.com` zone
    pub async fn with_zone() -> Self {
        let provider = Self::default();
        provider.inner.add_zone(Zone::new(ZONE_ID, DOMAIN)).await;
        provider
    }

    pub async fn seed(
        &self,
        id: &str,
        content: &str,
        ttl: u32,
        proxied: bool,
        comment: Option<&str>,
    ) {
        self.inner
            .insert_record(
                ZONE_ID,
                ManagedRecord {
                    id: id.to_string(),
                    name: FQDN.to_string(),
                    content: content.to_string(),
                    ttl,
                    proxied,
                    comment: comment.map(str::to_string),
                },
            )
            .await;
    }

    pub async fn records(&self) -> Vec<ManagedRecord> {
        self.inner.records(ZONE_ID).await
    }

    pub async fn record(&self, id: &str) -> Option<ManagedRecord> {
        self.records().await.into_iter().find(|r| r.id == id)
    }

    pub fn fail_mutations(&self) {
        self.fail_mutations.store(true, Ordering::SeqCst);
    }

    pub fn restore_mutations(&self) {
        self.fail_mutations.store(false, Ordering::SeqCst);
    }

    pub fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }

    pub fn list_zones_calls(&self) -> usize {
        self.list_zones_calls.load(Ordering::SeqCst)
    }

    pub fn list_records_calls(&self) -> usize {
        self.list_records_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Total create/update/delete calls
    pub fn mutation_calls(&self) -> usize {
        self.create_calls() + self.update_calls() + self.delete_calls()
    }

    fn check_mutation(&self) -> Result<()> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Error::provider("counting", "mutation unavailable"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DnsProvider for CountingProvider {
    async fn list_zones(&self, name: &str) -> Result<Vec<Zone>> {
        self.list_zones_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(Error::rate_limited("too many requests"));
        }
        self.inner.list_zones(name).await
    }

    async fn list_a_records(&self, zone_id: &str, fqdn: &str) -> Result<Vec<ManagedRecord>> {
        self.list_records_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_a_records(zone_id, fqdn).await
    }

    async fn create_a_record(&self, zone_id: &str, record: &RecordSpec) -> Result<ManagedRecord> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_mutation()?;
        self.inner.create_a_record(zone_id, record).await
    }

    async fn update_a_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &RecordSpec,
    ) -> Result<ManagedRecord> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_mutation()?;
        self.inner.update_a_record(zone_id, record_id, record).await
    }

    async fn delete_a_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_mutation()?;
        self.inner.delete_a_record(zone_id, record_id).await
    }

    fn provider_name(&self) -> &'static str {
        "counting"
    }
}

/// Handler with default policies routing every domain to `provider`
pub fn handler(provider: &CountingProvider) -> RequestHandler {
    handler_with(provider, ExpiryPolicy::Never, DuplicateSlotPolicy::FirstMatch)
}

pub fn handler_with(
    provider: &CountingProvider,
    expiry: ExpiryPolicy,
    duplicates: DuplicateSlotPolicy,
) -> RequestHandler {
    let mut config = FcddnsConfig::new(SECRET, ProviderConfig::Memory);
    config.credential.expiry = expiry;
    config.reconcile.duplicate_slot_policy = duplicates;

    RequestHandler::from_config(&config, ProviderRoutes::single(Arc::new(provider.clone())))
        .expect("valid test config")
}

/// Token for `test.example.com` in `slot`
pub fn token(slot: u32) -> String {
    sign(Credential::new("test", DOMAIN).with_slot(slot))
}

pub fn sign(credential: Credential) -> String {
    CredentialSigner::new(SECRET.as_bytes())
        .sign(&credential, None)
        .expect("signing succeeds")
}

/// Request for `/ddns/v1/{token}[/{ip}]` from `peer`
pub fn request(token: &str, ip: Option<&str>, peer: Option<IpAddr>) -> DdnsRequest {
    let path = match ip {
        Some(ip) => format!("/ddns/v1/{token}/{ip}"),
        None => format!("/ddns/v1/{token}"),
    };
    DdnsRequest::new(path, peer)
}

pub fn peer() -> Option<IpAddr> {
    Some(IpAddr::from([198, 51, 100, 20]))
}
