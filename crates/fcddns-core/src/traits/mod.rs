//! Core traits for fcddns
//!
//! - [`DnsProvider`]: Read zones/records and mutate A records at a DNS provider

pub mod dns_provider;

pub use dns_provider::{DnsProvider, DnsProviderFactory, ManagedRecord, RecordSpec, Zone};
