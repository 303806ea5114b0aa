//! Zone lookup
//!
//! Provider zone searches may be fuzzy or prefix based, so only a zone whose
//! name is exactly the requested domain is accepted.

use crate::error::{Error, Result};
use crate::traits::{DnsProvider, Zone};
use tracing::debug;

/// Resolves a domain to the provider's zone
pub struct ZoneLocator<'a> {
    provider: &'a dyn DnsProvider,
}

impl<'a> ZoneLocator<'a> {
    pub fn new(provider: &'a dyn DnsProvider) -> Self {
        Self { provider }
    }

    /// Find the zone named exactly `domain`
    pub async fn locate(&self, domain: &str) -> Result<Zone> {
        let zones = self.provider.list_zones(domain).await?;
        debug!(
            "{} returned {} zone(s) for {}",
            self.provider.provider_name(),
            zones.len(),
            domain
        );

        zones
            .into_iter()
            .find(|zone| zone.name == domain)
            .ok_or_else(|| Error::ZoneNotFound(domain.to_string()))
    }
}
