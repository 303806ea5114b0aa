// # Aliyun DNS Provider
//
// Implements `fcddns_core::DnsProvider` against the Alidns RPC API
// (version 2015-01-09), signed with ACS3-HMAC-SHA256.
//
// Alidns keeps the slot marker in a record's `Remark`, which the record
// create and update actions do not accept. A create or update is therefore
// the record call followed by `UpdateDomainRecordRemark`. If the remark call
// fails after a create, the new record is deleted again so that no unmarked
// record is left behind to block the hostname.
//
// Like every provider, this one never retries and never caches.
//
// ## Security Requirements
//
// - The access key secret NEVER appears in logs or Debug output
// - Provider construction fails if either half of the key pair is empty
//
// ## API Reference
//
// - Zone lookup: `DescribeDomains` (`KeyWord`, `SearchMode=EXACT`)
// - Record lookup: `DescribeSubDomainRecords` (`SubDomain`, `Type=A`)
// - Create: `AddDomainRecord`, then `UpdateDomainRecordRemark`
// - Update: `UpdateDomainRecord`, then `UpdateDomainRecordRemark`
// - Delete: `DeleteDomainRecord`

mod sign;
mod types;

use async_trait::async_trait;
use fcddns_core::config::ProviderConfig;
use fcddns_core::traits::{DnsProvider, DnsProviderFactory, ManagedRecord, RecordSpec, Zone};
use fcddns_core::{Error, Result};
use serde::de::DeserializeOwned;
use sign::{API_VERSION, AccessKey, EMPTY_BODY_SHA256, canonical_query};
use std::time::Duration;
use types::{
    AddDomainRecordResponse, ApiError, DescribeDomainsResponse, DescribeSubDomainRecordsResponse,
    RecordResult,
};

/// Default Alidns endpoint
pub const ALIYUN_ENDPOINT: &str = "https://alidns.cn-hangzhou.aliyuncs.com";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Smallest TTL Alidns accepts on the free edition
pub const MIN_TTL: u32 = 600;

/// Page size for record lookups
const RECORD_PAGE_SIZE: &str = "500";

const PROVIDER: &str = "aliyun";

/// Environment variable selecting dry-run mode (`dry-run`)
pub const MODE_ENV: &str = "FCDDNS_MODE";

/// Aliyun DNS provider
///
/// Zones are identified by their domain name, which is what every Alidns
/// record action takes.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider performs the describe calls and
/// logs every mutating action instead of sending it.
pub struct AliyunProvider {
    key: AccessKey,

    /// Endpoint URL without trailing slash
    endpoint: String,

    /// `host[:port]` of the endpoint, part of the signature
    host: String,

    client: reqwest::Client,

    dry_run: bool,
}

impl std::fmt::Debug for AliyunProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliyunProvider")
            .field("key", &self.key)
            .field("endpoint", &self.endpoint)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl AliyunProvider {
    /// Create a new Aliyun provider
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either half of the key pair is empty
    /// or the HTTP client cannot be built.
    pub fn new(
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let access_key_id = access_key_id.into();
        let access_key_secret = access_key_secret.into();
        if access_key_id.is_empty() || access_key_secret.is_empty() {
            return Err(Error::config("Aliyun access key ID and secret cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Self {
            key: AccessKey::new(access_key_id, access_key_secret),
            endpoint: String::new(),
            host: String::new(),
            client,
            dry_run,
        }
        .with_endpoint(ALIYUN_ENDPOINT)
    }

    /// Point the provider at a different endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let url = reqwest::Url::parse(&endpoint)
            .map_err(|e| Error::config(format!("Invalid Aliyun endpoint {endpoint}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::config(format!("Aliyun endpoint has no host: {endpoint}")))?;

        self.host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        self.endpoint = endpoint;
        Ok(self)
    }

    /// Whether mutations are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Send one signed action and decode its response
    async fn call<T: DeserializeOwned>(&self, action: &str, params: &[(&str, &str)]) -> Result<T> {
        let query = canonical_query(params);
        let date = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = uuid::Uuid::new_v4().to_string();
        let authorization = self.key.authorization(&self.host, action, &query, &date, &nonce)?;

        let url = if query.is_empty() {
            format!("{}/", self.endpoint)
        } else {
            format!("{}/?{}", self.endpoint, query)
        };

        let response = self
            .client
            .post(&url)
            .header("x-acs-action", action)
            .header("x-acs-version", API_VERSION)
            .header("x-acs-date", &date)
            .header("x-acs-signature-nonce", &nonce)
            .header("x-acs-content-sha256", EMPTY_BODY_SHA256)
            .header("authorization", authorization)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("{action}: HTTP request failed: {e}")))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("{action}: failed to read body: {e}")))?;

        let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            Error::provider(
                PROVIDER,
                format!("{action}: HTTP {status}, unparseable response: {e}"),
            )
        })?;

        if let Ok(api_error) = serde_json::from_value::<ApiError>(value.clone()) {
            return Err(map_error(status, &api_error, action));
        }
        if status >= 400 {
            return Err(Error::provider(PROVIDER, format!("{action}: HTTP {status} - {text}")));
        }

        serde_json::from_value(value).map_err(|e| {
            Error::provider(PROVIDER, format!("{action}: failed to parse response: {e}"))
        })
    }

    async fn set_remark(&self, record_id: &str, remark: &str) -> Result<()> {
        self.call::<serde_json::Value>(
            "UpdateDomainRecordRemark",
            &[("RecordId", record_id), ("Remark", remark)],
        )
        .await?;
        Ok(())
    }

    fn log_dry_run(&self, action: &str, params: &[(&str, &str)]) {
        tracing::info!(
            "[DRY-RUN] Would call {} on {} with {}",
            action,
            self.endpoint,
            canonical_query(params)
        );
    }
}

/// Map an Alidns error body onto a core error
fn map_error(status: u16, error: &ApiError, action: &str) -> Error {
    let code = error.code.as_str();
    let detail = format!("{action}: [{code}] {}", error.message);

    if code.starts_with("InvalidAccessKeyId")
        || code.starts_with("SignatureDoesNotMatch")
        || code.starts_with("IncompleteSignature")
        || code.starts_with("InvalidSecurityToken")
        || code.starts_with("Forbidden")
    {
        return Error::auth(detail);
    }
    if code.starts_with("Throttling") || status == 429 {
        return Error::rate_limited(detail);
    }
    if status >= 500 {
        return Error::provider(PROVIDER, format!("{detail} (transient, HTTP {status})"));
    }
    Error::provider(PROVIDER, detail)
}

/// Host label of `fqdn` relative to `zone` (`@` for the apex)
fn relative_name(fqdn: &str, zone: &str) -> String {
    if fqdn.eq_ignore_ascii_case(zone) {
        return "@".to_string();
    }
    fqdn.strip_suffix(zone)
        .and_then(|rest| rest.strip_suffix('.'))
        .unwrap_or(fqdn)
        .to_string()
}

fn managed(record_id: String, spec: &RecordSpec, ttl: u32) -> ManagedRecord {
    ManagedRecord {
        id: record_id,
        name: spec.name.clone(),
        content: spec.content.clone(),
        ttl,
        proxied: false,
        comment: Some(spec.comment.clone()),
    }
}

impl From<RecordResult> for ManagedRecord {
    fn from(record: RecordResult) -> Self {
        let name = if record.rr == "@" {
            record.domain_name.clone()
        } else {
            format!("{}.{}", record.rr, record.domain_name)
        };

        ManagedRecord {
            id: record.record_id,
            name,
            content: record.value,
            ttl: record.ttl,
            proxied: false,
            comment: record.remark.filter(|r| !r.is_empty()),
        }
    }
}

#[async_trait]
impl DnsProvider for AliyunProvider {
    async fn list_zones(&self, name: &str) -> Result<Vec<Zone>> {
        tracing::debug!("Looking up Aliyun domains for: {}", name);

        let response: DescribeDomainsResponse = self
            .call(
                "DescribeDomains",
                &[("KeyWord", name), ("SearchMode", "EXACT"), ("PageSize", "100")],
            )
            .await?;

        Ok(response
            .domains
            .domain
            .into_iter()
            .map(|d| Zone::new(d.domain_name.clone(), d.domain_name))
            .collect())
    }

    async fn list_a_records(&self, zone_id: &str, fqdn: &str) -> Result<Vec<ManagedRecord>> {
        tracing::debug!("Listing A records for {} in {}", fqdn, zone_id);

        let response: DescribeSubDomainRecordsResponse = self
            .call(
                "DescribeSubDomainRecords",
                &[
                    ("DomainName", zone_id),
                    ("SubDomain", fqdn),
                    ("Type", "A"),
                    ("PageSize", RECORD_PAGE_SIZE),
                ],
            )
            .await?;

        Ok(response
            .domain_records
            .record
            .into_iter()
            .filter(|r| r.record_type == "A")
            .map(ManagedRecord::from)
            .collect())
    }

    async fn create_a_record(&self, zone_id: &str, record: &RecordSpec) -> Result<ManagedRecord> {
        let rr = relative_name(&record.name, zone_id);
        let ttl = record.ttl.max(MIN_TTL).to_string();
        let params = [
            ("DomainName", zone_id),
            ("RR", rr.as_str()),
            ("Type", "A"),
            ("Value", record.content.as_str()),
            ("TTL", ttl.as_str()),
        ];

        if self.dry_run {
            self.log_dry_run("AddDomainRecord", &params);
            return Ok(managed("dry-run".to_string(), record, record.ttl.max(MIN_TTL)));
        }

        tracing::info!("Creating A record {} -> {}", record.name, record.content);
        let created: AddDomainRecordResponse = self.call("AddDomainRecord", &params).await?;

        if let Err(e) = self.set_remark(&created.record_id, &record.comment).await {
            tracing::warn!(
                "Marking new record {} failed, removing it again: {}",
                created.record_id,
                e
            );
            if let Err(cleanup) = self.delete_a_record(zone_id, &created.record_id).await {
                tracing::error!(
                    "Unmarked record {} for {} could not be removed: {}",
                    created.record_id,
                    record.name,
                    cleanup
                );
            }
            return Err(e);
        }

        Ok(managed(created.record_id, record, record.ttl.max(MIN_TTL)))
    }

    async fn update_a_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &RecordSpec,
    ) -> Result<ManagedRecord> {
        let rr = relative_name(&record.name, zone_id);
        let ttl = record.ttl.max(MIN_TTL).to_string();
        let params = [
            ("RecordId", record_id),
            ("RR", rr.as_str()),
            ("Type", "A"),
            ("Value", record.content.as_str()),
            ("TTL", ttl.as_str()),
        ];

        if self.dry_run {
            self.log_dry_run("UpdateDomainRecord", &params);
            return Ok(managed(record_id.to_string(), record, record.ttl.max(MIN_TTL)));
        }

        tracing::info!("Updating A record {} -> {}", record.name, record.content);
        self.call::<serde_json::Value>("UpdateDomainRecord", &params).await?;
        self.set_remark(record_id, &record.comment).await?;

        Ok(managed(record_id.to_string(), record, record.ttl.max(MIN_TTL)))
    }

    async fn delete_a_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let params = [("RecordId", record_id)];

        if self.dry_run {
            self.log_dry_run("DeleteDomainRecord", &params);
            return Ok(());
        }

        tracing::info!("Deleting A record {} in {}", record_id, zone_id);
        self.call::<serde_json::Value>("DeleteDomainRecord", &params).await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating Aliyun providers
pub struct AliyunFactory;

impl DnsProviderFactory for AliyunFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Aliyun {
                access_key_id,
                access_key_secret,
                endpoint,
            } => {
                let dry_run = std::env::var(MODE_ENV)
                    .unwrap_or_default()
                    .eq_ignore_ascii_case("dry-run");

                if dry_run {
                    tracing::warn!(
                        "Aliyun provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                let mut provider =
                    AliyunProvider::new(access_key_id.clone(), access_key_secret.clone(), dry_run)?;
                if let Some(endpoint) = endpoint {
                    provider = provider.with_endpoint(endpoint.clone())?;
                }
                Ok(Box::new(provider))
            }
            _ => Err(Error::config("Invalid config for Aliyun provider")),
        }
    }
}

/// Register the Aliyun provider with a registry
///
/// # Example
///
/// ```rust
/// use fcddns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::with_builtin();
/// fcddns_provider_aliyun::register(&registry);
/// assert!(registry.has_provider("aliyun"));
/// ```
pub fn register(registry: &fcddns_core::ProviderRegistry) {
    registry.register_provider(PROVIDER, Box::new(AliyunFactory));
}
