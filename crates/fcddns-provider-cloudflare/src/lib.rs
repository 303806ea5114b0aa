// # Cloudflare DNS Provider
//
// Implements `fcddns_core::DnsProvider` against the Cloudflare API v4.
//
// Every trait call is exactly one HTTP request. The provider:
//
// - never retries (a failed call is returned to the core, the client retries)
// - never caches zones or records between requests
// - never decides whether a mutation is needed (owned by the reconciler)
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Provider construction fails if the token is empty
//
// ## API Reference
//
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name.exact=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use fcddns_core::config::ProviderConfig;
use fcddns_core::traits::{DnsProvider, DnsProviderFactory, ManagedRecord, RecordSpec, Zone};
use fcddns_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "cloudflare";

/// Environment variable selecting dry-run mode (`dry-run`)
pub const MODE_ENV: &str = "FCDDNS_MODE";

/// Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ZoneResult {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DnsRecordResult {
    id: String,
    name: String,
    content: String,
    #[serde(default = "auto_ttl")]
    ttl: u32,
    #[serde(default)]
    proxied: bool,
    #[serde(default)]
    comment: Option<String>,
}

fn auto_ttl() -> u32 {
    1
}

impl From<DnsRecordResult> for ManagedRecord {
    fn from(record: DnsRecordResult) -> Self {
        ManagedRecord {
            id: record.id,
            name: record.name,
            content: record.content,
            ttl: record.ttl,
            proxied: record.proxied,
            comment: record.comment,
        }
    }
}

/// Body for record create and update calls
#[derive(Debug, Serialize)]
struct DnsRecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
    comment: &'a str,
}

impl<'a> From<&'a RecordSpec> for DnsRecordBody<'a> {
    fn from(spec: &'a RecordSpec) -> Self {
        DnsRecordBody {
            record_type: "A",
            name: &spec.name,
            content: &spec.content,
            ttl: spec.ttl,
            proxied: spec.proxied,
            comment: &spec.comment,
        }
    }
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record lookup)
/// - Log the intended POST/PUT/DELETE payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip mutations
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read and DNS:Edit permissions
    /// - `dry_run`: If true, perform GET requests but skip mutations
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the token is empty or the HTTP client
    /// cannot be built.
    pub fn new(api_token: impl Into<String>, dry_run: bool) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a new Cloudflare provider (production/live mode)
    pub fn new_live(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, false)
    }

    /// Create a new Cloudflare provider (dry-run mode)
    pub fn new_dry_run(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, true)
    }

    /// Point the provider at a different API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether mutations are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Send one request and unwrap the response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<Option<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| {
                Error::provider(PROVIDER, format!("{context}: HTTP request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(map_status(status.as_u16(), &error_text, context));
        }

        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            Error::provider(PROVIDER, format!("{context}: failed to parse response: {e}"))
        })?;

        if !envelope.success {
            return Err(Error::provider(
                PROVIDER,
                format!("{context}: {}", describe_errors(&envelope.errors)),
            ));
        }

        Ok(envelope.result)
    }

    fn log_dry_run(&self, method: &str, url: &str, payload: Option<&DnsRecordBody<'_>>) {
        match payload.and_then(|p| serde_json::to_string(p).ok()) {
            Some(body) => {
                tracing::info!("[DRY-RUN] Would send {} to {} with payload: {}", method, url, body)
            }
            None => tracing::info!("[DRY-RUN] Would send {} to {}", method, url),
        }
    }
}

/// Map a non-success HTTP status to a core error
fn map_status(status: u16, body: &str, context: &str) -> Error {
    match status {
        401 | 403 => Error::auth(format!(
            "{context}: invalid API token or insufficient permissions (status {status})"
        )),
        404 => Error::provider(PROVIDER, format!("{context}: resource not found (status 404)")),
        429 => Error::rate_limited(format!("{context}: rate limit exceeded (status 429)")),
        500..=599 => Error::provider(
            PROVIDER,
            format!("{context}: Cloudflare server error (transient): {status} - {body}"),
        ),
        _ => Error::provider(PROVIDER, format!("{context}: {status} - {body}")),
    }
}

fn describe_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "request was not successful".to_string();
    }
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list_zones(&self, name: &str) -> Result<Vec<Zone>> {
        tracing::debug!("Looking up zones for domain: {}", name);

        let request = self.client.get(self.url("/zones")).query(&[("name", name)]);
        let zones: Vec<ZoneResult> = self.send(request, "zone lookup").await?.unwrap_or_default();

        Ok(zones.into_iter().map(|z| Zone::new(z.id, z.name)).collect())
    }

    async fn list_a_records(&self, zone_id: &str, fqdn: &str) -> Result<Vec<ManagedRecord>> {
        tracing::debug!("Listing A records for {} in zone {}", fqdn, zone_id);

        let request = self
            .client
            .get(self.url(&format!("/zones/{zone_id}/dns_records")))
            .query(&[("type", "A"), ("name.exact", fqdn)]);
        let records: Vec<DnsRecordResult> =
            self.send(request, "record lookup").await?.unwrap_or_default();

        Ok(records.into_iter().map(ManagedRecord::from).collect())
    }

    async fn create_a_record(&self, zone_id: &str, record: &RecordSpec) -> Result<ManagedRecord> {
        let url = self.url(&format!("/zones/{zone_id}/dns_records"));
        let body = DnsRecordBody::from(record);

        if self.dry_run {
            self.log_dry_run("POST", &url, Some(&body));
            return Ok(dry_run_record("dry-run", record));
        }

        tracing::info!("Creating A record {} -> {}", record.name, record.content);
        let created: Option<DnsRecordResult> =
            self.send(self.client.post(&url).json(&body), "record create").await?;

        created
            .map(ManagedRecord::from)
            .ok_or_else(|| Error::provider(PROVIDER, "record create: response carried no result"))
    }

    async fn update_a_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &RecordSpec,
    ) -> Result<ManagedRecord> {
        let url = self.url(&format!("/zones/{zone_id}/dns_records/{record_id}"));
        let body = DnsRecordBody::from(record);

        if self.dry_run {
            self.log_dry_run("PUT", &url, Some(&body));
            return Ok(dry_run_record(record_id, record));
        }

        tracing::info!("Updating A record {} -> {}", record.name, record.content);
        let updated: Option<DnsRecordResult> =
            self.send(self.client.put(&url).json(&body), "record update").await?;

        updated
            .map(ManagedRecord::from)
            .ok_or_else(|| Error::provider(PROVIDER, "record update: response carried no result"))
    }

    async fn delete_a_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let url = self.url(&format!("/zones/{zone_id}/dns_records/{record_id}"));

        if self.dry_run {
            self.log_dry_run("DELETE", &url, None);
            return Ok(());
        }

        tracing::info!("Deleting A record {} in zone {}", record_id, zone_id);
        self.send::<serde_json::Value>(self.client.delete(&url), "record delete")
            .await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

fn dry_run_record(id: &str, spec: &RecordSpec) -> ManagedRecord {
    ManagedRecord {
        id: id.to_string(),
        name: spec.name.clone(),
        content: spec.content.clone(),
        ttl: spec.ttl,
        proxied: spec.proxied,
        comment: Some(spec.comment.clone()),
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare { api_token, api_base } => {
                let dry_run = std::env::var(MODE_ENV)
                    .unwrap_or_default()
                    .eq_ignore_ascii_case("dry-run");

                if dry_run {
                    tracing::warn!(
                        "Cloudflare provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                let mut provider = CloudflareProvider::new(api_token.clone(), dry_run)?;
                if let Some(base) = api_base {
                    provider = provider.with_api_base(base.clone());
                }
                Ok(Box::new(provider))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use fcddns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::with_builtin();
/// fcddns_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &fcddns_core::ProviderRegistry) {
    registry.register_provider(PROVIDER, Box::new(CloudflareFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_creation() {
        let config = ProviderConfig::Cloudflare {
            api_token: "test_token".to_string(),
            api_base: Some("http://127.0.0.1:9/".to_string()),
        };

        let provider = CloudflareFactory.create(&config).unwrap();
        assert_eq!(provider.provider_name(), "cloudflare");
    }

    #[test]
    fn test_factory_missing_token() {
        let config = ProviderConfig::Cloudflare {
            api_token: String::new(),
            api_base: None,
        };

        assert!(CloudflareFactory.create(&config).is_err());
    }

    #[test]
    fn test_factory_rejects_other_config() {
        assert!(CloudflareFactory.create(&ProviderConfig::Memory).is_err());
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = CloudflareProvider::new("", false).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_dry_run_mode() {
        let provider_dry = CloudflareProvider::new_dry_run("token").unwrap();
        let provider_live = CloudflareProvider::new_live("token").unwrap();

        assert!(provider_dry.is_dry_run());
        assert!(!provider_live.is_dry_run());
    }

    #[test]
    fn test_api_base_trailing_slash() {
        let provider = CloudflareProvider::new_live("token")
            .unwrap()
            .with_api_base("http://localhost:8080/client/v4/");
        assert_eq!(
            provider.url("/zones"),
            "http://localhost:8080/client/v4/zones"
        );
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let provider = CloudflareProvider::new_live("secret_token_12345").unwrap();

        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("CloudflareProvider"));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(map_status(401, "", "x"), Error::Authentication(_)));
        assert!(matches!(map_status(403, "", "x"), Error::Authentication(_)));
        assert!(matches!(map_status(429, "", "x"), Error::RateLimited(_)));
        assert!(matches!(map_status(502, "bad gateway", "x"), Error::Provider { .. }));
        assert!(matches!(map_status(404, "", "x"), Error::Provider { .. }));
        assert!(matches!(map_status(400, "", "x"), Error::Provider { .. }));

        for status in [401, 404, 429, 500] {
            assert_eq!(map_status(status, "", "x").status_code(), 500);
        }
    }

    #[test]
    fn test_record_envelope_parsing() {
        let json = r#"{
            "success": true,
            "errors": [],
            "messages": [],
            "result": [{
                "id": "372e67954025e0ba6aaa6d586b9e0b59",
                "type": "A",
                "name": "home.example.com",
                "content": "198.51.100.4",
                "proxied": true,
                "ttl": 3600,
                "comment": "[fcddns-slot:2]",
                "tags": []
            }, {
                "id": "abc",
                "type": "A",
                "name": "home.example.com",
                "content": "198.51.100.5",
                "comment": null
            }]
        }"#;

        let envelope: ApiResponse<Vec<DnsRecordResult>> = serde_json::from_str(json).unwrap();
        let records: Vec<ManagedRecord> = envelope
            .result
            .unwrap()
            .into_iter()
            .map(ManagedRecord::from)
            .collect();

        assert_eq!(records[0].ttl, 3600);
        assert!(records[0].proxied);
        assert_eq!(records[0].comment.as_deref(), Some("[fcddns-slot:2]"));
        assert_eq!(records[1].ttl, 1);
        assert!(!records[1].proxied);
        assert_eq!(records[1].comment, None);
    }

    #[test]
    fn test_error_envelope_description() {
        let json = r#"{
            "success": false,
            "errors": [{"code": 81057, "message": "Record already exists."}],
            "result": null
        }"#;

        let envelope: ApiResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
        assert!(!envelope.success);
        assert_eq!(describe_errors(&envelope.errors), "[81057] Record already exists.");
        assert_eq!(describe_errors(&[]), "request was not successful");
    }

    #[test]
    fn test_create_body_shape() {
        let spec = RecordSpec {
            name: "home.example.com".to_string(),
            content: "192.0.2.1".to_string(),
            ttl: 1,
            proxied: false,
            comment: "[fcddns-slot:0]".to_string(),
        };

        let body = serde_json::to_value(DnsRecordBody::from(&spec)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "type": "A",
                "name": "home.example.com",
                "content": "192.0.2.1",
                "ttl": 1,
                "proxied": false,
                "comment": "[fcddns-slot:0]"
            })
        );
    }

    #[test]
    fn test_register() {
        let registry = fcddns_core::ProviderRegistry::new();
        register(&registry);
        assert!(registry.has_provider("cloudflare"));
    }

    #[test]
    fn test_dry_run_delete_makes_no_request() {
        // Unroutable base: any real request would fail
        let provider = CloudflareProvider::new_dry_run("token")
            .unwrap()
            .with_api_base("http://127.0.0.1:9");

        tokio_test::block_on(async {
            provider.delete_a_record("zone", "rec").await.unwrap();
        });
    }
}
