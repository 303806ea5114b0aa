// # Cloudflare Provider Real Environment Validation Tool
//
// Runs one reconciliation against the real Cloudflare API through the same
// request handler the daemon uses.
//
// ## Usage
//
// ```bash
// # Dry-run mode (default - safe): reads zones and records, logs mutations
// CLOUDFLARE_API_TOKEN=your_token \
// FCDDNS_DOMAIN=example.com \
// FCDDNS_HOST=ddns-test \
// FCDDNS_TEST_IP=192.0.2.1 \
// cargo run -p fcddns-demos --bin cloudflare_validation
//
// # Live mode (makes actual changes!)
// FCDDNS_MODE=live ... cargo run -p fcddns-demos --bin cloudflare_validation
// ```
//
// ## Environment Variables
//
// Required:
// - `CLOUDFLARE_API_TOKEN`: Cloudflare API token
// - `FCDDNS_DOMAIN`: Zone domain (e.g. "example.com")
// - `FCDDNS_HOST`: Host label (e.g. "ddns-test")
// - `FCDDNS_TEST_IP`: IPv4 address to set (0.0.0.0 deletes the slot)
//
// Optional:
// - `FCDDNS_SLOT`: Slot index (default: 0)
// - `FCDDNS_MODE`: "dry-run" or "live" (default: dry-run)

use fcddns_core::{
    Credential, CredentialSigner, DdnsRequest, FcddnsConfig, ProviderConfig, ProviderRoutes,
    RequestHandler,
};
use fcddns_provider_cloudflare::CloudflareProvider;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;

const VALIDATION_SECRET: &str = "cloudflare-validation-secret";

fn required(name: &str) -> Result<String, String> {
    env::var(name).map_err(|_| format!("{name} environment variable is required"))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    match run().await {
        Ok(status) if status < 400 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<u16, String> {
    tracing::info!("=== Cloudflare Provider Real Environment Validation ===");

    let api_token = required("CLOUDFLARE_API_TOKEN")?;
    let domain = required("FCDDNS_DOMAIN")?;
    let host = required("FCDDNS_HOST")?;
    let test_ip = required("FCDDNS_TEST_IP")?;
    let slot: u32 = env::var("FCDDNS_SLOT")
        .unwrap_or_else(|_| "0".to_string())
        .parse()
        .map_err(|e| format!("FCDDNS_SLOT must be a non-negative integer: {e}"))?;

    let mode = env::var("FCDDNS_MODE").unwrap_or_else(|_| "dry-run".to_string());
    let dry_run = mode != "live";
    if dry_run {
        tracing::info!("Mode: DRY-RUN (no DNS changes will be made)");
    } else {
        tracing::warn!("Mode: LIVE (DNS records WILL be modified)");
    }

    let provider = CloudflareProvider::new(api_token, dry_run).map_err(|e| e.to_string())?;

    let config = FcddnsConfig::new(VALIDATION_SECRET, ProviderConfig::Memory);
    let handler = RequestHandler::from_config(&config, ProviderRoutes::single(Arc::new(provider)))
        .map_err(|e| e.to_string())?;

    let token = CredentialSigner::new(VALIDATION_SECRET.as_bytes())
        .sign(&Credential::new(host, domain).with_slot(slot), None)
        .map_err(|e| e.to_string())?;

    let response = handler
        .handle(&DdnsRequest::new(format!("/ddns/v1/{token}/{test_ip}"), None))
        .await;

    tracing::info!("Response: {} {}", response.status, response.body);
    Ok(response.status)
}
