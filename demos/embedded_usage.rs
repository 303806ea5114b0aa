//! Minimal embedding example for fcddns-core
//!
//! Drives the request handler directly with the in-memory provider: no HTTP
//! server, no daemon. Each step prints the response a client would receive.

use fcddns_core::traits::ManagedRecord;
use fcddns_core::{
    Credential, CredentialSigner, DdnsRequest, FcddnsConfig, MemoryDnsProvider, ProviderConfig,
    ProviderRoutes, RequestHandler, Result, Zone,
};
use std::net::IpAddr;
use std::sync::Arc;

const SECRET: &str = "embedded-example-secret";

async fn step(handler: &RequestHandler, label: &str, path: String, peer: Option<IpAddr>) {
    let response = handler.handle(&DdnsRequest::new(path, peer)).await;
    println!("{label}\n   -> {} {}\n", response.status, response.body);
}

async fn dump(provider: &MemoryDnsProvider) {
    for record in provider.records("zone-1").await {
        println!(
            "   {} {} ttl={} proxied={} comment={:?}",
            record.name, record.content, record.ttl, record.proxied, record.comment
        );
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    println!("=== Embedded fcddns-core Example ===\n");

    let provider = MemoryDnsProvider::new();
    provider.add_zone(Zone::new("zone-1", "example.com")).await;

    let config = FcddnsConfig::new(SECRET, ProviderConfig::Memory);
    let handler = RequestHandler::from_config(
        &config,
        ProviderRoutes::single(Arc::new(provider.clone())),
    )?;

    let signer = CredentialSigner::new(SECRET.as_bytes());
    let laptop = signer.sign(&Credential::new("home", "example.com"), None)?;
    let router = signer.sign(&Credential::new("home", "example.com").with_slot(1), None)?;
    let peer = Some(IpAddr::from([203, 0, 113, 10]));

    step(
        &handler,
        "1. Laptop checks in (slot 0, peer address)",
        format!("/ddns/v1/{laptop}"),
        peer,
    )
    .await;
    step(
        &handler,
        "2. Laptop checks in again",
        format!("/ddns/v1/{laptop}"),
        peer,
    )
    .await;
    step(
        &handler,
        "3. Router checks in (slot 1, explicit address)",
        format!("/ddns/v1/{router}/198.51.100.1"),
        peer,
    )
    .await;
    step(
        &handler,
        "4. Router moves",
        format!("/ddns/v1/{router}/198.51.100.2"),
        peer,
    )
    .await;
    dump(&provider).await;

    step(
        &handler,
        "5. Laptop releases its slot",
        format!("/ddns/v1/{laptop}/0.0.0.0"),
        peer,
    )
    .await;
    dump(&provider).await;

    // A hand-made record makes the hostname off limits
    provider
        .insert_record(
            "zone-1",
            ManagedRecord {
                id: "manual".to_string(),
                name: "home.example.com".to_string(),
                content: "192.0.2.200".to_string(),
                ttl: 3600,
                proxied: false,
                comment: Some("added by hand".to_string()),
            },
        )
        .await;
    step(
        &handler,
        "6. Router checks in next to an unmanaged record",
        format!("/ddns/v1/{router}/198.51.100.3"),
        peer,
    )
    .await;

    println!("Provider mutations issued: {}", provider.mutation_count());
    println!("\n=== Embedding Successful ===");

    Ok(())
}
