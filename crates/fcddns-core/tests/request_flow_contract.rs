//! Contract Test: Request Flow and Failure Handling
//!
//! Constraints verified:
//! - Delete intent on an empty slot succeeds without a mutation
//! - Address precedence: path literal, then credential claim, then peer
//! - Each failure kind short-circuits before any mutation and maps to its
//!   status code
//! - Provider failures are not retried within a request
//! - Re-issuing a request after a failed mutation converges to one record
//!
//! If this test fails, the boundary leaks failures or mutates too eagerly.

mod common;

use common::*;
use fcddns_core::{
    Action, Credential, DdnsRequest, DuplicateSlotPolicy, Error, ExpiryPolicy, NoOpReason,
};
use std::net::IpAddr;

#[tokio::test]
async fn delete_intent_without_record_is_noop() {
    let provider = CountingProvider::with_zone().await;

    let response = handler(&provider)
        .handle(&request(&token(0), Some("0.0.0.0"), peer()))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(
        response.body,
        "Record for test.example.com in slot 0 not found, so delete record is skipped"
    );
    assert_eq!(provider.mutation_calls(), 0);
}

#[tokio::test]
async fn path_address_beats_claim_and_peer() {
    let provider = CountingProvider::with_zone().await;
    let token = sign(Credential::new("test", DOMAIN).with_ip("10.0.0.2"));
    let peer = Some(IpAddr::from([10, 0, 0, 3]));

    handler(&provider)
        .reconcile(&request(&token, Some("10.0.0.1"), peer))
        .await
        .unwrap();

    assert_eq!(provider.records().await[0].content, "10.0.0.1");
}

#[tokio::test]
async fn claim_address_beats_peer() {
    let provider = CountingProvider::with_zone().await;
    let token = sign(Credential::new("test", DOMAIN).with_ip("10.0.0.2"));

    let outcome = handler(&provider)
        .reconcile(&request(&token, None, Some(IpAddr::from([10, 0, 0, 3]))))
        .await
        .unwrap();

    assert_eq!(outcome.target.to_string(), "10.0.0.2");
    assert_eq!(provider.records().await[0].content, "10.0.0.2");
}

#[tokio::test]
async fn peer_address_is_last_resort() {
    let provider = CountingProvider::with_zone().await;

    handler(&provider)
        .reconcile(&request(&token(0), None, Some(IpAddr::from([10, 0, 0, 3]))))
        .await
        .unwrap();

    assert_eq!(provider.records().await[0].content, "10.0.0.3");
}

#[tokio::test]
async fn claim_delete_sentinel_deletes() {
    let provider = CountingProvider::with_zone().await;
    provider
        .seed("r1", "10.0.0.1", 1, false, Some("[fcddns-slot:0]"))
        .await;
    let token = sign(Credential::new("test", DOMAIN).with_ip("0.0.0.0"));

    let outcome = handler(&provider)
        .reconcile(&request(&token, None, peer()))
        .await
        .unwrap();

    assert!(matches!(outcome.action, Action::Delete { .. }));
    assert!(provider.records().await.is_empty());
}

#[tokio::test]
async fn no_address_is_rejected_before_provider_calls() {
    let provider = CountingProvider::with_zone().await;

    let err = handler(&provider)
        .reconcile(&request(&token(0), None, None))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingAddress));
    assert_eq!(provider.list_zones_calls(), 0);
}

#[tokio::test]
async fn missing_token_is_400() {
    let provider = CountingProvider::with_zone().await;

    let response = handler(&provider)
        .handle(&DdnsRequest::new("/ddns/v1", peer()))
        .await;

    assert_eq!(response.status, 400);
    assert_eq!(provider.list_zones_calls(), 0);
}

#[tokio::test]
async fn invalid_token_is_400_without_detail() {
    let provider = CountingProvider::with_zone().await;
    let forged = fcddns_core::CredentialSigner::new(b"not-the-secret")
        .sign(&Credential::new("test", DOMAIN), None)
        .unwrap();

    let response = handler(&provider).handle(&request(&forged, None, peer())).await;

    assert_eq!(response.status, 400);
    assert_eq!(response.body, "Invalid JWT");
    assert_eq!(provider.list_zones_calls(), 0);
}

#[tokio::test]
async fn expired_token_only_rejected_under_enforce() {
    let provider = CountingProvider::with_zone().await;
    let expired = fcddns_core::CredentialSigner::new(SECRET.as_bytes())
        .sign(
            &Credential::new("test", DOMAIN),
            Some(chrono::Duration::days(-30)),
        )
        .unwrap();

    let lenient = handler(&provider)
        .handle(&request(&expired, Some("10.0.0.1"), peer()))
        .await;
    assert_eq!(lenient.status, 201);

    let strict = handler_with(&provider, ExpiryPolicy::Enforce, DuplicateSlotPolicy::FirstMatch)
        .handle(&request(&expired, Some("10.0.0.1"), peer()))
        .await;
    assert_eq!(strict.status, 400);
}

#[tokio::test]
async fn unknown_zone_is_404_naming_domain() {
    let provider = CountingProvider::default();
    provider
        .inner
        .add_zone(fcddns_core::Zone::new("z9", "myexample.com"))
        .await;

    let response = handler(&provider)
        .handle(&request(&token(0), Some("10.0.0.1"), peer()))
        .await;

    assert_eq!(response.status, 404);
    assert_eq!(response.body, "could not find zone for domain example.com");
    assert_eq!(provider.list_records_calls(), 0);
}

#[tokio::test]
async fn mutation_failure_is_500_and_not_retried() {
    let provider = CountingProvider::with_zone().await;
    provider.fail_mutations();

    let response = handler(&provider)
        .handle(&request(&token(0), Some("10.0.0.1"), peer()))
        .await;

    assert_eq!(response.status, 500);
    assert_eq!(response.body, "An unexpected error occurred.");
    assert_eq!(provider.create_calls(), 1, "mutation must be attempted exactly once");
}

#[tokio::test]
async fn lookup_failure_is_500() {
    let provider = CountingProvider::with_zone().await;
    provider.fail_lookups();

    let response = handler(&provider)
        .handle(&request(&token(0), Some("10.0.0.1"), peer()))
        .await;

    assert_eq!(response.status, 500);
    assert_eq!(provider.list_zones_calls(), 1);
    assert_eq!(provider.mutation_calls(), 0);
}

#[tokio::test]
async fn reissuing_after_failed_create_converges() {
    let provider = CountingProvider::with_zone().await;
    let handler = handler(&provider);
    let request = request(&token(0), Some("10.0.0.1"), peer());

    provider.fail_mutations();
    let response = handler.handle(&request).await;
    assert_eq!(response.status, 500);
    assert_eq!(provider.create_calls(), 1);
    assert!(provider.records().await.is_empty());

    provider.restore_mutations();
    let outcome = handler.reconcile(&request).await.unwrap();
    assert!(matches!(outcome.action, Action::Create { .. }));
    assert_eq!(provider.create_calls(), 2);

    let records = provider.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].content, "10.0.0.1");
    assert_eq!(records[0].comment.as_deref(), Some("[fcddns-slot:0]"));

    // Converged: a third attempt changes nothing
    let outcome = handler.reconcile(&request).await.unwrap();
    assert_eq!(outcome.action, Action::NoOp(NoOpReason::AlreadyCurrent));
    assert_eq!(provider.mutation_calls(), 2);
}
