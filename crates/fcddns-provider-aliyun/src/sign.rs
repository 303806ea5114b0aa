//! ACS3-HMAC-SHA256 request signing
//!
//! Alidns is an RPC-style API: every parameter travels in the query string
//! and the body is always empty, so the payload hash is a constant.

use fcddns_core::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub(crate) const ALGORITHM: &str = "ACS3-HMAC-SHA256";

/// Alidns API version
pub(crate) const API_VERSION: &str = "2015-01-09";

/// SHA-256 of the empty body
pub(crate) const EMPTY_BODY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

const SIGNED_HEADERS: &str =
    "host;x-acs-action;x-acs-content-sha256;x-acs-date;x-acs-signature-nonce;x-acs-version";

type HmacSha256 = Hmac<Sha256>;

/// Sorted, RFC 3986 encoded query string
pub(crate) fn canonical_query(params: &[(&str, &str)]) -> String {
    let sorted: BTreeMap<&str, &str> = params.iter().copied().collect();
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Access key pair used to sign requests
#[derive(Clone)]
pub(crate) struct AccessKey {
    id: String,
    secret: String,
}

impl std::fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessKey")
            .field("id", &self.id)
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

impl AccessKey {
    pub(crate) fn new(id: String, secret: String) -> Self {
        Self { id, secret }
    }

    /// `Authorization` header value for one POST to `/`
    pub(crate) fn authorization(
        &self,
        host: &str,
        action: &str,
        query: &str,
        date: &str,
        nonce: &str,
    ) -> Result<String> {
        let canonical_headers = format!(
            "host:{host}\nx-acs-action:{action}\nx-acs-content-sha256:{EMPTY_BODY_SHA256}\n\
             x-acs-date:{date}\nx-acs-signature-nonce:{nonce}\nx-acs-version:{API_VERSION}\n"
        );
        let canonical_request = format!(
            "POST\n/\n{query}\n{canonical_headers}\n{SIGNED_HEADERS}\n{EMPTY_BODY_SHA256}"
        );
        tracing::trace!("Canonical request:\n{}", canonical_request);

        let hashed = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = format!("{ALGORITHM}\n{hashed}");

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| Error::config(format!("Aliyun access key secret unusable: {e}")))?;
        mac.update(string_to_sign.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!(
            "{ALGORITHM} Credential={},SignedHeaders={SIGNED_HEADERS},Signature={signature}",
            self.id
        ))
    }
}
