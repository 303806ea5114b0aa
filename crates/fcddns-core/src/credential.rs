//! Signed credentials
//!
//! A credential is an HS256 JWT naming the record it may update:
//!
//! ```json
//! { "host": "home", "domain": "example.com", "slot": 1, "ip": "203.0.113.7" }
//! ```
//!
//! `slot` defaults to 0 and `ip` is an optional fallback address. Tokens are
//! long-lived: under [`ExpiryPolicy::Never`] the `exp` claim is ignored and a
//! credential stays valid until the shared secret is rotated.

use crate::config::ExpiryPolicy;
use crate::error::{Error, Result};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Raw claim set as carried on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Issued at (NumericDate, may be fractional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<serde_json::Number>,
    /// Expiration (NumericDate), only checked under [`ExpiryPolicy::Enforce`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<serde_json::Number>,
}

/// A verified credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub host: String,
    pub domain: String,
    pub slot: u32,
    /// Fallback target address
    pub ip: Option<String>,
}

impl Credential {
    pub fn new(host: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            domain: domain.into(),
            slot: 0,
            ip: None,
        }
    }

    pub fn with_slot(mut self, slot: u32) -> Self {
        self.slot = slot;
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// `host.domain`
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.host, self.domain)
    }
}

impl TryFrom<CredentialClaims> for Credential {
    type Error = Error;

    fn try_from(claims: CredentialClaims) -> Result<Self> {
        let host = claims
            .host
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::invalid_credential("claim `host` is missing or empty"))?;
        let domain = claims
            .domain
            .filter(|d| !d.is_empty())
            .ok_or_else(|| Error::invalid_credential("claim `domain` is missing or empty"))?;

        Ok(Self {
            host,
            domain,
            slot: claims.slot.unwrap_or(0),
            // Older signers always emit `ip`, empty when unset
            ip: claims.ip.filter(|ip| !ip.is_empty()),
        })
    }
}

/// Verifies credentials against the shared secret
#[derive(Clone)]
pub struct CredentialValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for CredentialValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialValidator")
            .field("secret", &"<REDACTED>")
            .field("validate_exp", &self.validation.validate_exp)
            .finish()
    }
}

impl CredentialValidator {
    pub fn new(secret: &[u8], expiry: ExpiryPolicy) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        match expiry {
            ExpiryPolicy::Never => {
                validation.validate_exp = false;
            }
            ExpiryPolicy::Enforce => {
                validation.validate_exp = true;
                validation.required_spec_claims.insert("exp".to_string());
            }
        }

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Verify `token` and extract the credential it carries
    pub fn validate(&self, token: &str) -> Result<Credential> {
        let data = decode::<CredentialClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| Error::invalid_credential(e.to_string()))?;

        Credential::try_from(data.claims)
    }
}

/// Issues credentials signed with the shared secret
#[derive(Clone)]
pub struct CredentialSigner {
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for CredentialSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSigner")
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

impl CredentialSigner {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
        }
    }

    /// Sign a credential.
    ///
    /// `expires_in` sets an `exp` claim; it only has an effect on validators
    /// running [`ExpiryPolicy::Enforce`].
    pub fn sign(
        &self,
        credential: &Credential,
        expires_in: Option<chrono::Duration>,
    ) -> Result<String> {
        if credential.host.is_empty() || credential.domain.is_empty() {
            return Err(Error::invalid_credential("host and domain must not be empty"));
        }

        let now = chrono::Utc::now();
        let claims = CredentialClaims {
            host: Some(credential.host.clone()),
            domain: Some(credential.domain.clone()),
            slot: (credential.slot != 0).then_some(credential.slot),
            ip: credential.ip.clone(),
            iat: Some(now.timestamp().into()),
            exp: expires_in.map(|ttl| (now + ttl).timestamp().into()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Other(format!("failed to sign credential: {e}")))
    }
}
