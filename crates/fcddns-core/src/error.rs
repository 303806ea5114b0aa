//! Error types for fcddns
//!
//! Every failure a request can hit is one variant here. The outward HTTP
//! status of each variant is fixed by [`Error::status_code`].

use thiserror::Error;

/// Result type alias for fcddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fcddns
#[derive(Error, Debug)]
pub enum Error {
    /// No token segment in the request path
    #[error("missing credential")]
    MissingCredential,

    /// Signature, algorithm or claim-shape failure.
    ///
    /// The cause is for logs only and is never written to a response body.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The request path is not a ddns path
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// No address source yielded a value
    #[error("client address not found")]
    MissingAddress,

    /// The resolved address is not usable as A record content
    #[error("invalid IPv4 address: {0}")]
    InvalidAddress(String),

    /// The domain does not resolve to a zone at the provider
    #[error("could not find zone for domain {0}")]
    ZoneNotFound(String),

    /// No provider is routed for the domain
    #[error("no provider configured for domain {0}")]
    NoProviderForDomain(String),

    /// Records exist for the FQDN that carry no slot marker
    #[error(
        "there are {count} record(s) not managed by fcddns for {fqdn}, please manage them manually"
    )]
    ConflictUnmanagedRecords {
        /// The hostname the records belong to
        fqdn: String,
        /// Number of offending records
        count: usize,
    },

    /// More than one record carries the same slot marker (fail-closed policy)
    #[error("{count} records share slot {slot} for {fqdn}, please manage them manually")]
    DuplicateSlot {
        /// The hostname the records belong to
        fqdn: String,
        /// The contested slot
        slot: u32,
        /// Number of records carrying the marker
        count: usize,
    },

    /// Authentication against the provider API failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The provider API rate limited us
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid credential error
    pub fn invalid_credential(msg: impl Into<String>) -> Self {
        Self::InvalidCredential(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// HTTP status this error surfaces as at the boundary
    pub fn status_code(&self) -> u16 {
        match self {
            Error::MissingCredential
            | Error::InvalidCredential(_)
            | Error::InvalidPath(_)
            | Error::MissingAddress
            | Error::InvalidAddress(_)
            | Error::NoProviderForDomain(_)
            | Error::ConflictUnmanagedRecords { .. }
            | Error::DuplicateSlot { .. } => 400,
            Error::ZoneNotFound(_) => 404,
            Error::Authentication(_)
            | Error::RateLimited(_)
            | Error::Provider { .. }
            | Error::Config(_)
            | Error::Json(_)
            | Error::Other(_) => 500,
        }
    }

    /// Message safe to return to the caller.
    ///
    /// Credential causes and provider details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Error::MissingCredential => {
                "Missing required parameters: jwt must be provided and must be a valid JWT"
                    .to_string()
            }
            Error::InvalidCredential(_) => "Invalid JWT".to_string(),
            _ if self.status_code() >= 500 => "An unexpected error occurred.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
