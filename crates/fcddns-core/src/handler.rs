//! Request handling
//!
//! The handler is the boundary between a transport and the core. It accepts
//! the request path and the peer address the transport observed, and runs
//!
//! ```text
//! path ─► CredentialValidator ─► ZoneLocator ─► list records ─► Reconciler ─► mutation
//! ```
//!
//! strictly in sequence, each stage able to end the request. Mutations are
//! attempted exactly once and never retried here; the reconciliation is
//! idempotent so the caller can safely re-issue the whole request.

use crate::config::FcddnsConfig;
use crate::credential::CredentialValidator;
use crate::error::{Error, Result};
use crate::reconcile::{Action, NoOpReason, Reconciler};
use crate::registry::ProviderRoutes;
use crate::zone::ZoneLocator;
use std::net::{IpAddr, Ipv4Addr};
use tracing::{debug, error, info, warn};

/// Path prefix of the reconciliation endpoint
pub const DDNS_PATH_PREFIX: &str = "/ddns/v1";

/// An inbound reconciliation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdnsRequest {
    /// Request path, e.g. `/ddns/v1/<token>/<ip>`
    pub path: String,
    /// Address the transport observed for the caller
    pub peer_ip: Option<IpAddr>,
}

impl DdnsRequest {
    pub fn new(path: impl Into<String>, peer_ip: Option<IpAddr>) -> Self {
        Self {
            path: path.into(),
            peer_ip,
        }
    }
}

/// Transport-neutral response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdnsResponse {
    pub status: u16,
    pub body: String,
}

impl DdnsResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

impl From<&Error> for DdnsResponse {
    fn from(err: &Error) -> Self {
        Self::new(err.status_code(), err.public_message())
    }
}

/// Segments of a ddns path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathParams<'a> {
    pub token: &'a str,
    /// Literal address override
    pub ip: Option<&'a str>,
}

/// Split `/ddns/v1/{token}[/{ip}]`. Segments past the address are ignored.
pub fn parse_path(path: &str) -> Result<PathParams<'_>> {
    let rest = path
        .strip_prefix(DDNS_PATH_PREFIX)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .ok_or_else(|| Error::InvalidPath(path.to_string()))?;

    let mut segments = rest.strip_prefix('/').unwrap_or(rest).split('/');
    let token = segments
        .next()
        .filter(|t| !t.is_empty())
        .ok_or(Error::MissingCredential)?;
    let ip = segments.next().filter(|ip| !ip.is_empty());

    Ok(PathParams { token, ip })
}

/// Pick the target address: path literal, then credential claim, then peer.
///
/// The first source present wins even if it does not parse; an IPv6 peer is
/// only usable when it is an IPv4-mapped address.
pub fn resolve_address(
    path_ip: Option<&str>,
    claim_ip: Option<&str>,
    peer_ip: Option<IpAddr>,
) -> Result<Ipv4Addr> {
    if let Some(literal) = path_ip.or(claim_ip) {
        return literal
            .parse::<Ipv4Addr>()
            .map_err(|_| Error::InvalidAddress(literal.to_string()));
    }

    match peer_ip {
        Some(IpAddr::V4(v4)) => Ok(v4),
        Some(IpAddr::V6(v6)) => v6
            .to_ipv4_mapped()
            .ok_or_else(|| Error::InvalidAddress(v6.to_string())),
        None => Err(Error::MissingAddress),
    }
}

/// What a successful request did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub fqdn: String,
    pub slot: u32,
    pub target: Ipv4Addr,
    pub action: Action,
}

impl Outcome {
    pub fn status(&self) -> u16 {
        match self.action {
            Action::Create { .. } => 201,
            _ => 200,
        }
    }

    pub fn message(&self) -> String {
        let Outcome {
            fqdn, slot, target, ..
        } = self;

        match &self.action {
            Action::NoOp(NoOpReason::NothingToDelete) => {
                format!("Record for {fqdn} in slot {slot} not found, so delete record is skipped")
            }
            Action::NoOp(NoOpReason::AlreadyCurrent) => {
                format!("IP for {fqdn} is already up to date.")
            }
            Action::Create { .. } => {
                format!("Successfully created A record for {fqdn} with IP {target} in slot {slot}")
            }
            Action::Update { .. } => {
                format!("Successfully updated IP for {fqdn} to {target} in slot {slot}")
            }
            Action::Delete { .. } => {
                format!("Successfully deleted A record for {fqdn} in slot {slot}")
            }
        }
    }
}

impl From<&Outcome> for DdnsResponse {
    fn from(outcome: &Outcome) -> Self {
        Self::new(outcome.status(), outcome.message())
    }
}

/// Orchestrates one reconciliation per request
///
/// Holds no mutable state; all authoritative state lives at the provider.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    validator: CredentialValidator,
    routes: ProviderRoutes,
    reconciler: Reconciler,
}

impl RequestHandler {
    pub fn new(
        validator: CredentialValidator,
        routes: ProviderRoutes,
        reconciler: Reconciler,
    ) -> Self {
        Self {
            validator,
            routes,
            reconciler,
        }
    }

    pub fn from_config(config: &FcddnsConfig, routes: ProviderRoutes) -> Result<Self> {
        config.validate()?;

        Ok(Self::new(
            CredentialValidator::new(config.jwt_secret.as_bytes(), config.credential.expiry),
            routes,
            Reconciler::new(config.reconcile.duplicate_slot_policy),
        ))
    }

    /// Handle a request, mapping every outcome to a response
    pub async fn handle(&self, request: &DdnsRequest) -> DdnsResponse {
        match self.reconcile(request).await {
            Ok(outcome) => {
                info!(
                    fqdn = %outcome.fqdn,
                    slot = outcome.slot,
                    ip = %outcome.target,
                    action = outcome.action.kind(),
                    "DDNS: {} => {}",
                    outcome.fqdn,
                    outcome.target
                );
                DdnsResponse::from(&outcome)
            }
            Err(err) => {
                match &err {
                    Error::InvalidCredential(cause) => {
                        warn!("Rejected credential: {}", cause);
                    }
                    e if e.status_code() >= 500 => {
                        error!("DDNS update failed: {}", e);
                    }
                    e => {
                        warn!("DDNS request rejected: {}", e);
                    }
                }
                DdnsResponse::from(&err)
            }
        }
    }

    /// Run the reconciliation flow for a request
    pub async fn reconcile(&self, request: &DdnsRequest) -> Result<Outcome> {
        let params = parse_path(&request.path)?;
        let credential = self.validator.validate(params.token)?;
        let target = resolve_address(params.ip, credential.ip.as_deref(), request.peer_ip)?;
        let fqdn = credential.fqdn();
        let slot = credential.slot;

        debug!("Reconciling {} (slot {}) -> {}", fqdn, slot, target);

        let provider = self
            .routes
            .provider_for(&credential.domain)
            .ok_or_else(|| Error::NoProviderForDomain(credential.domain.clone()))?;

        let zone = ZoneLocator::new(provider.as_ref())
            .locate(&credential.domain)
            .await?;
        let existing = provider.list_a_records(&zone.id, &fqdn).await?;
        debug!("Found {} A record(s) for {}", existing.len(), fqdn);

        let action = self
            .reconciler
            .reconcile(&zone, &fqdn, slot, target, &existing)?;

        match &action {
            Action::NoOp(reason) => {
                debug!("No change for {} (slot {}): {}", fqdn, slot, reason);
            }
            Action::Create { zone_id, record } => {
                provider.create_a_record(zone_id, record).await?;
            }
            Action::Update {
                zone_id,
                record_id,
                previous,
                record,
            } => {
                debug!("Updating {} from {} to {}", fqdn, previous, record.content);
                provider.update_a_record(zone_id, record_id, record).await?;
            }
            Action::Delete { zone_id, record_id } => {
                provider.delete_a_record(zone_id, record_id).await?;
            }
        }

        Ok(Outcome {
            fqdn,
            slot,
            target,
            action,
        })
    }

    /// Echo the caller's observed address
    pub fn my_ip(peer_ip: Option<IpAddr>) -> DdnsResponse {
        match peer_ip {
            Some(ip) => DdnsResponse::new(200, ip.to_string()),
            None => DdnsResponse::from(&Error::MissingAddress),
        }
    }
}
