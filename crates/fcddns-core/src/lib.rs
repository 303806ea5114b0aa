// # fcddns-core
//
// Reconciliation core for a signed-credential dynamic DNS service.
//
// A client holds a long-lived signed credential naming one `(host, domain,
// slot)`. Each request keeps exactly one A record per slot pointed at the
// client's current address, and never touches records it does not own.
//
// ## Architecture Overview
//
// - **CredentialValidator**: Verifies and decodes the signed credential
// - **ZoneLocator**: Resolves a domain to the provider's zone
// - **Reconciler**: Decides create / update / delete / no-op for one slot
// - **RequestHandler**: Parses the path and runs the stages in sequence
// - **DnsProvider**: Trait for the provider operations the core consumes
// - **ProviderRegistry / ProviderRoutes**: Provider construction and per-domain routing
//
// ## Design Principles
//
// 1. **Stateless**: No cache or shared mutable state between requests
// 2. **Idempotent**: Re-issuing a request after any failure is always safe
// 3. **Fail Closed**: A hostname with unrecognized records is never mutated
// 4. **Library-First**: Transports are thin adapters over `RequestHandler`

pub mod config;
pub mod credential;
pub mod error;
pub mod handler;
pub mod provider;
pub mod reconcile;
pub mod registry;
pub mod slot;
pub mod traits;
pub mod zone;

// Re-export core types for convenience
pub use config::{DuplicateSlotPolicy, ExpiryPolicy, FcddnsConfig, ProviderConfig};
pub use credential::{Credential, CredentialSigner, CredentialValidator};
pub use error::{Error, Result};
pub use handler::{DdnsRequest, DdnsResponse, Outcome, RequestHandler};
pub use provider::MemoryDnsProvider;
pub use reconcile::{Action, NoOpReason, Reconciler};
pub use registry::{ProviderRegistry, ProviderRoutes};
pub use slot::{SlotMarker, SlotTag};
pub use traits::{DnsProvider, ManagedRecord, RecordSpec, Zone};
pub use zone::ZoneLocator;
