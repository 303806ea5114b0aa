// # Provider Implementations
//
// Providers that live in the core crate. Network-backed providers live in
// their own crates (e.g. `fcddns-provider-cloudflare`).

pub mod memory;

pub use memory::{MemoryDnsProvider, MemoryDnsProviderFactory};
