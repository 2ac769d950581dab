// crates/research-providers/src/lib.rs
// ============================================================================
// Module: Research Providers Library
// Description: Discovery providers and their registry.
// Purpose: Put deterministic, seed-list, search, and LLM discovery behind
//          one contract with gate-controlled external access.
// Dependencies: research-config, research-core
// ============================================================================

//! ## Overview
//! Every provider implements [`research_core::DiscoveryProvider`] and emits
//! the `company_discovery_v1` payload with canonically ordered companies.
//! External providers consult the [`research_config::ExternalGate`] before
//! any network call: mock mode serves fixtures, live mode requires the
//! gate's credential check, and a refusal surfaces the structured
//! config error. Callers never bypass the gate.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod deterministic;
pub mod fixtures;
pub mod llm;
pub mod params;
pub mod registry;
pub mod search;
pub mod seed_list;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use deterministic::DeterministicProvider;
pub use llm::LlmProvider;
pub use llm::LlmTransport;
pub use registry::ProviderRegistry;
pub use search::SearchTransport;
pub use search::WebSearchProvider;
pub use seed_list::SeedListProvider;
