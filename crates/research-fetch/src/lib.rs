// crates/research-fetch/src/lib.rs
// ============================================================================
// Module: Research Fetch Library
// Description: Blocking HTTP acquisition for URL sources.
// Purpose: Implement the ContentFetcher contract with robots and size caps.
// Dependencies: research-core, reqwest
// ============================================================================

//! ## Overview
//! The fetcher performs one bounded acquisition attempt per call: scheme
//! validation, per-host robots policy, a manual redirect walk that records
//! the final URL, conditional request headers, a response size cap, and a
//! captured header subset. Classification for the retry policy lives on
//! [`research_core::FetchError`]; scheduling retries across attempts is the
//! orchestrator's job, not this crate's.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod fetcher;
pub mod robots;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use fetcher::FetcherConfig;
pub use fetcher::HttpFetcher;
pub use robots::RobotsPolicy;
