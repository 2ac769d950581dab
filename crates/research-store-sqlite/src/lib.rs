// crates/research-store-sqlite/src/lib.rs
// ============================================================================
// Module: Research SQLite Store Library
// Description: Durable ResearchStore implementation on SQLite.
// Purpose: Persist runs, queues, documents, and evidence with WAL durability.
// Dependencies: research-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides the production [`research_core::ResearchStore`]
//! implementation: a single SQLite database in WAL mode holding every
//! tenant-scoped entity and the durable job queue. Claiming runs inside an
//! immediate transaction, which serializes writers and guarantees that two
//! concurrent workers never lease the same job.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteStore;
pub use store::SqliteStoreError;
