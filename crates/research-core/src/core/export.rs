// crates/research-core/src/core/export.rs
// ============================================================================
// Module: Export Pack Registry Model
// Description: Registry rows and storage-pointer validation for run packs.
// Purpose: Record deterministic export artifacts with verifiable hashes.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Export packs are append-only registry rows pointing at deterministic ZIP
//! artifacts on disk. Storage pointers are always relative, traversal-free,
//! and drive-letter-free so a registry restored on another host resolves
//! inside its configured storage root. Listing order is newest first with id
//! as the tiebreak.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::PackId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::TenantId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Registry Record
// ============================================================================

/// Persisted export pack registry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPackRecord {
    /// Pack identifier.
    pub id: PackId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Run the pack snapshots.
    pub run_id: RunId,
    /// Relative storage pointer under the export root.
    pub storage_pointer: String,
    /// SHA-256 of the archive bytes.
    pub sha256: String,
    /// Archive size in bytes.
    pub size_bytes: u64,
    /// Creation time.
    pub created_at: Timestamp,
}

// ============================================================================
// SECTION: Storage Pointer Validation
// ============================================================================

/// Errors raised by storage-pointer validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoragePointerError {
    /// Pointer was empty.
    #[error("storage pointer is empty")]
    Empty,
    /// Pointer was absolute or carried a drive letter.
    #[error("storage pointer must be relative: {0}")]
    NotRelative(String),
    /// Pointer contained a traversal or empty component.
    #[error("storage pointer contains an illegal component: {0}")]
    IllegalComponent(String),
}

/// Validates that a storage pointer is relative, traversal-free, and
/// drive-letter-free.
///
/// # Errors
///
/// Returns a [`StoragePointerError`] describing the first violation.
pub fn validate_storage_pointer(pointer: &str) -> Result<(), StoragePointerError> {
    if pointer.is_empty() {
        return Err(StoragePointerError::Empty);
    }
    if pointer.starts_with('/') || pointer.starts_with('\\') {
        return Err(StoragePointerError::NotRelative(pointer.to_string()));
    }
    let bytes = pointer.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return Err(StoragePointerError::NotRelative(pointer.to_string()));
    }
    for component in pointer.split(['/', '\\']) {
        if component.is_empty() || component == "." || component == ".." {
            return Err(StoragePointerError::IllegalComponent(pointer.to_string()));
        }
    }
    Ok(())
}
