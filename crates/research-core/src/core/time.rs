// crates/research-core/src/core/time.rs
// ============================================================================
// Module: Research Engine Time Model
// Description: Canonical timestamp representation for records and leases.
// Purpose: Provide deterministic, replayable time values across the engine.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The research engine stores explicit time values on every record so that
//! retries, lease reclamation, and export snapshots replay deterministically.
//! Core code never reads wall-clock time directly; hosts supply timestamps
//! through the [`crate::interfaces::Clock`] contract.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical timestamp in unix-epoch milliseconds.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads the
///   wall clock. Monotonicity is a caller responsibility.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix-epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix-epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns this timestamp shifted forward by the given milliseconds.
    ///
    /// Saturates instead of wrapping on overflow.
    #[must_use]
    pub const fn plus_millis(self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Returns this timestamp shifted backward by the given milliseconds.
    ///
    /// Saturates instead of wrapping on underflow.
    #[must_use]
    pub const fn minus_millis(self, millis: i64) -> Self {
        Self(self.0.saturating_sub(millis))
    }

    /// Returns the whole milliseconds elapsed since `earlier`, or zero when
    /// `earlier` is in the future.
    #[must_use]
    pub const fn millis_since(self, earlier: Self) -> i64 {
        let delta = self.0.saturating_sub(earlier.0);
        if delta < 0 { 0 } else { delta }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self::from_unix_millis(value)
    }
}
