// crates/research-core/src/core/identifiers.rs
// ============================================================================
// Module: Research Engine Identifiers
// Description: Canonical typed identifiers for research-engine entities.
// Purpose: Provide strongly typed, serializable IDs with stable forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the identifiers used throughout the research engine.
//! Entity identifiers are store-assigned 64-bit integers wrapped in typed
//! newtypes so that a run id can never be passed where a prospect id is
//! expected. Tenant, mandate, and worker identifiers are opaque strings
//! supplied by callers; validation happens at service boundaries rather than
//! inside these wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: String Identifiers
// ============================================================================

/// Declares an opaque string identifier newtype.
macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id! {
    /// Tenant identifier scoping every entity row.
    TenantId
}

string_id! {
    /// Mandate identifier (the hiring role or deal thesis a run serves).
    MandateId
}

string_id! {
    /// Worker identifier used for queue leases.
    WorkerId
}

// ============================================================================
// SECTION: Numeric Identifiers
// ============================================================================

/// Declares a store-assigned numeric identifier newtype.
macro_rules! numeric_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw store row identifier.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw row identifier.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self::new(value)
            }
        }
    };
}

numeric_id! {
    /// Research run identifier.
    RunId
}

numeric_id! {
    /// Run step identifier.
    StepId
}

numeric_id! {
    /// Durable queue job identifier.
    JobId
}

numeric_id! {
    /// Source document identifier.
    SourceId
}

numeric_id! {
    /// Company prospect identifier.
    ProspectId
}

numeric_id! {
    /// Executive prospect identifier.
    ExecutiveId
}

numeric_id! {
    /// Enrichment ledger row identifier.
    EnrichmentId
}

numeric_id! {
    /// Export pack registry row identifier.
    PackId
}

numeric_id! {
    /// Executive merge decision identifier.
    DecisionId
}
