// crates/research-core/src/core/error.rs
// ============================================================================
// Module: Engine Error Taxonomy
// Description: Result error kinds shared across research-engine crates.
// Purpose: Classify failures for retry policy and caller surfaces.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every fallible boundary in the engine returns [`EngineError`]. The variant
//! determines handling: validation, authorization, not-found, conflict, and
//! provider-config errors surface to the caller and are never retried;
//! upstream and transient errors are retried under the applicable policy;
//! limit errors carry a structured envelope mirrored on the wire. Only the
//! outermost surface converts errors into status codes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::hashing::HashError;

// ============================================================================
// SECTION: Engine Error
// ============================================================================

/// Unified error taxonomy for the research engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input, unknown enum value, or missing required field.
    #[error("validation error: {0}")]
    Validation(String),
    /// Tenant mismatch on a scoped entity.
    #[error("authorization error: {0}")]
    Authorization(String),
    /// Referenced id absent within the tenant scope.
    #[error("not found: {0}")]
    NotFound(String),
    /// External provider cannot run: mock disabled and credentials missing.
    #[error("external provider config error for {provider}: {message}")]
    ExternalProviderConfig {
        /// Provider key that failed the gate.
        provider: String,
        /// Human-readable description.
        message: String,
        /// Missing environment variable names, sorted.
        missing: Vec<String>,
    },
    /// Non-2xx or network failure from a provider or fetch target.
    #[error("upstream error: {message}")]
    Upstream {
        /// Human-readable description.
        message: String,
        /// HTTP status code when one was received.
        status_code: Option<u16>,
    },
    /// Illegal state transition.
    #[error("conflict: {0}")]
    Conflict(String),
    /// A configured size cap was exceeded.
    #[error("limit exceeded: {code}")]
    LimitExceeded {
        /// Stable machine-readable code, e.g. `EXPORT_ZIP_TOO_LARGE`.
        code: String,
        /// Human-readable description.
        message: String,
        /// Structured details, e.g. `{"max_zip_bytes": ...}`.
        details: Value,
    },
    /// Retriable infrastructure failure (deadlock, lease contention).
    #[error("transient error: {0}")]
    Transient(String),
    /// Store-level failure.
    #[error("store error: {0}")]
    Store(String),
    /// Canonical hashing failure.
    #[error(transparent)]
    Hash(#[from] HashError),
    /// Filesystem failure while writing or reading artifacts.
    #[error("io error: {0}")]
    Io(String),
}

impl EngineError {
    /// Returns true when the error should be retried under backoff.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::Transient(_))
    }

    /// Returns the stable wire code for this error kind.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Authorization(_) => "authorization_error",
            Self::NotFound(_) => "not_found",
            Self::ExternalProviderConfig { .. } => "external_provider_config",
            Self::Upstream { .. } => "upstream_error",
            Self::Conflict(_) => "conflict",
            Self::LimitExceeded { code, .. } => code,
            Self::Transient(_) => "transient_error",
            Self::Store(_) => "store_error",
            Self::Hash(_) => "hash_error",
            Self::Io(_) => "io_error",
        }
    }

    /// Renders the wire envelope for this error.
    #[must_use]
    pub fn envelope(&self) -> ErrorEnvelope {
        let details = match self {
            Self::ExternalProviderConfig { missing, .. } => {
                serde_json::json!({ "missing": missing })
            }
            Self::Upstream { status_code, .. } => {
                serde_json::json!({ "status_code": status_code })
            }
            Self::LimitExceeded { details, .. } => details.clone(),
            _ => Value::Null,
        };
        ErrorEnvelope {
            error: ErrorEnvelopeBody {
                code: self.code().to_string(),
                message: self.to_string(),
                details,
            },
        }
    }
}

// ============================================================================
// SECTION: Wire Envelope
// ============================================================================

/// JSON error envelope mirrored by the outer HTTP surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Error body.
    pub error: ErrorEnvelopeBody,
}

/// Body of the wire error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelopeBody {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Structured details; null when there are none.
    pub details: Value,
}
