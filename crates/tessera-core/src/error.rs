//! # Error Types — Structured Error Taxonomy
//!
//! Defines the error types used throughout Tessera. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - A malformed conditional is fatal to its binding only; the dispatcher
//!   records the failure and moves on.
//! - Configuration errors name the policy and the offending key or reason.
//! - Verification mismatches are expected outcomes, reported as failures,
//!   never as panics.
//! - A retention pass that would remove the last remaining replica is
//!   refused loudly, not silently skipped.

use thiserror::Error;

/// Top-level error type for the Tessera policy engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A binding's conditional predicate could not be evaluated
    /// (e.g., malformed path pattern). Fatal to that binding only.
    #[error("conditional evaluation failed for binding [{binding}]: {reason}")]
    ConditionalEvaluation {
        /// The policy name the binding targets.
        binding: String,
        /// Why evaluation failed.
        reason: String,
    },

    /// A required configuration key is missing or has an invalid type.
    /// Fatal to that invocation.
    #[error("invalid configuration for [{policy}]: {reason}")]
    Configuration {
        /// The policy whose configuration was rejected.
        policy: String,
        /// Why the configuration was rejected.
        reason: String,
    },

    /// The storage/catalog collaborator reported a failure. Surfaced as a
    /// failure; callers retry only by explicitly wrapping with retry.
    #[error("storage collaborator error: {0}")]
    Storage(String),

    /// A replica did not match the object's authoritative state, or the
    /// destination replica could not be located.
    #[error("verification mismatch: {0}")]
    VerificationMismatch(String),

    /// Invalid query-invocation parameters (e.g., empty query string or an
    /// empty nested-policy list). Detected before any dispatch.
    #[error("invalid query parameters: {0}")]
    QuerySyntax(String),

    /// A retention pass attempted to remove the last remaining replica.
    #[error("retention invariant violation: refusing to remove the last replica of [{logical_path}]")]
    RetentionInvariant {
        /// The logical path whose final replica was targeted.
        logical_path: String,
    },

    /// The named policy is not registered.
    #[error("unknown policy [{0}]")]
    UnknownPolicy(String),
}

impl EngineError {
    /// Convenience constructor for configuration errors.
    pub fn configuration(policy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            policy: policy.into(),
            reason: reason.into(),
        }
    }
}
