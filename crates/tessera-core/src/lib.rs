//! # tessera-core — Foundational Types for Tessera
//!
//! This crate is the bedrock of the Tessera policy engine. It defines the
//! primitives every other crate in the workspace depends on; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Structured errors.** One `EngineError` taxonomy covering conditional
//!    evaluation, configuration, storage collaborator, verification,
//!    query-syntax, and retention-invariant failures. Handler failures are
//!    values, never panics.
//!
//! 2. **String-keyed configuration behind a typed seam.** `Config` is an
//!    ordered JSON map, but policies never read it ad hoc — each policy
//!    deserializes the effective configuration into its own typed options
//!    struct, so a misconfigured key surfaces as a reportable
//!    `EngineError::Configuration` instead of silent misbehavior.
//!
//! 3. **Three-layer resolution is a pure function.** `resolve()` merges
//!    invocation parameters over binding configuration over policy-instance
//!    defaults, last writer wins, deterministically.
//!
//! 4. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tessera-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod context;
pub mod error;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use config::{resolve, Config};
pub use context::{Context, Invocation};
pub use error::EngineError;
pub use temporal::Timestamp;
