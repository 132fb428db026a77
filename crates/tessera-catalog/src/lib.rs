//! # tessera-catalog — The Storage/Catalog Collaborator Contract
//!
//! Tessera's engine never owns storage state. Everything it knows about
//! objects, replicas, resources, users, and metadata flows through the
//! [`Catalog`] trait defined here:
//!
//! - a **query contract**: a parametric `SELECT ... WHERE ...` string over
//!   the fixed catalog schema, returning ordered rows and honoring a row
//!   limit;
//! - a **metadata contract**: get/set/remove `(attribute, value, units)`
//!   triples on data objects, collections, resources, and users;
//! - a **replica contract**: create/remove/enumerate replicas of a logical
//!   object across named resources, read physical state, and sample
//!   resource utilization.
//!
//! [`MemoryCatalog`] is the in-process implementation used by the test
//! suites: a mutex-guarded state tree with a minimal query evaluator
//! covering the subset of the schema the policies exercise.

pub mod catalog;
pub mod error;
pub mod memory;
pub mod query;
pub mod types;

pub use catalog::Catalog;
pub use error::CatalogError;
pub use memory::MemoryCatalog;
pub use types::{AttributeValue, CollectionEntry, EntityRef, ReplicaInfo};
