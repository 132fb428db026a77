//! # The Catalog Trait
//!
//! The seam between the policy engine and the storage federation. Policy
//! handlers and the query invoker hold an `Arc<dyn Catalog>` and issue
//! read/query and mutate requests through it; they never own replica
//! state.

use std::collections::BTreeMap;

use crate::error::CatalogError;
use crate::types::{AttributeValue, CollectionEntry, EntityRef, ReplicaInfo};

/// The storage/catalog collaborator contract.
///
/// Implementations may block on network calls; the dispatcher tolerates
/// blocking. All methods take `&self` — implementations guard their own
/// state.
pub trait Catalog: Send + Sync {
    /// Execute a catalog query, returning at most `limit` rows in result
    /// order. A `limit` of zero means unlimited.
    fn query(&self, query: &str, limit: u32) -> Result<Vec<Vec<String>>, CatalogError>;

    /// All metadata triples attached to an entity, keyed by attribute.
    ///
    /// An entity with no metadata yields an empty map; an unknown entity
    /// is an error.
    fn metadata(&self, entity: &EntityRef) -> Result<BTreeMap<String, AttributeValue>, CatalogError>;

    /// Set a metadata attribute on an entity. Last write wins.
    fn set_metadata(
        &self,
        entity: &EntityRef,
        attribute: &str,
        value: &AttributeValue,
    ) -> Result<(), CatalogError>;

    /// Remove a metadata attribute from an entity. Removing an absent
    /// attribute is a no-op.
    fn remove_metadata(&self, entity: &EntityRef, attribute: &str) -> Result<(), CatalogError>;

    /// Whether a collection is registered at the logical path.
    fn is_collection(&self, logical_path: &str) -> bool;

    /// Whether a data object is registered at the logical path.
    fn is_data_object(&self, logical_path: &str) -> bool;

    /// Immediate entries of a collection, objects and sub-collections.
    fn list_collection(&self, logical_path: &str) -> Result<Vec<CollectionEntry>, CatalogError>;

    /// The replicas of a logical object, in registration order.
    fn replicas(&self, logical_path: &str) -> Result<Vec<ReplicaInfo>, CatalogError>;

    /// Create a replica of a logical object on `destination` from the copy
    /// on `source`. Either fully registers the new replica or leaves the
    /// catalog unchanged.
    fn replicate(
        &self,
        logical_path: &str,
        source: &str,
        destination: &str,
    ) -> Result<(), CatalogError>;

    /// Remove the replica of a logical object held on `resource`.
    fn remove_replica(&self, logical_path: &str, resource: &str) -> Result<(), CatalogError>;

    /// Remove a logical object and every replica of it.
    fn unlink(&self, logical_path: &str) -> Result<(), CatalogError>;

    /// The size of the physical copy on `resource`, recomputed from
    /// storage rather than read from the catalog.
    fn physical_size(&self, logical_path: &str, resource: &str) -> Result<u64, CatalogError>;

    /// Recompute the checksum of the physical copy on `resource`.
    fn compute_checksum(&self, logical_path: &str, resource: &str)
        -> Result<String, CatalogError>;

    /// Record a checksum in the catalog for the replica on `resource`,
    /// replacing any previous record.
    fn record_checksum(
        &self,
        logical_path: &str,
        resource: &str,
        checksum: &str,
    ) -> Result<(), CatalogError>;

    /// Current utilization of a resource's underlying filesystem, as a
    /// percentage in `0.0..=100.0`.
    fn filesystem_usage(&self, resource: &str) -> Result<f64, CatalogError>;
}
