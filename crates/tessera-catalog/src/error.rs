//! # Catalog Errors
//!
//! Failures reported by the storage/catalog collaborator. The engine maps
//! these onto its own taxonomy: query parse failures become query-syntax
//! errors, everything else surfaces as a storage collaborator failure.

use thiserror::Error;

use tessera_core::EngineError;

/// Errors reported by a [`crate::Catalog`] implementation.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// No data object is registered at the logical path.
    #[error("data object not found: [{path}]")]
    ObjectNotFound {
        /// The logical path that was looked up.
        path: String,
    },

    /// The object exists but has no replica on the named resource.
    #[error("replica of [{path}] not found on resource [{resource}]")]
    ReplicaNotFound {
        /// The logical path of the object.
        path: String,
        /// The resource that holds no replica.
        resource: String,
    },

    /// No resource with the given name is registered.
    #[error("resource not found: [{name}]")]
    ResourceNotFound {
        /// The resource name that was looked up.
        name: String,
    },

    /// No collection is registered at the logical path.
    #[error("collection not found: [{path}]")]
    CollectionNotFound {
        /// The collection path that was looked up.
        path: String,
    },

    /// The query string could not be parsed against the catalog schema.
    #[error("query error: {0}")]
    Query(String),

    /// The requested mutation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Query(reason) => EngineError::QuerySyntax(reason),
            other => EngineError::Storage(other.to_string()),
        }
    }
}
