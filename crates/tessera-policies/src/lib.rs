//! # tessera-policies — The Action Units
//!
//! The policy handlers the dispatch core invokes: access-time stamping,
//! replication, movement, retention, verification (strategy-selected and
//! plain checksum), filesystem-usage sampling, and the query-processor
//! front door. Each handler holds a catalog handle, deserializes its
//! effective configuration into a typed options struct, and reports a
//! success message or a taxonomy error.

use std::sync::Arc;

use tessera_catalog::Catalog;
use tessera_engine::{PolicyRegistry, RegisteredPolicy};

pub mod access_time;
pub mod attributes;
pub mod filesystem_usage;
pub mod movement;
pub mod query_processor;
pub mod replication;
pub mod retention;
pub mod verification;
pub mod verify_checksum;

pub use access_time::AccessTime;
pub use filesystem_usage::FilesystemUsage;
pub use movement::DataMovement;
pub use query_processor::QueryProcessor;
pub use replication::DataReplication;
pub use retention::DataRetention;
pub use verification::DataVerification;
pub use verify_checksum::VerifyChecksum;

/// Build a registry holding the standard policies, all bound to one
/// catalog.
///
/// The query processor fans out to a snapshot of the other standard
/// policies; query-to-query composition nests inside one invocation
/// rather than re-entering the processor.
pub fn standard_policies(catalog: Arc<dyn Catalog>) -> PolicyRegistry {
    let mut registry = PolicyRegistry::new();
    registry.insert(
        "access_time",
        RegisteredPolicy::new(Arc::new(AccessTime::new(Arc::clone(&catalog)))),
    );
    registry.insert(
        "data_replication",
        RegisteredPolicy::new(Arc::new(DataReplication::new(Arc::clone(&catalog)))),
    );
    registry.insert(
        "data_movement",
        RegisteredPolicy::new(Arc::new(DataMovement::new(Arc::clone(&catalog)))),
    );
    registry.insert(
        "data_retention",
        RegisteredPolicy::new(Arc::new(DataRetention::new(Arc::clone(&catalog)))),
    );
    registry.insert(
        "data_verification",
        RegisteredPolicy::new(Arc::new(DataVerification::new(Arc::clone(&catalog)))),
    );
    registry.insert(
        "verify_checksum",
        RegisteredPolicy::new(Arc::new(VerifyChecksum::new(Arc::clone(&catalog)))),
    );
    registry.insert(
        "filesystem_usage",
        RegisteredPolicy::new(Arc::new(FilesystemUsage::new(Arc::clone(&catalog)))),
    );

    let targets = Arc::new(registry.clone());
    registry.insert(
        "query_processor",
        RegisteredPolicy::new(Arc::new(QueryProcessor::new(catalog, targets))),
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_catalog::MemoryCatalog;

    #[test]
    fn standard_registry_holds_all_policies() {
        let registry = standard_policies(Arc::new(MemoryCatalog::new()));
        assert_eq!(registry.len(), 8);
        for name in [
            "access_time",
            "data_replication",
            "data_movement",
            "data_retention",
            "data_verification",
            "verify_checksum",
            "filesystem_usage",
            "query_processor",
        ] {
            assert!(registry.get(name).is_some(), "{name}");
        }
    }
}
