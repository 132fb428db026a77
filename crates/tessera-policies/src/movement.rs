//! # Data Movement
//!
//! Moves a logical object's replica from a source resource to a
//! destination: ensure the destination replica exists (replicating if
//! needed), confirm it is registered, then remove the source replica.
//! The destination is chosen the same way replication chooses one; a
//! source absent from a configured `source_to_destination_map` is a
//! no-op success. The operation fails before removing anything if the
//! destination replica would not exist post-operation.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use tessera_catalog::Catalog;
use tessera_core::{Config, EngineError, Invocation};
use tessera_engine::PolicyHandler;

use crate::replication::{destinations, OneOrMany};
use crate::verification::locate_replica;

const POLICY: &str = "data_movement";

#[derive(Debug, Default, Deserialize)]
struct Options {
    #[serde(default)]
    destination_resource: Option<String>,
    #[serde(default)]
    source_to_destination_map: Option<BTreeMap<String, OneOrMany>>,
}

/// The movement policy handler.
pub struct DataMovement {
    catalog: Arc<dyn Catalog>,
}

impl DataMovement {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }
}

impl PolicyHandler for DataMovement {
    fn invoke(&self, invocation: &Invocation, config: &Config) -> Result<String, EngineError> {
        let options: Options = config.typed(POLICY)?;
        let path = invocation
            .context
            .logical_path()
            .ok_or_else(|| EngineError::configuration(POLICY, "logical_path missing from context"))?;
        let source = invocation
            .context
            .source_resource()
            .ok_or_else(|| EngineError::configuration(POLICY, "source_resource missing from context"))?;

        let targets = destinations(
            POLICY,
            invocation,
            options.destination_resource.as_deref(),
            options.source_to_destination_map.as_ref(),
        )?;
        let Some(destination) = targets.first() else {
            return Ok(format!(
                "source [{source}] not present in source_to_destination_map; nothing to do"
            ));
        };
        if destination == source {
            return Ok(format!("replica of [{path}] already on [{destination}]"));
        }

        let replicas = self.catalog.replicas(path)?;
        if !replicas.iter().any(|r| r.resource == *destination) {
            self.catalog.replicate(path, source, destination)?;
        }
        // Confirm registration before trimming the source.
        let replicas = self.catalog.replicas(path)?;
        locate_replica(&replicas, path, destination)?;

        if replicas.iter().any(|r| r.resource == *source) {
            self.catalog.remove_replica(path, source)?;
        }
        debug!(path, source, destination, "replica moved");
        Ok(format!(
            "moved replica of [{path}] from [{source}] to [{destination}]"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_catalog::MemoryCatalog;
    use tessera_core::context::keys;
    use tessera_core::Context;

    fn setup() -> (Arc<MemoryCatalog>, DataMovement) {
        let catalog = Arc::new(MemoryCatalog::new());
        for r in ["r1", "r2"] {
            catalog.add_resource(r, &format!("/vault/{r}"), 1_000_000);
        }
        catalog.put_object("/zone/f.dat", "u", "r1", b"payload");
        let handler = DataMovement::new(Arc::clone(&catalog) as Arc<dyn Catalog>);
        (catalog, handler)
    }

    fn invocation() -> Invocation {
        Invocation::from_context(
            Context::new()
                .with(keys::LOGICAL_PATH, "/zone/f.dat")
                .with(keys::SOURCE_RESOURCE, "r1"),
        )
    }

    fn resources_of(catalog: &MemoryCatalog) -> Vec<String> {
        catalog
            .replicas("/zone/f.dat")
            .unwrap()
            .into_iter()
            .map(|r| r.resource)
            .collect()
    }

    #[test]
    fn moves_replica_to_mapped_destination() {
        let (catalog, handler) = setup();
        let config = Config::new().with(
            "source_to_destination_map",
            serde_json::json!({ "r1": "r2" }),
        );
        handler.invoke(&invocation(), &config).unwrap();
        assert_eq!(resources_of(&catalog), vec!["r2"]);
    }

    #[test]
    fn existing_destination_replica_is_reused() {
        let (catalog, handler) = setup();
        catalog.replicate("/zone/f.dat", "r1", "r2").unwrap();
        let config = Config::new().with("destination_resource", "r2");
        handler.invoke(&invocation(), &config).unwrap();
        assert_eq!(resources_of(&catalog), vec!["r2"]);
    }

    #[test]
    fn unmapped_source_is_a_noop_success() {
        let (catalog, handler) = setup();
        let config = Config::new().with(
            "source_to_destination_map",
            serde_json::json!({ "other": "r2" }),
        );
        let message = handler.invoke(&invocation(), &config).unwrap();
        assert!(message.contains("nothing to do"));
        assert_eq!(resources_of(&catalog), vec!["r1"]);
    }

    #[test]
    fn unknown_destination_fails_before_removal() {
        let (catalog, handler) = setup();
        let config = Config::new().with("destination_resource", "no_such_resource");
        assert!(handler.invoke(&invocation(), &config).is_err());
        assert_eq!(resources_of(&catalog), vec!["r1"]);
    }

    #[test]
    fn destination_equal_to_source_is_a_noop() {
        let (catalog, handler) = setup();
        let config = Config::new().with("destination_resource", "r1");
        let message = handler.invoke(&invocation(), &config).unwrap();
        assert!(message.contains("already on"));
        assert_eq!(resources_of(&catalog), vec!["r1"]);
    }
}
