//! # Data Verification
//!
//! Compares a newly created replica against the object's authoritative
//! state. The strategy is selected by a metadata attribute on the
//! destination resource (name overridable via `attribute`):
//!
//! - `catalog` — the destination's catalog record (size, checksum)
//!   matches the source replica's record;
//! - `filesystem` — the destination's physical size matches its catalog
//!   record;
//! - `checksum` — the destination's recomputed checksum matches its
//!   catalog record; a never-checksummed replica gets the recomputed
//!   value recorded instead.
//!
//! A mismatch, or a destination replica that cannot be located, is a
//! reported failure, never a crash. A destination resource with no
//! strategy attribute is a no-op success.

use std::sync::Arc;

use serde::Deserialize;

use tessera_catalog::{Catalog, EntityRef, ReplicaInfo};
use tessera_core::{Config, EngineError, Invocation};
use tessera_engine::PolicyHandler;

use crate::attributes;

const POLICY: &str = "data_verification";

#[derive(Debug, Deserialize)]
struct Options {
    #[serde(default = "default_attribute")]
    attribute: String,
    #[serde(default)]
    destination_resource: Option<String>,
}

fn default_attribute() -> String {
    attributes::VERIFICATION_TYPE.to_string()
}

/// The verification policy handler.
pub struct DataVerification {
    catalog: Arc<dyn Catalog>,
}

impl DataVerification {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }
}

/// Locate one replica of `path` on `resource`, as a verification failure
/// when absent.
pub(crate) fn locate_replica(
    replicas: &[ReplicaInfo],
    path: &str,
    resource: &str,
) -> Result<ReplicaInfo, EngineError> {
    replicas
        .iter()
        .find(|r| r.resource == resource)
        .cloned()
        .ok_or_else(|| {
            EngineError::VerificationMismatch(format!(
                "no replica of [{path}] on destination [{resource}]"
            ))
        })
}

impl PolicyHandler for DataVerification {
    fn invoke(&self, invocation: &Invocation, config: &Config) -> Result<String, EngineError> {
        let options: Options = config.typed(POLICY)?;
        let path = invocation
            .context
            .logical_path()
            .ok_or_else(|| EngineError::configuration(POLICY, "logical_path missing from context"))?;
        let destination = invocation
            .context
            .destination_resource()
            .map(str::to_string)
            .or(options.destination_resource)
            .ok_or_else(|| {
                EngineError::configuration(POLICY, "destination_resource missing from context")
            })?;

        let resource_attrs = self
            .catalog
            .metadata(&EntityRef::Resource(destination.clone()))?;
        let Some(strategy) = resource_attrs.get(&options.attribute) else {
            return Ok(format!(
                "no verification strategy configured on [{destination}]; nothing to do"
            ));
        };

        let replicas = self.catalog.replicas(path)?;
        let dest_replica = locate_replica(&replicas, path, &destination)?;

        match strategy.value.as_str() {
            "catalog" => {
                let source = invocation.context.source_resource().ok_or_else(|| {
                    EngineError::configuration(POLICY, "source_resource missing from context")
                })?;
                let source_replica = locate_replica(&replicas, path, source)?;
                if dest_replica.size != source_replica.size
                    || dest_replica.checksum != source_replica.checksum
                {
                    return Err(EngineError::VerificationMismatch(format!(
                        "catalog records for [{path}] differ between [{source}] and [{destination}]"
                    )));
                }
                Ok(format!("catalog verification passed for [{path}] on [{destination}]"))
            }
            "filesystem" => {
                let physical = self.catalog.physical_size(path, &destination)?;
                if physical != dest_replica.size {
                    return Err(EngineError::VerificationMismatch(format!(
                        "physical size {physical} of [{path}] on [{destination}] does not match catalog size {}",
                        dest_replica.size
                    )));
                }
                Ok(format!(
                    "filesystem verification passed for [{path}] on [{destination}]"
                ))
            }
            "checksum" => {
                let recomputed = self.catalog.compute_checksum(path, &destination)?;
                match dest_replica.checksum {
                    Some(recorded) => {
                        if recomputed != recorded {
                            return Err(EngineError::VerificationMismatch(format!(
                                "checksum of [{path}] on [{destination}] diverged from catalog record"
                            )));
                        }
                        Ok(format!(
                            "checksum verification passed for [{path}] on [{destination}]"
                        ))
                    }
                    None => {
                        // A never-checksummed replica gets its first record
                        // instead of a mismatch.
                        self.catalog.record_checksum(path, &destination, &recomputed)?;
                        Ok(format!(
                            "checksum computed and recorded for [{path}] on [{destination}]"
                        ))
                    }
                }
            }
            other => Err(EngineError::configuration(
                POLICY,
                format!("unknown verification strategy [{other}]"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_catalog::{AttributeValue, MemoryCatalog};
    use tessera_core::context::keys;
    use tessera_core::Context;

    fn setup(strategy: Option<&str>) -> (Arc<MemoryCatalog>, DataVerification) {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_resource("r1", "/vault/r1", 1_000_000);
        catalog.add_resource("r2", "/vault/r2", 1_000_000);
        catalog.put_object("/zone/f.dat", "u", "r1", b"payload");
        catalog.replicate("/zone/f.dat", "r1", "r2").unwrap();
        if let Some(strategy) = strategy {
            catalog
                .set_metadata(
                    &EntityRef::Resource("r2".to_string()),
                    attributes::VERIFICATION_TYPE,
                    &AttributeValue::new(strategy),
                )
                .unwrap();
        }
        let handler = DataVerification::new(Arc::clone(&catalog) as Arc<dyn Catalog>);
        (catalog, handler)
    }

    fn invocation() -> Invocation {
        Invocation::from_context(
            Context::new()
                .with(keys::LOGICAL_PATH, "/zone/f.dat")
                .with(keys::SOURCE_RESOURCE, "r1")
                .with(keys::DESTINATION_RESOURCE, "r2"),
        )
    }

    #[test]
    fn absent_strategy_attribute_is_a_noop_success() {
        let (_, handler) = setup(None);
        let message = handler.invoke(&invocation(), &Config::new()).unwrap();
        assert!(message.contains("nothing to do"));
    }

    #[test]
    fn catalog_strategy_passes_for_identical_records() {
        let (_, handler) = setup(Some("catalog"));
        let message = handler.invoke(&invocation(), &Config::new()).unwrap();
        assert!(message.contains("catalog verification passed"));
    }

    #[test]
    fn filesystem_strategy_detects_divergence() {
        let (catalog, handler) = setup(Some("filesystem"));
        assert!(handler.invoke(&invocation(), &Config::new()).is_ok());
        catalog.corrupt_replica("/zone/f.dat", "r2");
        let err = handler.invoke(&invocation(), &Config::new()).unwrap_err();
        assert!(matches!(err, EngineError::VerificationMismatch(_)));
    }

    #[test]
    fn checksum_strategy_detects_divergence() {
        let (catalog, handler) = setup(Some("checksum"));
        assert!(handler.invoke(&invocation(), &Config::new()).is_ok());
        catalog.corrupt_replica("/zone/f.dat", "r2");
        let err = handler.invoke(&invocation(), &Config::new()).unwrap_err();
        assert!(matches!(err, EngineError::VerificationMismatch(_)));
    }

    #[test]
    fn never_checksummed_replica_gets_a_record() {
        let (catalog, handler) = setup(Some("checksum"));
        catalog.clear_checksum("/zone/f.dat", "r2");
        let message = handler.invoke(&invocation(), &Config::new()).unwrap();
        assert!(message.contains("computed and recorded"));
        let replicas = catalog.replicas("/zone/f.dat").unwrap();
        let dest = replicas.iter().find(|r| r.resource == "r2").unwrap();
        assert!(dest.checksum.is_some());
    }

    #[test]
    fn missing_destination_replica_is_a_mismatch() {
        let (catalog, handler) = setup(Some("checksum"));
        catalog.remove_replica("/zone/f.dat", "r2").unwrap();
        let err = handler.invoke(&invocation(), &Config::new()).unwrap_err();
        assert!(matches!(err, EngineError::VerificationMismatch(_)));
    }

    #[test]
    fn unknown_strategy_is_a_configuration_error() {
        let (_, handler) = setup(Some("telepathy"));
        let err = handler.invoke(&invocation(), &Config::new()).unwrap_err();
        assert!(matches!(err, EngineError::Configuration { .. }));
    }
}
