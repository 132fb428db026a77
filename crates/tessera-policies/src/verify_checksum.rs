//! # Checksum Verification
//!
//! Recomputes a replica's checksum from physical storage and compares it
//! with a known-good value: the `known_checksum` configuration key when
//! supplied, otherwise the checksum recorded in the catalog for that
//! replica. A mismatch is a reported failure; a replica with no recorded
//! checksum has nothing to compare and passes.

use std::sync::Arc;

use serde::Deserialize;

use tessera_catalog::Catalog;
use tessera_core::{Config, EngineError, Invocation};
use tessera_engine::PolicyHandler;

use crate::verification::locate_replica;

const POLICY: &str = "verify_checksum";

#[derive(Debug, Default, Deserialize)]
struct Options {
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    known_checksum: Option<String>,
}

/// The checksum-verification policy handler.
pub struct VerifyChecksum {
    catalog: Arc<dyn Catalog>,
}

impl VerifyChecksum {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }
}

impl PolicyHandler for VerifyChecksum {
    fn invoke(&self, invocation: &Invocation, config: &Config) -> Result<String, EngineError> {
        let options: Options = config.typed(POLICY)?;
        let path = invocation
            .context
            .logical_path()
            .ok_or_else(|| EngineError::configuration(POLICY, "logical_path missing from context"))?;
        let resource = options
            .resource
            .or_else(|| invocation.context.source_resource().map(str::to_string))
            .ok_or_else(|| EngineError::configuration(POLICY, "no resource to verify against"))?;

        let expected = match options.known_checksum {
            Some(known) => known,
            None => {
                let replicas = self.catalog.replicas(path)?;
                match locate_replica(&replicas, path, &resource)?.checksum {
                    Some(recorded) => recorded,
                    None => {
                        return Ok(format!(
                            "no recorded checksum for [{path}] on [{resource}]; nothing to compare"
                        ));
                    }
                }
            }
        };

        let recomputed = self.catalog.compute_checksum(path, &resource)?;
        if recomputed != expected {
            return Err(EngineError::VerificationMismatch(format!(
                "checksum of [{path}] on [{resource}] is [{recomputed}], expected [{expected}]"
            )));
        }
        Ok(format!("checksum verified for [{path}] on [{resource}]"))
    }
}
