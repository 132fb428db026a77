//! # Data Retention
//!
//! Decides what happens to older replicas after an object is created or
//! replicated. `remove_all_replicas` unregisters the object outright.
//! `trim_single_replica` (the default) removes every replica except those
//! protected by a resource-level preserve flag or by an explicit
//! white-list; the two protections are independent do-not-remove
//! predicates combined with OR. A pass considers only the replica set
//! existing at invocation time, and never removes the last remaining
//! replica — a pass that would is refused, not silently skipped.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use tessera_catalog::{Catalog, EntityRef, ReplicaInfo};
use tessera_core::{Config, EngineError, Invocation};
use tessera_engine::PolicyHandler;

use crate::attributes;

const POLICY: &str = "data_retention";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Mode {
    RemoveAllReplicas,
    #[default]
    TrimSingleReplica,
}

#[derive(Debug, Default, Deserialize)]
struct Options {
    #[serde(default)]
    mode: Mode,
    #[serde(default = "default_attribute")]
    attribute: String,
    #[serde(default)]
    resource_white_list: Vec<String>,
}

fn default_attribute() -> String {
    attributes::PRESERVE_REPLICAS.to_string()
}

/// The retention policy handler.
pub struct DataRetention {
    catalog: Arc<dyn Catalog>,
}

impl DataRetention {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    fn is_preserved(&self, resource: &str, attribute: &str) -> Result<bool, EngineError> {
        let attrs = self
            .catalog
            .metadata(&EntityRef::Resource(resource.to_string()))?;
        Ok(attrs
            .get(attribute)
            .map(|v| v.value == "true")
            .unwrap_or(false))
    }

    fn trim(
        &self,
        path: &str,
        replicas: &[ReplicaInfo],
        options: &Options,
        keeper_hint: Option<&str>,
    ) -> Result<usize, EngineError> {
        let mut protected = Vec::new();
        let mut removable = Vec::new();
        for replica in replicas {
            let preserved = options.resource_white_list.contains(&replica.resource)
                || self.is_preserved(&replica.resource, &options.attribute)?;
            if preserved {
                protected.push(replica.resource.clone());
            } else {
                removable.push(replica.resource.clone());
            }
        }

        // With nothing protected, one replica must survive the pass: the
        // just-written destination when the context names one, otherwise
        // the newest replica in enumeration order.
        if protected.is_empty() {
            if removable.len() == 1 {
                return Err(EngineError::RetentionInvariant {
                    logical_path: path.to_string(),
                });
            }
            let keeper = keeper_hint
                .filter(|hint| removable.iter().any(|r| r == hint))
                .map(str::to_string)
                .or_else(|| removable.last().cloned());
            removable.retain(|r| Some(r) != keeper.as_ref());
        }

        for resource in &removable {
            self.catalog.remove_replica(path, resource)?;
            debug!(path, resource, "replica trimmed");
        }
        Ok(removable.len())
    }
}

impl PolicyHandler for DataRetention {
    fn invoke(&self, invocation: &Invocation, config: &Config) -> Result<String, EngineError> {
        let options: Options = config.typed(POLICY)?;
        let path = invocation
            .context
            .logical_path()
            .ok_or_else(|| EngineError::configuration(POLICY, "logical_path missing from context"))?;

        match options.mode {
            Mode::RemoveAllReplicas => {
                self.catalog.unlink(path)?;
                Ok(format!("removed every replica of [{path}]"))
            }
            Mode::TrimSingleReplica => {
                let replicas = self.catalog.replicas(path)?;
                let removed = self.trim(
                    path,
                    &replicas,
                    &options,
                    invocation.context.destination_resource(),
                )?;
                Ok(format!(
                    "trimmed {removed} of {} replicas of [{path}]",
                    replicas.len()
                ))
            }
        }
    }
}
