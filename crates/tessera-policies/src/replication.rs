//! # Data Replication
//!
//! Creates new replicas of a logical object. The destination is chosen
//! in order of preference: the context's destination resource, the
//! `destination_resource` configuration key, then the right-hand side of
//! `source_to_destination_map` keyed by the context's source resource —
//! which may name a list of resources, fanning the replication out to
//! each. The catalog's replicate call either fully registers a replica
//! or leaves the catalog unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use tessera_catalog::Catalog;
use tessera_core::{Config, EngineError, Invocation};
use tessera_engine::PolicyHandler;

const POLICY: &str = "data_replication";

/// A map value naming one destination or several.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub(crate) fn as_vec(&self) -> Vec<String> {
        match self {
            Self::One(dest) => vec![dest.clone()],
            Self::Many(dests) => dests.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Options {
    #[serde(default)]
    destination_resource: Option<String>,
    #[serde(default)]
    source_to_destination_map: Option<BTreeMap<String, OneOrMany>>,
}

/// Select replication destinations from the context and configuration.
///
/// Returns `Ok(vec![])` when a map is configured but does not name the
/// source, which callers treat as "nothing to do".
pub(crate) fn destinations(
    policy: &str,
    invocation: &Invocation,
    destination_resource: Option<&str>,
    map: Option<&BTreeMap<String, OneOrMany>>,
) -> Result<Vec<String>, EngineError> {
    if let Some(dest) = invocation.context.destination_resource() {
        return Ok(vec![dest.to_string()]);
    }
    if let Some(dest) = destination_resource {
        return Ok(vec![dest.to_string()]);
    }
    if let Some(map) = map {
        let source = invocation.context.source_resource().ok_or_else(|| {
            EngineError::configuration(
                policy,
                "source_resource required to apply source_to_destination_map",
            )
        })?;
        return Ok(map.get(source).map(OneOrMany::as_vec).unwrap_or_default());
    }
    Err(EngineError::configuration(
        policy,
        "no destination: set destination_resource or source_to_destination_map",
    ))
}

/// The replication policy handler.
pub struct DataReplication {
    catalog: Arc<dyn Catalog>,
}

impl DataReplication {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }
}

impl PolicyHandler for DataReplication {
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
        if targets.is_empty() {
            return Ok(format!(
                "source [{source}] not present in source_to_destination_map; nothing to do"
            ));
        }

        // Every target is attempted; the first failure is reported once
        // the fan-out has run its course.
        let mut first_error = None;
        for destination in &targets {
            match self.catalog.replicate(path, source, destination) {
                Ok(()) => debug!(path, source, destination, "replica created"),
                Err(err) => {
                    debug!(path, source, destination, %err, "replication failed");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(format!(
                "replicated [{path}] from [{source}] to [{}]",
                targets.join(", ")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_catalog::MemoryCatalog;
    use tessera_core::context::keys;
    use tessera_core::Context;

    fn setup() -> (Arc<MemoryCatalog>, DataReplication) {
        let catalog = Arc::new(MemoryCatalog::new());
        for r in ["r1", "r2", "r3"] {
            catalog.add_resource(r, &format!("/vault/{r}"), 1_000_000);
        }
        catalog.put_object("/zone/f.dat", "u", "r1", b"payload");
        let handler = DataReplication::new(Arc::clone(&catalog) as Arc<dyn Catalog>);
        (catalog, handler)
    }

    fn invocation(dest: Option<&str>) -> Invocation {
        let mut context = Context::new()
            .with(keys::LOGICAL_PATH, "/zone/f.dat")
            .with(keys::SOURCE_RESOURCE, "r1");
        if let Some(dest) = dest {
            context.set(keys::DESTINATION_RESOURCE, dest);
        }
        Invocation::from_context(context)
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
    fn context_destination_wins() {
        let (catalog, handler) = setup();
        let config = Config::new().with("destination_resource", "r3");
        handler.invoke(&invocation(Some("r2")), &config).unwrap();
        assert_eq!(resources_of(&catalog), vec!["r1", "r2"]);
    }

    #[test]
    fn config_destination_used_without_context_destination() {
        let (catalog, handler) = setup();
        let config = Config::new().with("destination_resource", "r3");
        handler.invoke(&invocation(None), &config).unwrap();
        assert_eq!(resources_of(&catalog), vec!["r1", "r3"]);
    }

    #[test]
    fn map_fans_out_to_multiple_destinations() {
        let (catalog, handler) = setup();
        let config = Config::new().with(
            "source_to_destination_map",
            serde_json::json!({ "r1": ["r2", "r3"] }),
        );
        let message = handler.invoke(&invocation(None), &config).unwrap();
        assert_eq!(resources_of(&catalog), vec!["r1", "r2", "r3"]);
        assert!(message.contains("r2, r3"));
    }

    #[test]
    fn unmapped_source_is_a_noop_success() {
        let (catalog, handler) = setup();
        let config = Config::new().with(
            "source_to_destination_map",
            serde_json::json!({ "other": "r2" }),
        );
        let message = handler.invoke(&invocation(None), &config).unwrap();
        assert!(message.contains("nothing to do"));
        assert_eq!(resources_of(&catalog), vec!["r1"]);
    }

    #[test]
    fn failing_target_does_not_stop_the_fan_out() {
        let (catalog, handler) = setup();
        let config = Config::new().with(
            "source_to_destination_map",
            serde_json::json!({ "r1": ["no_such_resource", "r2"] }),
        );
        let err = handler.invoke(&invocation(None), &config).unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
        assert_eq!(resources_of(&catalog), vec!["r1", "r2"]);
    }

    #[test]
    fn no_destination_anywhere_is_a_configuration_error() {
        let (_, handler) = setup();
        let err = handler.invoke(&invocation(None), &Config::new()).unwrap_err();
        assert!(matches!(err, EngineError::Configuration { .. }));
    }

    #[test]
    fn storage_failure_surfaces() {
        let (_, handler) = setup();
        let config = Config::new().with("destination_resource", "no_such_resource");
        let err = handler.invoke(&invocation(None), &config).unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
    }
}
