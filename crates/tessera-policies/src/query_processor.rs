//! # The Query-Processor Front Door
//!
//! A policy whose effective configuration *is* a query invocation: it
//! deserializes the configuration into a [`QueryInvocation`] and hands
//! it to the query-driven invoker against its own registry of target
//! policies. Nested failures do not fail the fan-out itself (unless the
//! invocation's `stop_on_error` halts it); each nested invocation is
//! resolved, run, and logged through the ordinary registry path.

use std::sync::Arc;

use tracing::debug;

use tessera_catalog::Catalog;
use tessera_core::{Config, EngineError, Invocation};
use tessera_engine::{PolicyHandler, PolicyRegistry};
use tessera_query::{substitution, QueryInvocation, QueryInvoker};

const POLICY: &str = "query_processor";

/// The query-processor policy handler.
pub struct QueryProcessor {
    invoker: QueryInvoker,
    targets: Arc<PolicyRegistry>,
}

impl QueryProcessor {
    /// A processor fanning rows out to the policies in `targets`.
    pub fn new(catalog: Arc<dyn Catalog>, targets: Arc<PolicyRegistry>) -> Self {
        Self {
            invoker: QueryInvoker::new(catalog),
            targets,
        }
    }
}

impl PolicyHandler for QueryProcessor {
    fn invoke(&self, invocation: &Invocation, config: &Config) -> Result<String, EngineError> {
        let mut query_invocation: QueryInvocation = config.typed(POLICY)?;
        // The triggering invocation seeds the template: its query row (when
        // it came from an outer fan-out) fills positional tokens, its
        // context attributes fill the named ones.
        if let Some(row) = &invocation.query_results {
            query_invocation.query_string =
                substitution::substitute_row(&query_invocation.query_string, row);
        }
        query_invocation.query_string =
            substitution::substitute_context(&query_invocation.query_string, &invocation.context);
        let results = self.invoker.run(&query_invocation, &self.targets)?;
        let failed = results.iter().filter(|r| !r.success).count();
        debug!(
            invocations = results.len(),
            failed, "query fan-out complete"
        );
        Ok(format!(
            "fan-out complete: {} invocations, {failed} failed",
            results.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_catalog::{AttributeValue, EntityRef, MemoryCatalog};
    use tessera_core::Context;
    use tessera_engine::RegisteredPolicy;

    use crate::access_time::AccessTime;
    use crate::attributes;

    fn setup() -> (Arc<MemoryCatalog>, QueryProcessor) {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_resource("r1", "/vault/r1", 1_000_000);
        catalog.put_object("/zone/a.dat", "u", "r1", b"alpha");
        catalog.put_object("/zone/b.dat", "u", "r1", b"beta");

        let mut targets = PolicyRegistry::new();
        targets.insert(
            "access_time",
            RegisteredPolicy::new(Arc::new(AccessTime::new(
                Arc::clone(&catalog) as Arc<dyn Catalog>
            ))),
        );
        let processor = QueryProcessor::new(
            Arc::clone(&catalog) as Arc<dyn Catalog>,
            Arc::new(targets),
        );
        (catalog, processor)
    }

    #[test]
    fn configuration_drives_the_fan_out() {
        let (catalog, processor) = setup();
        let config: Config = serde_json::from_value(serde_json::json!({
            "query_string": "SELECT USER_NAME, COLL_NAME, DATA_NAME, RESC_NAME WHERE RESC_NAME = 'r1'",
            "target": { "policies": [ { "policy_name": "access_time" } ] }
        }))
        .unwrap();

        let message = processor
            .invoke(&Invocation::from_context(Context::new()), &config)
            .unwrap();
        assert!(message.contains("2 invocations, 0 failed"));
        for path in ["/zone/a.dat", "/zone/b.dat"] {
            let attrs = catalog
                .metadata(&EntityRef::DataObject(path.to_string()))
                .unwrap();
            assert!(attrs.contains_key(attributes::ACCESS_TIME));
        }
    }

    #[test]
    fn default_rows_feed_the_target_when_query_is_empty() {
        let (catalog, processor) = setup();
        catalog.put_object("/c/d", "u", "r1", b"x");
        let config: Config = serde_json::from_value(serde_json::json!({
            "query_string": "SELECT USER_NAME, COLL_NAME, DATA_NAME, RESC_NAME WHERE RESC_NAME = 'no_such'",
            "query_limit": 1,
            "default_results_when_no_rows_found": [["u", "/c", "d", "r1"]],
            "target": { "policies": [ { "policy_name": "access_time" } ] }
        }))
        .unwrap();

        let message = processor
            .invoke(&Invocation::from_context(Context::new()), &config)
            .unwrap();
        assert!(message.contains("1 invocations"));
        let attrs = catalog
            .metadata(&EntityRef::DataObject("/c/d".to_string()))
            .unwrap();
        assert!(attrs.contains_key(attributes::ACCESS_TIME));
    }

    #[test]
    fn context_tokens_narrow_the_query() {
        let (catalog, processor) = setup();
        let config: Config = serde_json::from_value(serde_json::json!({
            "query_string": "SELECT USER_NAME, COLL_NAME, DATA_NAME, RESC_NAME WHERE COLL_NAME = '{COLL_NAME}' AND DATA_NAME = '{DATA_NAME}'",
            "target": { "policies": [ { "policy_name": "access_time" } ] }
        }))
        .unwrap();

        let invocation = Invocation::from_context(
            Context::new().with(tessera_core::context::keys::LOGICAL_PATH, "/zone/a.dat"),
        );
        let message = processor.invoke(&invocation, &config).unwrap();
        assert!(message.contains("1 invocations, 0 failed"));
        let attrs = catalog
            .metadata(&EntityRef::DataObject("/zone/a.dat".to_string()))
            .unwrap();
        assert!(attrs.contains_key(attributes::ACCESS_TIME));
        let attrs = catalog
            .metadata(&EntityRef::DataObject("/zone/b.dat".to_string()))
            .unwrap();
        assert!(!attrs.contains_key(attributes::ACCESS_TIME));
    }

    #[test]
    fn nested_failures_are_counted_not_fatal() {
        let (_, processor) = setup();
        // The default rows name an object that does not exist, so the
        // nested access-time invocation fails.
        let config: Config = serde_json::from_value(serde_json::json!({
            "query_string": "SELECT USER_NAME, COLL_NAME, DATA_NAME, RESC_NAME WHERE RESC_NAME = 'no_such'",
            "default_results_when_no_rows_found": [["u", "/missing", "x.dat", "r1"]],
            "target": { "policies": [ { "policy_name": "access_time" } ] }
        }))
        .unwrap();

        let message = processor
            .invoke(&Invocation::from_context(Context::new()), &config)
            .unwrap();
        assert!(message.contains("1 failed"));
    }

    #[test]
    fn malformed_configuration_is_rejected() {
        let (_, processor) = setup();
        let config = Config::new().with("query_string", 42);
        let err = processor
            .invoke(&Invocation::from_context(Context::new()), &config)
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration { .. }));
    }

    #[test]
    fn unknown_nested_policy_propagates() {
        let (_, processor) = setup();
        let config: Config = serde_json::from_value(serde_json::json!({
            "query_string": "SELECT DATA_NAME WHERE RESC_NAME = 'r1'",
            "target": { "policies": [ { "policy_name": "no_such_policy" } ] }
        }))
        .unwrap();
        let err = processor
            .invoke(&Invocation::from_context(Context::new()), &config)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownPolicy(_)));
    }
}
