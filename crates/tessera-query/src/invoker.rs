//! # The Query-Driven Invoker
//!
//! Executes a query invocation: resolves the freshness window, runs the
//! query against the catalog, substitutes the fallback row set when the
//! query matches nothing, and feeds each row — in result order — into
//! the target policies or into a nested, token-substituted query.
//!
//! Row processing is sequential; `number_of_threads` is carried as an
//! advisory hint only. Every row is fully processed or not started: a
//! failure mid-fan-out stops *between* rows (when `stop_on_error` is
//! set), never inside one.

use std::sync::Arc;

use tracing::debug;

use tessera_catalog::Catalog;
use tessera_core::{EngineError, Invocation, Timestamp};
use tessera_engine::{InvocationResult, PolicyRegistry};

use crate::invocation::{Lifetime, QueryInvocation, QueryTarget};
use crate::substitution;

/// Runs query invocations against a catalog and a policy registry.
pub struct QueryInvoker {
    catalog: Arc<dyn Catalog>,
}

impl QueryInvoker {
    /// An invoker bound to a catalog.
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Run one query/fan-out cycle, recursively for nested queries.
    ///
    /// Returns every invocation result produced, in processing order.
    /// Invalid parameters, including target policy names not present in
    /// the registry anywhere in the chain, are rejected before any row
    /// is processed.
    pub fn run(
        &self,
        invocation: &QueryInvocation,
        registry: &PolicyRegistry,
    ) -> Result<Vec<InvocationResult>, EngineError> {
        validate(invocation, registry)?;

        let now = Timestamp::now();
        let cutoff = self.resolve_cutoff(invocation.lifetime.as_ref(), now)?;
        let query = substitution::substitute_time(&invocation.query_string, now, cutoff);

        let mut rows = self.catalog.query(&query, invocation.query_limit)?;
        if rows.is_empty() && !invocation.default_results_when_no_rows_found.is_empty() {
            rows = invocation.default_results_when_no_rows_found.clone();
        }
        debug!(
            query = query.as_str(),
            rows = rows.len(),
            threads = invocation.number_of_threads,
            "query fan-out"
        );

        let mut results = Vec::new();
        'rows: for row in rows {
            match &invocation.target {
                QueryTarget::Policies(policies) => {
                    let row_invocation = Invocation::from_query_row(row);
                    for policy in policies {
                        let result = registry.invoke(
                            &policy.policy_name,
                            &row_invocation,
                            policy.parameters.as_ref(),
                            policy.configuration.as_ref(),
                        )?;
                        let failed = !result.success;
                        results.push(result);
                        if failed && invocation.stop_on_error {
                            break 'rows;
                        }
                    }
                }
                QueryTarget::Query(inner) => {
                    let mut chained = (**inner).clone();
                    chained.query_string = substitution::substitute_row(&chained.query_string, &row);
                    let sub_results = self.run(&chained, registry)?;
                    let failed = sub_results.iter().any(|r| !r.success);
                    results.extend(sub_results);
                    if failed && invocation.stop_on_error {
                        break;
                    }
                }
            }
        }
        Ok(results)
    }

    fn resolve_cutoff(
        &self,
        lifetime: Option<&Lifetime>,
        now: Timestamp,
    ) -> Result<Option<Timestamp>, EngineError> {
        match lifetime {
            None => Ok(None),
            Some(Lifetime::Seconds(secs)) => Ok(Some(now.minus_secs(*secs))),
            Some(Lifetime::SubQuery(sub_query)) => {
                let rows = self.catalog.query(sub_query, 1)?;
                let scalar = rows
                    .first()
                    .and_then(|row| row.first())
                    .ok_or_else(|| {
                        EngineError::QuerySyntax(format!(
                            "lifetime sub-query returned no scalar: [{sub_query}]"
                        ))
                    })?;
                let secs = scalar.parse::<i64>().map_err(|_| {
                    EngineError::QuerySyntax(format!(
                        "lifetime sub-query result is not a number of seconds: [{scalar}]"
                    ))
                })?;
                Ok(Some(now.minus_secs(secs)))
            }
        }
    }
}

fn validate(invocation: &QueryInvocation, registry: &PolicyRegistry) -> Result<(), EngineError> {
    if invocation.query_string.trim().is_empty() {
        return Err(EngineError::QuerySyntax(
            "invalid parameters: empty query string".to_string(),
        ));
    }
    match &invocation.target {
        QueryTarget::Policies(policies) => {
            if policies.is_empty() {
                return Err(EngineError::QuerySyntax(
                    "invalid parameters: no policies to invoke".to_string(),
                ));
            }
            for policy in policies {
                if policy.policy_name.trim().is_empty() {
                    return Err(EngineError::QuerySyntax(
                        "invalid parameters: unnamed policy in target list".to_string(),
                    ));
                }
                if registry.get(&policy.policy_name).is_none() {
                    return Err(EngineError::UnknownPolicy(policy.policy_name.clone()));
                }
            }
        }
        QueryTarget::Query(inner) => validate(inner, registry)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use tessera_catalog::MemoryCatalog;
    use tessera_core::Config;
    use tessera_engine::{PolicyHandler, RegisteredPolicy};

    use crate::invocation::PolicyRef;

    struct CapturePaths {
        calls: AtomicUsize,
        paths: Mutex<Vec<String>>,
        fail: bool,
    }

    impl CapturePaths {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                paths: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    impl PolicyHandler for CapturePaths {
        fn invoke(&self, invocation: &Invocation, _: &Config) -> Result<String, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(path) = invocation.context.logical_path() {
                self.paths
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(path.to_string());
            }
            if self.fail {
                Err(EngineError::Storage("simulated failure".to_string()))
            } else {
                Ok("ok".to_string())
            }
        }
    }

    fn seeded_catalog() -> Arc<MemoryCatalog> {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_resource("r1", "/vault/r1", 1_000_000);
        catalog.put_object("/zone/home/alice/a.dat", "alice", "r1", b"alpha");
        catalog.put_object("/zone/home/alice/b.dat", "alice", "r1", b"beta");
        catalog
    }

    fn registry_with(handler: Arc<CapturePaths>) -> PolicyRegistry {
        let mut registry = PolicyRegistry::new();
        registry.insert("capture", RegisteredPolicy::new(handler));
        registry
    }

    #[test]
    fn fans_out_each_row_to_the_policy() {
        let catalog = seeded_catalog();
        let handler = CapturePaths::new(false);
        let registry = registry_with(Arc::clone(&handler));
        let invoker = QueryInvoker::new(catalog);

        let invocation = QueryInvocation::to_policy(
            "SELECT USER_NAME, COLL_NAME, DATA_NAME, RESC_NAME WHERE RESC_NAME = 'r1'",
            PolicyRef::new("capture"),
        );
        let results = invoker.run(&invocation, &registry).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        let paths = handler.paths.lock().unwrap();
        assert_eq!(
            *paths,
            vec![
                "/zone/home/alice/a.dat".to_string(),
                "/zone/home/alice/b.dat".to_string()
            ]
        );
    }

    #[test]
    fn zero_rows_with_defaults_feeds_synthetic_row() {
        let catalog = seeded_catalog();
        let handler = CapturePaths::new(false);
        let registry = registry_with(Arc::clone(&handler));
        let invoker = QueryInvoker::new(catalog);

        let invocation = QueryInvocation::to_policy(
            "SELECT USER_NAME, COLL_NAME, DATA_NAME, RESC_NAME WHERE RESC_NAME = 'no_such'",
            PolicyRef::new("capture"),
        )
        .with_limit(1)
        .with_default_results(vec![vec![
            "u".to_string(),
            "/c".to_string(),
            "d".to_string(),
            "R1".to_string(),
        ]]);

        let results = invoker.run(&invocation, &registry).unwrap();
        assert_eq!(results.len(), 1);
        let paths = handler.paths.lock().unwrap();
        assert_eq!(*paths, vec!["/c/d".to_string()]);
    }

    #[test]
    fn zero_rows_without_defaults_is_empty_success() {
        let catalog = seeded_catalog();
        let handler = CapturePaths::new(false);
        let registry = registry_with(Arc::clone(&handler));
        let invoker = QueryInvoker::new(catalog);

        let invocation = QueryInvocation::to_policy(
            "SELECT DATA_NAME WHERE RESC_NAME = 'no_such'",
            PolicyRef::new("capture"),
        );
        let results = invoker.run(&invocation, &registry).unwrap();
        assert!(results.is_empty());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stop_on_error_halts_remaining_rows() {
        let catalog = seeded_catalog();
        let handler = CapturePaths::new(true);
        let registry = registry_with(Arc::clone(&handler));
        let invoker = QueryInvoker::new(catalog);

        let invocation = QueryInvocation::to_policy(
            "SELECT USER_NAME, COLL_NAME, DATA_NAME, RESC_NAME WHERE RESC_NAME = 'r1'",
            PolicyRef::new("capture"),
        )
        .stop_on_error();
        let results = invoker.run(&invocation, &registry).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_rows_without_stop_on_error_all_run() {
        let catalog = seeded_catalog();
        let handler = CapturePaths::new(true);
        let registry = registry_with(Arc::clone(&handler));
        let invoker = QueryInvoker::new(catalog);

        let invocation = QueryInvocation::to_policy(
            "SELECT USER_NAME, COLL_NAME, DATA_NAME, RESC_NAME WHERE RESC_NAME = 'r1'",
            PolicyRef::new("capture"),
        );
        let results = invoker.run(&invocation, &registry).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.success));
    }

    #[test]
    fn query_chains_into_nested_query() {
        let catalog = seeded_catalog();
        let handler = CapturePaths::new(false);
        let registry = registry_with(Arc::clone(&handler));
        let invoker = QueryInvoker::new(catalog);

        // Outer rows are (coll, name); the inner query re-selects the full
        // conventional row for that one object.
        let inner = QueryInvocation::to_policy(
            "SELECT USER_NAME, COLL_NAME, DATA_NAME, RESC_NAME WHERE COLL_NAME = '{0}' AND DATA_NAME = '{1}'",
            PolicyRef::new("capture"),
        );
        let outer = QueryInvocation::to_query(
            "SELECT COLL_NAME, DATA_NAME WHERE RESC_NAME = 'r1'",
            inner,
        );

        let results = invoker.run(&outer, &registry).unwrap();
        assert_eq!(results.len(), 2);
        let paths = handler.paths.lock().unwrap();
        assert_eq!(
            *paths,
            vec![
                "/zone/home/alice/a.dat".to_string(),
                "/zone/home/alice/b.dat".to_string()
            ]
        );
    }

    #[test]
    fn lifetime_subquery_resolves_cutoff() {
        let catalog = seeded_catalog();
        catalog
            .set_metadata(
                &tessera_catalog::EntityRef::Collection("/zone".to_string()),
                "lifecycle::window_seconds",
                &tessera_catalog::AttributeValue::new("3600"),
            )
            .unwrap();
        // Stamp both objects far in the past so they fall outside any
        // plausible "now - 3600" cutoff.
        for path in ["/zone/home/alice/a.dat", "/zone/home/alice/b.dat"] {
            catalog
                .set_metadata(
                    &tessera_catalog::EntityRef::DataObject(path.to_string()),
                    "lifecycle::access_time",
                    &tessera_catalog::AttributeValue::new("1000"),
                )
                .unwrap();
        }

        let handler = CapturePaths::new(false);
        let registry = registry_with(Arc::clone(&handler));
        let invoker = QueryInvoker::new(catalog);

        let invocation = QueryInvocation::to_policy(
            "SELECT USER_NAME, COLL_NAME, DATA_NAME, RESC_NAME WHERE META_DATA_ATTR_NAME = 'lifecycle::access_time' AND META_DATA_ATTR_VALUE <= '{LIFETIME}'",
            PolicyRef::new("capture"),
        )
        .with_lifetime(Lifetime::SubQuery(
            "SELECT META_COLL_ATTR_VALUE WHERE COLL_NAME = '/zone' AND META_COLL_ATTR_NAME = 'lifecycle::window_seconds'"
                .to_string(),
        ));

        let results = invoker.run(&invocation, &registry).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn invalid_parameters_rejected_before_dispatch() {
        let catalog = seeded_catalog();
        let handler = CapturePaths::new(false);
        let registry = registry_with(Arc::clone(&handler));
        let invoker = QueryInvoker::new(catalog);

        let invocation = QueryInvocation {
            query_string: "  ".to_string(),
            query_limit: 0,
            number_of_threads: 1,
            lifetime: None,
            default_results_when_no_rows_found: Vec::new(),
            stop_on_error: false,
            target: QueryTarget::Policies(vec![PolicyRef::new("capture")]),
        };
        let err = invoker.run(&invocation, &registry).unwrap_err();
        assert!(matches!(err, EngineError::QuerySyntax(_)));
        assert!(err.to_string().contains("invalid parameters"));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_target_policy_is_rejected() {
        let catalog = seeded_catalog();
        let registry = PolicyRegistry::new();
        let invoker = QueryInvoker::new(catalog);

        let invocation = QueryInvocation::to_policy(
            "SELECT USER_NAME, COLL_NAME, DATA_NAME, RESC_NAME WHERE RESC_NAME = 'r1'",
            PolicyRef::new("missing"),
        );
        let err = invoker.run(&invocation, &registry).unwrap_err();
        assert!(matches!(err, EngineError::UnknownPolicy(_)));
    }

    #[test]
    fn unknown_policy_in_target_list_rejects_before_any_row() {
        let catalog = seeded_catalog();
        let handler = CapturePaths::new(false);
        let registry = registry_with(Arc::clone(&handler));
        let invoker = QueryInvoker::new(catalog);

        // Two matching rows; the registered policy must not run for the
        // first row before the unknown name is caught.
        let invocation = QueryInvocation {
            query_string:
                "SELECT USER_NAME, COLL_NAME, DATA_NAME, RESC_NAME WHERE RESC_NAME = 'r1'"
                    .to_string(),
            query_limit: 0,
            number_of_threads: 1,
            lifetime: None,
            default_results_when_no_rows_found: Vec::new(),
            stop_on_error: false,
            target: QueryTarget::Policies(vec![
                PolicyRef::new("capture"),
                PolicyRef::new("missing"),
            ]),
        };
        let err = invoker.run(&invocation, &registry).unwrap_err();
        assert!(matches!(err, EngineError::UnknownPolicy(_)));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_policy_in_nested_query_rejects_up_front() {
        let catalog = seeded_catalog();
        let handler = CapturePaths::new(false);
        let registry = registry_with(Arc::clone(&handler));
        let invoker = QueryInvoker::new(catalog);

        let inner = QueryInvocation::to_policy(
            "SELECT RESC_NAME WHERE COLL_NAME = '{0}' AND DATA_NAME = '{1}'",
            PolicyRef::new("missing"),
        );
        let outer = QueryInvocation::to_query(
            "SELECT COLL_NAME, DATA_NAME WHERE RESC_NAME = 'r1'",
            inner,
        );
        let err = invoker.run(&outer, &registry).unwrap_err();
        assert!(matches!(err, EngineError::UnknownPolicy(_)));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }
}
