//! # Query Invocation Shapes
//!
//! The declarative description of one query/fan-out cycle: the query
//! string with its substitution tokens, row limit, freshness window, a
//! fallback row set, and the target each result row feeds — either a
//! list of policies or a nested query, recursively.

use serde::{Deserialize, Serialize};

use tessera_core::Config;

/// A freshness window applied to the query before it runs.
///
/// The window resolves to a cutoff timestamp (now minus the window) that
/// replaces the `{LIFETIME}` token in the query string, selecting only
/// rows whose timestamp attribute is older than the cutoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// A fixed window, in seconds.
    Seconds(i64),
    /// A sub-query executed once; its scalar result is the window in
    /// seconds.
    SubQuery(String),
}

/// A named policy with optional invocation-site layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyRef {
    /// The policy to invoke for each row.
    pub policy_name: String,
    /// Invocation-site parameters, first in resolution precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Config>,
    /// Configuration layer, second in resolution precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Config>,
}

impl PolicyRef {
    /// A reference with no extra configuration layers.
    pub fn new(policy_name: impl Into<String>) -> Self {
        Self {
            policy_name: policy_name.into(),
            parameters: None,
            configuration: None,
        }
    }

    /// Set invocation parameters. Builder style.
    pub fn with_parameters(mut self, parameters: Config) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// What each result row feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryTarget {
    /// Invoke these policies, in list order, once per row.
    Policies(Vec<PolicyRef>),
    /// Substitute the row into this query and run it in turn.
    Query(Box<QueryInvocation>),
}

/// One query/fan-out cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryInvocation {
    /// The query template, with `{0}`, `{1}`, … positional tokens and the
    /// named `{CURRENT_TIME}`/`{LIFETIME}` tokens.
    pub query_string: String,
    /// Maximum rows to process; zero means unlimited.
    #[serde(default)]
    pub query_limit: u32,
    /// Advisory parallelism hint; row processing may be sequential.
    #[serde(default = "default_threads")]
    pub number_of_threads: u32,
    /// Freshness window resolved before the query runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<Lifetime>,
    /// Literal rows used when the query matches nothing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_results_when_no_rows_found: Vec<Vec<String>>,
    /// When true, the first failed invocation stops the fan-out.
    #[serde(default)]
    pub stop_on_error: bool,
    /// What each row feeds.
    pub target: QueryTarget,
}

fn default_threads() -> u32 {
    1
}

impl QueryInvocation {
    /// A single-threaded, unlimited invocation feeding one policy.
    pub fn to_policy(query_string: impl Into<String>, policy: PolicyRef) -> Self {
        Self {
            query_string: query_string.into(),
            query_limit: 0,
            number_of_threads: 1,
            lifetime: None,
            default_results_when_no_rows_found: Vec::new(),
            stop_on_error: false,
            target: QueryTarget::Policies(vec![policy]),
        }
    }

    /// An invocation chaining into a nested query.
    pub fn to_query(query_string: impl Into<String>, inner: QueryInvocation) -> Self {
        Self {
            query_string: query_string.into(),
            query_limit: 0,
            number_of_threads: 1,
            lifetime: None,
            default_results_when_no_rows_found: Vec::new(),
            stop_on_error: false,
            target: QueryTarget::Query(Box::new(inner)),
        }
    }

    /// Set the row limit. Builder style.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.query_limit = limit;
        self
    }

    /// Set the freshness window. Builder style.
    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Set the fallback rows. Builder style.
    pub fn with_default_results(mut self, rows: Vec<Vec<String>>) -> Self {
        self.default_results_when_no_rows_found = rows;
        self
    }

    /// Mark the invocation stop-on-error. Builder style.
    pub fn stop_on_error(mut self) -> Self {
        self.stop_on_error = true;
        self
    }
}
