//! # Invocation Contexts
//!
//! A `Context` is the attribute map an event or query row carries into a
//! policy invocation: logical path, user name, source/destination resource,
//! and any further named attributes the emitting side attached.
//!
//! An `Invocation` pairs a context with the raw query-result row when the
//! invocation was produced by query fan-out. The raw row is what positional
//! `{0}`, `{1}`, … tokens substitute from when a query chains into another
//! query.
//!
//! ## Row convention
//!
//! Query rows bind positionally as `USER_NAME`, `COLL_NAME`, `DATA_NAME`,
//! `RESC_NAME`; trailing columns are carried in the raw row only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Well-known context attribute names.
pub mod keys {
    /// The catalog-visible name of a data object or collection.
    pub const LOGICAL_PATH: &str = "logical_path";
    /// The user the operation ran as.
    pub const USER_NAME: &str = "user_name";
    /// The resource the operation read from or acted on.
    pub const SOURCE_RESOURCE: &str = "source_resource";
    /// The resource the operation wrote to.
    pub const DESTINATION_RESOURCE: &str = "destination_resource";
}

/// Named attributes describing the site of an operation.
///
/// Constructed by the storage layer at the moment an operation commits
/// (or synthesized from a query-result row) and consumed once by the
/// dispatcher. Attribute order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context(BTreeMap<String, String>);

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing any existing value. Builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Set an attribute in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up an attribute.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The `logical_path` attribute, if present.
    pub fn logical_path(&self) -> Option<&str> {
        self.get(keys::LOGICAL_PATH)
    }

    /// The `user_name` attribute, if present.
    pub fn user_name(&self) -> Option<&str> {
        self.get(keys::USER_NAME)
    }

    /// The `source_resource` attribute, if present.
    pub fn source_resource(&self) -> Option<&str> {
        self.get(keys::SOURCE_RESOURCE)
    }

    /// The `destination_resource` attribute, if present.
    pub fn destination_resource(&self) -> Option<&str> {
        self.get(keys::DESTINATION_RESOURCE)
    }

    /// Iterate attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether the context carries no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Split a logical path into `(collection, object name)`.
///
/// `/zone/home/u/f.dat` → `("/zone/home/u", "f.dat")`. A path with no
/// parent collection yields an empty collection component.
pub fn split_logical_path(logical_path: &str) -> (String, String) {
    match logical_path.rsplit_once('/') {
        Some((coll, name)) if !coll.is_empty() => (coll.to_string(), name.to_string()),
        Some((_, name)) => ("/".to_string(), name.to_string()),
        None => (String::new(), logical_path.to_string()),
    }
}

/// Join a collection and object name into a logical path.
pub fn join_logical_path(collection: &str, name: &str) -> String {
    if collection.is_empty() || collection == "/" {
        format!("/{name}")
    } else {
        format!("{}/{name}", collection.trim_end_matches('/'))
    }
}

/// One policy invocation's input: the attribute context plus, for
/// query-driven invocations, the raw result row it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Named attributes for this invocation.
    pub context: Context,
    /// The raw query-result row, when this invocation came from fan-out.
    pub query_results: Option<Vec<String>>,
}

impl Invocation {
    /// Build an invocation from an event context.
    pub fn from_context(context: Context) -> Self {
        Self {
            context,
            query_results: None,
        }
    }

    /// Build an invocation from a query-result row.
    ///
    /// Binds the conventional leading columns — user name, collection,
    /// object name, resource — into named context attributes and keeps
    /// the raw row for positional token substitution downstream.
    pub fn from_query_row(row: Vec<String>) -> Self {
        let mut context = Context::new();
        if let Some(user) = row.first() {
            if !user.is_empty() {
                context.set(keys::USER_NAME, user.clone());
            }
        }
        if let (Some(coll), Some(name)) = (row.get(1), row.get(2)) {
            if !name.is_empty() {
                context.set(keys::LOGICAL_PATH, join_logical_path(coll, name));
            } else if !coll.is_empty() {
                context.set(keys::LOGICAL_PATH, coll.clone());
            }
        }
        if let Some(resc) = row.get(3) {
            if !resc.is_empty() {
                context.set(keys::SOURCE_RESOURCE, resc.clone());
            }
        }
        Self {
            context,
            query_results: Some(row),
        }
    }
}
