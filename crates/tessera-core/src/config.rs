//! # Configuration Maps and the Three-Layer Resolver
//!
//! Every policy invocation runs against one *effective configuration*,
//! merged from up to three layers with strict precedence:
//!
//! 1. parameters/configuration supplied at direct invocation (highest),
//! 2. the binding's configuration,
//! 3. the policy instance's own defaults (lowest).
//!
//! A key present at a higher-priority layer always wins; absent keys fall
//! through. Resolution is a pure function and recomputed on every
//! invocation.
//!
//! `Config` is an ordered JSON object. Policies do not read it ad hoc:
//! each deserializes the effective configuration into its own typed
//! options struct via [`Config::typed`], turning unrecognized value types
//! into reportable configuration errors.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EngineError;

/// An ordered, string-keyed configuration map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config(Map<String, Value>);

impl Config {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key, replacing any existing value. Builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Set a key in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a raw value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Whether the map holds no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Deserialize the configuration into a typed options struct.
    ///
    /// Unknown keys are ignored (configurations are shared across the
    /// policies of a composed invocation); a recognized key with an
    /// invalid type is a configuration error naming the policy.
    pub fn typed<T: DeserializeOwned>(&self, policy: &str) -> Result<T, EngineError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| EngineError::configuration(policy, e.to_string()))
    }
}

impl From<Map<String, Value>> for Config {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Merge configuration layers into one effective configuration.
///
/// Precedence, highest first: `invocation` > `binding` > `defaults`.
/// Pure and deterministic; resolving the resolved output with the same
/// inputs yields the same map.
pub fn resolve(invocation: Option<&Config>, binding: Option<&Config>, defaults: &Config) -> Config {
    let mut merged = defaults.0.clone();
    if let Some(binding) = binding {
        for (k, v) in &binding.0 {
            merged.insert(k.clone(), v.clone());
        }
    }
    if let Some(invocation) = invocation {
        for (k, v) in &invocation.0 {
            merged.insert(k.clone(), v.clone());
        }
    }
    Config(merged)
}
