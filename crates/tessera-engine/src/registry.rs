//! # The Policy Registry
//!
//! Maps a policy name to its executable handler, its instance defaults,
//! and its error-logging preference. Every invocation path — event
//! dispatch, direct invocation, query fan-out, scheduled re-submission —
//! funnels through [`PolicyRegistry::invoke`], which performs the
//! three-layer configuration resolution and normalizes handler errors
//! into a success/failure result.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use tessera_core::{config, Config, EngineError, Invocation};

/// An executable policy.
///
/// Handlers receive the invocation context and the already-resolved
/// effective configuration. `Ok` carries a human-readable success
/// message; `Err` is the failure, including expected outcomes such as
/// verification mismatches.
pub trait PolicyHandler: Send + Sync {
    fn invoke(&self, invocation: &Invocation, config: &Config) -> Result<String, EngineError>;
}

/// A policy instance: handler plus per-instance settings.
#[derive(Clone)]
pub struct RegisteredPolicy {
    /// The executable handler.
    pub handler: Arc<dyn PolicyHandler>,
    /// Instance defaults, lowest in resolution precedence.
    pub defaults: Config,
    /// Whether failures of this instance are logged.
    pub log_errors: bool,
}

impl RegisteredPolicy {
    /// An instance with empty defaults and silent failures.
    pub fn new(handler: Arc<dyn PolicyHandler>) -> Self {
        Self {
            handler,
            defaults: Config::new(),
            log_errors: false,
        }
    }

    /// Set instance defaults. Builder style.
    pub fn with_defaults(mut self, defaults: Config) -> Self {
        self.defaults = defaults;
        self
    }

    /// Enable failure logging. Builder style.
    pub fn with_log_errors(mut self) -> Self {
        self.log_errors = true;
        self
    }
}

/// The outcome of one policy invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    /// The policy that ran.
    pub policy: String,
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Human-readable outcome message.
    pub message: String,
}

impl InvocationResult {
    /// A successful outcome.
    pub fn success(policy: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
            success: true,
            message: message.into(),
        }
    }

    /// A failed outcome.
    pub fn failure(policy: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
            success: false,
            message: message.into(),
        }
    }
}

/// Registered policies, keyed by name.
#[derive(Clone, Default)]
pub struct PolicyRegistry {
    policies: BTreeMap<String, RegisteredPolicy>,
}

impl PolicyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a policy instance. Replaces any instance of the same name.
    pub fn insert(&mut self, name: impl Into<String>, policy: RegisteredPolicy) {
        self.policies.insert(name.into(), policy);
    }

    /// Look up a policy instance.
    pub fn get(&self, name: &str) -> Option<&RegisteredPolicy> {
        self.policies.get(name)
    }

    /// Registered policy names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    /// Number of registered policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether no policies are registered.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Resolve configuration and run a policy.
    ///
    /// An unknown policy name is an error; a handler failure is a normal
    /// failed result, logged only when the instance enabled `log_errors`.
    pub fn invoke(
        &self,
        name: &str,
        invocation: &Invocation,
        params: Option<&Config>,
        binding_config: Option<&Config>,
    ) -> Result<InvocationResult, EngineError> {
        let instance = self
            .policies
            .get(name)
            .ok_or_else(|| EngineError::UnknownPolicy(name.to_string()))?;

        let effective = config::resolve(params, binding_config, &instance.defaults);
        match instance.handler.invoke(invocation, &effective) {
            Ok(message) => Ok(InvocationResult::success(name, message)),
            Err(err) => {
                if instance.log_errors {
                    error!(policy = name, error = %err, "policy invocation failed");
                }
                Ok(InvocationResult::failure(name, err.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyRegistry")
            .field("policies", &self.policies.keys().collect::<Vec<_>>())
            .finish()
    }
}
