//! # The Event Dispatcher
//!
//! The engine owns the bindings table, the policy registry, a handle to
//! the storage/catalog collaborator, and the audit trail. Dispatch walks
//! the bindings in registration order, evaluates each conditional, and
//! invokes matching policies under the three-layer configuration
//! resolution. A verb with zero bindings is a no-op, never an error.

use std::sync::Arc;

use tracing::debug;

use tessera_catalog::Catalog;
use tessera_core::{Config, EngineError, Invocation};

use crate::audit::{AuditEntry, AuditEntryType, AuditTrail};
use crate::binding::{Binding, Clause};
use crate::event::Event;
use crate::registry::{InvocationResult, PolicyRegistry, RegisteredPolicy};

/// The dispatch core: bindings, registry, catalog handle, audit trail.
pub struct Engine {
    catalog: Arc<dyn Catalog>,
    registry: PolicyRegistry,
    bindings: Vec<Binding>,
    audit: AuditTrail,
}

impl Engine {
    /// An engine with no policies and no bindings.
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
            registry: PolicyRegistry::new(),
            bindings: Vec::new(),
            audit: AuditTrail::default(),
        }
    }

    /// The storage/catalog collaborator handle.
    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// The policy registry.
    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Register a policy instance under a name.
    pub fn register_policy(&mut self, name: impl Into<String>, policy: RegisteredPolicy) {
        self.registry.insert(name, policy);
    }

    /// Append a binding. Registration order is evaluation order.
    pub fn add_binding(&mut self, binding: Binding) {
        self.bindings.push(binding);
    }

    /// Replace the bindings table wholesale, as at startup.
    pub fn set_bindings(&mut self, bindings: Vec<Binding>) {
        self.bindings = bindings;
    }

    /// The registered bindings, in evaluation order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// The audit trail.
    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// Dispatch one event under a clause.
    ///
    /// Every binding whose verb, clause, and conditional match runs, in
    /// registration order, each with its own resolved configuration. A
    /// failed stop-on-error binding skips the rest of the dispatch. A
    /// malformed conditional fails its own binding only.
    pub fn dispatch(&mut self, event: &Event, clause: Clause) -> Vec<InvocationResult> {
        self.audit.append(AuditEntry::new(
            AuditEntryType::EventReceived,
            None,
            Some(serde_json::json!({
                "category": event.category,
                "verb": event.verb.as_str(),
                "clause": clause,
            })),
        ));

        let bindings = self.bindings.clone();
        let mut results = Vec::new();
        let mut halted = false;
        for binding in &bindings {
            if !binding.applies_to(event.verb, clause) {
                continue;
            }
            if halted {
                break;
            }

            if let Some(conditional) = &binding.conditional {
                match conditional.matches(&binding.policy_name, &event.context, &*self.catalog) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(err) => {
                        let result =
                            InvocationResult::failure(&binding.policy_name, err.to_string());
                        self.record(&result);
                        if binding.stop_on_error {
                            halted = true;
                            self.record_halt(&binding.policy_name);
                        }
                        results.push(result);
                        continue;
                    }
                }
            }

            let invocation = Invocation::from_context(event.context.clone());
            let result = match self.registry.invoke(
                &binding.policy_name,
                &invocation,
                binding.parameters.as_ref(),
                Some(&binding.configuration),
            ) {
                Ok(result) => result,
                Err(err) => InvocationResult::failure(&binding.policy_name, err.to_string()),
            };
            self.record(&result);
            if !result.success && binding.stop_on_error {
                halted = true;
                self.record_halt(&binding.policy_name);
            }
            results.push(result);
        }

        debug!(
            verb = event.verb.as_str(),
            invocations = results.len(),
            halted,
            "event dispatched"
        );
        results
    }

    /// The direct-invocation front door: run one policy without a prior
    /// event, with optional invocation-site parameters and an optional
    /// configuration layer sitting between them and the instance
    /// defaults, exactly as a binding's configuration would.
    pub fn invoke(
        &mut self,
        policy: &str,
        invocation: &Invocation,
        params: Option<&Config>,
        configuration: Option<&Config>,
    ) -> Result<InvocationResult, EngineError> {
        self.audit.append(AuditEntry::new(
            AuditEntryType::DirectInvocation,
            Some(policy.to_string()),
            None,
        ));
        let result = self.registry.invoke(policy, invocation, params, configuration)?;
        self.record(&result);
        Ok(result)
    }

    fn record(&mut self, result: &InvocationResult) {
        let entry_type = if result.success {
            AuditEntryType::PolicyInvoked
        } else {
            AuditEntryType::PolicyFailed
        };
        self.audit.append(AuditEntry::new(
            entry_type,
            Some(result.policy.clone()),
            Some(serde_json::json!({ "message": result.message })),
        ));
    }

    fn record_halt(&mut self, policy: &str) {
        self.audit.append(AuditEntry::new(
            AuditEntryType::DispatchHalted,
            Some(policy.to_string()),
            None,
        ));
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("policies", &self.registry.len())
            .field("bindings", &self.bindings.len())
            .field("audit_trail_size", &self.audit.len())
            .finish()
    }
}
