//! # Policy Bindings
//!
//! A binding activates a named policy for a set of event verbs, gated by
//! an optional conditional. The bindings table is supplied wholesale at
//! startup and treated as read-only by the dispatcher; insertion order is
//! the evaluation and short-circuit order.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use tessera_core::Config;

use crate::conditional::Conditional;
use crate::event::EventVerb;

/// Which side of the storage operation a binding fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    /// Before the operation commits, synchronous with it.
    Pre,
    /// After the operation commits.
    Post,
}

fn default_clauses() -> BTreeSet<Clause> {
    BTreeSet::from([Clause::Post])
}

/// One registered (conditional, policy, configuration) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// The policy this binding invokes.
    pub policy_name: String,
    /// Verbs the binding reacts to.
    pub applicable_verbs: BTreeSet<EventVerb>,
    /// Clauses the binding is active for. Defaults to post only.
    #[serde(default = "default_clauses")]
    pub active_clauses: BTreeSet<Clause>,
    /// Match predicate; absent means always match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<Conditional>,
    /// Binding-level configuration, second in resolution precedence.
    #[serde(default, skip_serializing_if = "Config::is_empty")]
    pub configuration: Config,
    /// Invocation-site parameters, first in resolution precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Config>,
    /// When true, a failure of this binding skips the rest of the dispatch.
    #[serde(default)]
    pub stop_on_error: bool,
}

impl Binding {
    /// A post-clause binding for one verb with no conditional.
    pub fn new(policy_name: impl Into<String>, verb: EventVerb) -> Self {
        Self {
            policy_name: policy_name.into(),
            applicable_verbs: BTreeSet::from([verb]),
            active_clauses: default_clauses(),
            conditional: None,
            configuration: Config::new(),
            parameters: None,
            stop_on_error: false,
        }
    }

    /// Add a verb. Builder style.
    pub fn on(mut self, verb: EventVerb) -> Self {
        self.applicable_verbs.insert(verb);
        self
    }

    /// Set the conditional. Builder style.
    pub fn when(mut self, conditional: Conditional) -> Self {
        self.conditional = Some(conditional);
        self
    }

    /// Set the binding configuration. Builder style.
    pub fn configured(mut self, configuration: Config) -> Self {
        self.configuration = configuration;
        self
    }

    /// Mark the binding stop-on-error. Builder style.
    pub fn stop_on_error(mut self) -> Self {
        self.stop_on_error = true;
        self
    }

    /// Whether this binding applies to a verb under a clause.
    pub fn applies_to(&self, verb: EventVerb, clause: Clause) -> bool {
        self.applicable_verbs.contains(&verb) && self.active_clauses.contains(&clause)
    }
}
