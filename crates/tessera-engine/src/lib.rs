//! # tessera-engine — Event Dispatch and Policy Invocation
//!
//! The dispatch core of Tessera: storage events are matched against an
//! ordered bindings table, each matching binding's conditional is
//! evaluated against the event context, configuration is resolved across
//! the three layers, and the named policy handler runs. Policies may also
//! be invoked directly through the engine's front door, without a prior
//! event.
//!
//! The crate defines the seams the rest of the workspace plugs into:
//! [`PolicyHandler`] for action units and the bindings/registry types the
//! startup configuration populates.

pub mod audit;
pub mod binding;
pub mod conditional;
pub mod engine;
pub mod event;
pub mod registry;

pub use audit::{AuditEntry, AuditEntryType, AuditTrail};
pub use binding::{Binding, Clause};
pub use conditional::{Conditional, EntityKind, MetadataPredicate};
pub use engine::Engine;
pub use event::{Event, EventCategory, EventVerb};
pub use registry::{InvocationResult, PolicyHandler, PolicyRegistry, RegisteredPolicy};
