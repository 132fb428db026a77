//! # tessera-query — Query-Driven Policy Invocation
//!
//! Turns a declarative [`QueryInvocation`] into policy work: the query
//! runs against the catalog, and every result row (up to the limit)
//! re-enters policy invocation — either directly against a list of
//! policies or through a nested query whose template is token-substituted
//! from the outer row. A `lifetime` freshness window, resolvable from a
//! sub-query, narrows the outer query to rows older than a computed
//! cutoff.

pub mod invocation;
pub mod invoker;
pub mod substitution;

pub use invocation::{Lifetime, PolicyRef, QueryInvocation, QueryTarget};
pub use invoker::QueryInvoker;
