//! # Reasoner (C7)
//!
//! Backward-chaining proof search over the knowledge base and rule store,
//! with transitive closure over a fixed operator set and query-with-holes
//! enumeration. Session-local: every call threads an explicit `&Kb`,
//! `&RuleStore`, `&Config` and `&mut ReasonerStats` rather than holding any
//! state of its own, mirroring the teacher's stateless `planner` module.

pub mod prove;
pub mod query;
pub mod stats;
pub mod transitive;
pub mod unify;

pub use prove::{prove, Ctx, Derivation, ProofStep};
pub use query::{find_all, query, QueryBinding, QueryResult};
pub use stats::ReasonerStats;
pub use transitive::{is_transitive_operator, TRANSITIVE_OPERATORS};
pub use unify::{apply_substitution, resolve_ground, substitute_condition, unify as unify_patterns, Subst};
