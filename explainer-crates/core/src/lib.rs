//! # Explainer core
//! Explanations for infeasible constraint models.
//!
//! A model consists of hard constraints, which always have to hold, and soft constraints, which
//! can be switched on and off. When the model is infeasible, this crate answers questions such as:
//! - which (minimal) sets of soft constraints are in conflict with each other
//!   ([`ConflictExtractor::shrink`](explanations::ConflictExtractor::shrink)),
//! - which soft constraints can be kept together
//!   ([`ConflictExtractor::grow`](explanations::ConflictExtractor::grow)),
//! - what are all the conflicts and all the maximal consistent subsets
//!   ([`SubsetMapper`](explanations::SubsetMapper)),
//! - which conflict is the cheapest to explain, given weights on the constraints
//!   ([`HittingSetOptimizer`](explanations::HittingSetOptimizer)),
//! - which constraints should be removed to restore feasibility
//!   ([`DiagnosisSession`](explanations::DiagnosisSession)).
//!
//! The crate does not solve constraint models itself. Feasibility is decided by an oracle, which
//! is anything that implements the traits in [`oracle`]. Every soft constraint is guarded by an
//! [`Indicator`](variables::Indicator) (`indicator -> constraint`), and the algorithms only ever
//! ask the oracle whether the model is satisfiable when a given set of indicators is true.
//!
//! # Termination
//! Every operation takes a [`TerminationCondition`](termination::TerminationCondition) which is
//! passed on to every oracle call. When it triggers, the operation stops with
//! [`ExplanationError::Timeout`]; an inconclusive oracle call is never treated as satisfiable or
//! unsatisfiable.
pub mod asserts;
pub(crate) mod basic_types;
pub mod containers;
pub mod explanations;
pub mod model;
pub mod options;
pub mod oracle;
pub mod statistics;
pub mod termination;
pub mod variables;

pub use convert_case;
pub use rand;

pub use crate::basic_types::ExplanationError;
pub use crate::basic_types::Feasibility;
