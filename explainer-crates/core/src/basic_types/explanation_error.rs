use thiserror::Error;

#[cfg(doc)]
use crate::model::IndicatorModel;
#[cfg(doc)]
use crate::termination::TerminationCondition;

/// Errors which can occur while extracting explanations.
///
/// Note that a user aborting a diagnosis session is not an error; it is reported through
/// [`DiagnosisResult::Aborted`](crate::explanations::DiagnosisResult::Aborted).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExplanationError {
    /// A soft constraint cannot be guarded by an indicator. Raised when the [`IndicatorModel`] is
    /// constructed, before anything is posted to the oracle.
    #[error("soft constraint {index} ({constraint}) cannot be reified")]
    NotReifiable { index: usize, constraint: String },
    /// The [`TerminationCondition`] triggered before the oracle reached a conclusion.
    #[error("the time budget was exhausted before the oracle reached a conclusion")]
    Timeout,
    /// The oracle could not decide feasibility, even though the budget was not exhausted.
    #[error("the oracle could not decide feasibility")]
    Inconclusive,
    /// A conflict was requested for a set of constraints which is satisfiable.
    #[error("the constraints are satisfiable, there is no conflict to explain")]
    NoConflict,
    /// A satisfiable extension was requested for a set of constraints which is unsatisfiable.
    #[error("the seed is unsatisfiable and cannot be grown")]
    NoSolution,
    /// The hard constraints are infeasible on their own; removing soft constraints cannot help.
    #[error("the hard constraints are infeasible on their own")]
    HardConstraintsInfeasible,
    /// A choice provider selected a constraint which is not part of the presented conflict.
    #[error("selected index {index} is outside of a conflict of size {len}")]
    InvalidChoice { index: usize, len: usize },
}
