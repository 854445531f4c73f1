//! The capabilities which the explanation algorithms require from a feasibility-checking engine.
//!
//! The algorithms never look inside an oracle; they only issue the calls of the [`Oracle`] trait
//! (and its extensions [`ConstraintOracle`] and [`OptimisationOracle`]). Three different oracles
//! take part in a session, each owned by exactly one component:
//! - the main oracle, a [`ConstraintOracle`] holding the hard constraints and the reified soft
//!   constraints, owned by the [`ConflictExtractor`];
//! - the map oracle of the [`SubsetMapper`], which only ever receives blocking clauses;
//! - the hitting-set oracle of the [`HittingSetOptimizer`], an [`OptimisationOracle`] which only
//!   receives must-hit clauses and an objective.
//!
//! All three are defined over the same [`Indicator`]s.

#[cfg(test)]
pub(crate) mod test_oracles;

use std::fmt::Debug;
use std::fmt::Display;

use log::debug;

#[cfg(doc)]
use crate::explanations::ConflictExtractor;
#[cfg(doc)]
use crate::explanations::HittingSetOptimizer;
#[cfg(doc)]
use crate::explanations::SubsetMapper;
use crate::basic_types::ExplanationError;
use crate::basic_types::Feasibility;
use crate::explainer_assert_moderate;
use crate::termination::TerminationCondition;
use crate::variables::Indicator;
use crate::variables::Literal;

/// The answer of an oracle to a single feasibility query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SolveOutcome {
    /// A solution was found; its values can be read until the next call to
    /// [`Oracle::solve`].
    Satisfiable,
    /// There is no solution under the given assumptions; [`Oracle::core`] returns a subset of the
    /// assumptions which is responsible.
    Unsatisfiable,
    /// The oracle did not reach a conclusion, likely because the [`TerminationCondition`]
    /// triggered.
    Unknown,
}

/// A constraint which can be handed to a [`ConstraintOracle`].
///
/// The [`Display`] implementation is the canonical text of the constraint; it is used to present
/// conflicts to a user and to order constraints deterministically.
pub trait Constraint: Display + Debug {
    /// Whether the constraint can be guarded by an indicator (`indicator -> constraint`).
    ///
    /// Soft constraints which cannot be reified are rejected when the
    /// [`IndicatorModel`](crate::model::IndicatorModel) is built.
    fn can_reify(&self) -> bool;
}

/// A feasibility oracle over boolean [`Indicator`]s.
pub trait Oracle {
    /// Creates a new indicator variable.
    ///
    /// Implementations number indicators consecutively, starting at zero.
    fn new_indicator(&mut self) -> Indicator;

    /// The number of indicators which have been created.
    fn num_indicators(&self) -> usize;

    /// Decides whether the oracle is satisfiable when all `assumptions` are set to true.
    ///
    /// The `termination` condition should be polled regularly; when it triggers, the oracle
    /// returns [`SolveOutcome::Unknown`].
    fn solve(
        &mut self,
        assumptions: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> SolveOutcome;

    /// Returns a subset of the assumptions of the last call to [`Oracle::solve`] which is
    /// unsatisfiable on its own.
    ///
    /// Only valid directly after [`Oracle::solve`] returned [`SolveOutcome::Unsatisfiable`]. The
    /// core is not necessarily minimal.
    fn core(&self) -> Vec<Indicator>;

    /// Permanently adds the disjunction of the given literals. An empty clause makes the oracle
    /// unsatisfiable.
    fn add_clause(&mut self, clause: Vec<Literal>);

    /// Suggests values for indicators to the search of the next call to [`Oracle::solve`]. Hints
    /// have no effect on the outcome, only on which solution is found.
    fn hint(&mut self, hints: &[(Indicator, bool)]);

    /// The value of the indicator in the last solution.
    ///
    /// Only valid directly after [`Oracle::solve`] returned [`SolveOutcome::Satisfiable`].
    fn indicator_value(&self, indicator: Indicator) -> Option<bool>;
}

/// An [`Oracle`] which additionally holds (domain) constraints.
pub trait ConstraintOracle: Oracle {
    type Constraint: Constraint + Clone;

    /// Adds a constraint which always has to hold.
    fn post(&mut self, constraint: Self::Constraint);

    /// Adds the constraint `indicator -> constraint`.
    fn post_implication(&mut self, indicator: Indicator, constraint: Self::Constraint);

    /// Evaluates the constraint under the values of the last solution.
    ///
    /// Only valid directly after [`Oracle::solve`] returned [`SolveOutcome::Satisfiable`].
    fn constraint_value(&self, constraint: &Self::Constraint) -> Option<bool>;
}

/// An [`Oracle`] which minimises a weighted sum of indicators.
///
/// For an optimisation oracle, [`SolveOutcome::Satisfiable`] means that a solution has been found
/// *and* proven to be optimal. If the search is interrupted before optimality is proven, the
/// outcome is [`SolveOutcome::Unknown`].
pub trait OptimisationOracle: Oracle {
    /// Sets the objective `minimise sum(weight * indicator)`.
    fn minimise(&mut self, objective: Vec<(Indicator, u64)>);

    /// Restricts the solutions to those in which exactly one of the given indicators is true.
    fn add_exactly_one(&mut self, indicators: &[Indicator]) {
        self.add_clause(indicators.iter().map(|indicator| indicator.positive()).collect());

        for (position, &first) in indicators.iter().enumerate() {
            for &second in &indicators[position + 1..] {
                self.add_clause(vec![first.negative(), second.negative()]);
            }
        }
    }
}

/// Solves the oracle under the given assumptions and converts the outcome into a [`Feasibility`].
///
/// An [`SolveOutcome::Unknown`] is never interpreted: it becomes [`ExplanationError::Timeout`]
/// when the termination condition has triggered, and [`ExplanationError::Inconclusive`]
/// otherwise.
pub fn check_assumptions(
    oracle: &mut impl Oracle,
    assumptions: &[Indicator],
    termination: &mut impl TerminationCondition,
) -> Result<Feasibility, ExplanationError> {
    match oracle.solve(assumptions, termination) {
        SolveOutcome::Satisfiable => Ok(Feasibility::Satisfiable),
        SolveOutcome::Unsatisfiable => {
            let core = oracle.core();
            explainer_assert_moderate!(
                core.iter().all(|indicator| assumptions.contains(indicator)),
                "the core has to be a subset of the assumptions"
            );
            Ok(Feasibility::Unsatisfiable(core))
        }
        SolveOutcome::Unknown => Err(inconclusive(termination)),
    }
}

/// Determines which error an inconclusive oracle call corresponds to.
pub(crate) fn inconclusive(termination: &mut impl TerminationCondition) -> ExplanationError {
    if termination.should_stop() {
        debug!("Oracle call interrupted by the termination condition");
        ExplanationError::Timeout
    } else {
        debug!("Oracle call was inconclusive");
        ExplanationError::Inconclusive
    }
}
