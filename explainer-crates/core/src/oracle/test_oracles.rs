//! Oracles with hand-specified behaviour, used to test the explanation algorithms in isolation.
use std::fmt::Display;

use super::Constraint;
use super::ConstraintOracle;
use super::OptimisationOracle;
use super::Oracle;
use super::SolveOutcome;
use crate::termination::TerminationCondition;
use crate::variables::Indicator;
use crate::variables::Literal;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TestConstraint {
    name: String,
    reifiable: bool,
}

impl TestConstraint {
    pub(crate) fn new(name: &str) -> Self {
        TestConstraint {
            name: name.to_owned(),
            reifiable: true,
        }
    }

    pub(crate) fn not_reifiable(name: &str) -> Self {
        TestConstraint {
            name: name.to_owned(),
            reifiable: false,
        }
    }
}

impl Display for TestConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Constraint for TestConstraint {
    fn can_reify(&self) -> bool {
        self.reifiable
    }
}

/// A constraint oracle in which a set of assumptions is unsatisfiable if and only if it contains
/// one of the given conflicts. The reported core is the first such conflict.
///
/// In a solution, exactly the assumed indicators are true, and a soft constraint holds if and
/// only if its indicator was assumed.
#[derive(Debug, Default)]
pub(crate) struct TestOracle {
    conflicts: Vec<Vec<Indicator>>,
    num_indicators: usize,
    hard: Vec<TestConstraint>,
    implications: Vec<(Indicator, TestConstraint)>,
    clauses: Vec<Vec<Literal>>,
    last_assumptions: Vec<Indicator>,
    core: Vec<Indicator>,
    num_solve_calls: usize,
    /// Calls with a larger index than this are inconclusive.
    conclusive_calls: Option<usize>,
}

impl TestOracle {
    pub(crate) fn with_conflicts(conflicts: &[&[u32]]) -> Self {
        TestOracle {
            conflicts: conflicts
                .iter()
                .map(|conflict| conflict.iter().map(|&id| Indicator::new(id)).collect())
                .collect(),
            ..Default::default()
        }
    }

    /// Every call after the first `num_calls` calls returns [`SolveOutcome::Unknown`].
    pub(crate) fn inconclusive_after(mut self, num_calls: usize) -> Self {
        self.conclusive_calls = Some(num_calls);
        self
    }

    pub(crate) fn implications(&self) -> &[(Indicator, TestConstraint)] {
        &self.implications
    }

    pub(crate) fn num_solve_calls(&self) -> usize {
        self.num_solve_calls
    }

    pub(crate) fn clauses(&self) -> &[Vec<Literal>] {
        &self.clauses
    }
}

impl Oracle for TestOracle {
    fn new_indicator(&mut self) -> Indicator {
        let indicator = Indicator::new(self.num_indicators as u32);
        self.num_indicators += 1;
        indicator
    }

    fn num_indicators(&self) -> usize {
        self.num_indicators
    }

    fn solve(
        &mut self,
        assumptions: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> SolveOutcome {
        self.num_solve_calls += 1;
        self.core.clear();
        self.last_assumptions.clear();

        if termination.should_stop()
            || self
                .conclusive_calls
                .is_some_and(|conclusive| self.num_solve_calls > conclusive)
        {
            return SolveOutcome::Unknown;
        }

        match self.conflicts.iter().find(|conflict| {
            conflict
                .iter()
                .all(|indicator| assumptions.contains(indicator))
        }) {
            Some(conflict) => {
                self.core = conflict.clone();
                SolveOutcome::Unsatisfiable
            }
            None => {
                self.last_assumptions = assumptions.to_vec();
                SolveOutcome::Satisfiable
            }
        }
    }

    fn core(&self) -> Vec<Indicator> {
        self.core.clone()
    }

    fn add_clause(&mut self, clause: Vec<Literal>) {
        self.clauses.push(clause);
    }

    fn hint(&mut self, _: &[(Indicator, bool)]) {}

    fn indicator_value(&self, indicator: Indicator) -> Option<bool> {
        Some(self.last_assumptions.contains(&indicator))
    }
}

impl ConstraintOracle for TestOracle {
    type Constraint = TestConstraint;

    fn post(&mut self, constraint: TestConstraint) {
        self.hard.push(constraint);
    }

    fn post_implication(&mut self, indicator: Indicator, constraint: TestConstraint) {
        self.implications.push((indicator, constraint));
    }

    fn constraint_value(&self, constraint: &TestConstraint) -> Option<bool> {
        if self.hard.contains(constraint) {
            return Some(true);
        }

        Some(
            self.implications
                .iter()
                .filter(|(_, implied)| implied == constraint)
                .any(|(indicator, _)| self.last_assumptions.contains(indicator)),
        )
    }
}

/// An optimisation oracle which enumerates all assignments to its indicators.
///
/// Among the assignments with minimum cost, the one agreeing with most hints is chosen; remaining
/// ties are broken towards the assignment which is smallest as a bit vector. The core of an
/// unsatisfiable call consists of all assumptions.
#[derive(Debug, Default)]
pub(crate) struct TestHittingSetOracle {
    num_indicators: usize,
    clauses: Vec<Vec<Literal>>,
    objective: Vec<(Indicator, u64)>,
    hints: Vec<(Indicator, bool)>,
    solution: Vec<bool>,
    core: Vec<Indicator>,
}

impl Oracle for TestHittingSetOracle {
    fn new_indicator(&mut self) -> Indicator {
        let indicator = Indicator::new(self.num_indicators as u32);
        self.num_indicators += 1;
        indicator
    }

    fn num_indicators(&self) -> usize {
        self.num_indicators
    }

    fn solve(
        &mut self,
        assumptions: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> SolveOutcome {
        if termination.should_stop() {
            return SolveOutcome::Unknown;
        }

        let mut best: Option<(u64, usize, Vec<bool>)> = None;
        for mask in 0..(1_u64 << self.num_indicators) {
            let assignment = (0..self.num_indicators)
                .map(|bit| mask & (1 << bit) != 0)
                .collect::<Vec<_>>();

            let value = |indicator: Indicator| assignment[indicator.id() as usize];
            let is_solution = assumptions.iter().all(|&indicator| value(indicator))
                && self.clauses.iter().all(|clause| {
                    clause
                        .iter()
                        .any(|literal| literal.evaluate(value(literal.indicator())))
                });
            if !is_solution {
                continue;
            }

            let cost = self
                .objective
                .iter()
                .filter(|(indicator, _)| value(*indicator))
                .map(|(_, weight)| weight)
                .sum::<u64>();
            let disagreements = self
                .hints
                .iter()
                .filter(|(indicator, hinted)| value(*indicator) != *hinted)
                .count();

            let improves = match &best {
                Some((best_cost, best_disagreements, _)) => {
                    (cost, disagreements) < (*best_cost, *best_disagreements)
                }
                None => true,
            };
            if improves {
                best = Some((cost, disagreements, assignment));
            }
        }

        match best {
            Some((_, _, assignment)) => {
                self.solution = assignment;
                SolveOutcome::Satisfiable
            }
            None => {
                self.core = assumptions.to_vec();
                SolveOutcome::Unsatisfiable
            }
        }
    }

    fn core(&self) -> Vec<Indicator> {
        self.core.clone()
    }

    fn add_clause(&mut self, clause: Vec<Literal>) {
        self.clauses.push(clause);
    }

    fn hint(&mut self, hints: &[(Indicator, bool)]) {
        self.hints = hints.to_vec();
    }

    fn indicator_value(&self, indicator: Indicator) -> Option<bool> {
        self.solution.get(indicator.id() as usize).copied()
    }
}

impl OptimisationOracle for TestHittingSetOracle {
    fn minimise(&mut self, objective: Vec<(Indicator, u64)>) {
        self.objective = objective;
    }
}
