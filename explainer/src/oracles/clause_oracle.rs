use explainer_core::containers::KeyedVec;
use explainer_core::create_statistics_struct;
use explainer_core::explainer_assert_simple;
use explainer_core::oracle::OptimisationOracle;
use explainer_core::oracle::Oracle;
use explainer_core::oracle::SolveOutcome;
use explainer_core::statistics::Statistic;
use explainer_core::statistics::StatisticLogger;
use explainer_core::termination::TerminationCondition;
use explainer_core::variables::Indicator;
use explainer_core::variables::Literal;
use log::trace;

create_statistics_struct!(
    /// Statistics of a [`ClauseOracle`].
    ClauseOracleStatistics {
        num_solves: usize,
        num_decisions: usize,
        num_conflicts: usize,
        /// The number of times a better solution was found while minimising.
        num_improvements: usize,
});

/// A propositional oracle over indicators, holding nothing but clauses.
///
/// The search is a DPLL procedure with unit propagation; decisions are made on the unassigned
/// indicator with the lowest id, trying its hinted phase (false by default) first. When an
/// objective is set, the search becomes branch and bound: it keeps looking for cheaper solutions
/// and only reports [`SolveOutcome::Satisfiable`] once the search space is exhausted.
#[derive(Clone, Debug, Default)]
pub struct ClauseOracle {
    phases: KeyedVec<Indicator, bool>,
    clauses: Vec<Vec<Literal>>,
    objective: Vec<(Indicator, u64)>,
    solution: Option<KeyedVec<Indicator, bool>>,
    core: Vec<Indicator>,
    statistics: ClauseOracleStatistics,
}

impl ClauseOracle {
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// The objective value of the last solution, which is zero without an objective.
    pub fn objective_value(&self) -> Option<u64> {
        self.solution.as_ref().map(|solution| {
            self.objective
                .iter()
                .filter(|(indicator, _)| solution[*indicator])
                .map(|(_, weight)| weight)
                .sum()
        })
    }

    pub fn statistics(&self) -> ClauseOracleStatistics {
        self.statistics
    }

    pub fn log_statistics(&self, statistic_logger: StatisticLogger) {
        self.statistics.log(statistic_logger);
    }
}

impl Oracle for ClauseOracle {
    fn new_indicator(&mut self) -> Indicator {
        self.phases.push(false)
    }

    fn num_indicators(&self) -> usize {
        self.phases.len()
    }

    fn solve(
        &mut self,
        assumptions: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> SolveOutcome {
        self.statistics.num_solves += 1;
        self.solution = None;
        self.core.clear();

        let mut weights: KeyedVec<Indicator, u64> = KeyedVec::filled(self.phases.len(), 0);
        for &(indicator, weight) in &self.objective {
            weights[indicator] += weight;
        }

        let (step, best) = {
            let mut search = ClauseSearch {
                clauses: &self.clauses,
                phases: &self.phases,
                weights,
                optimise: !self.objective.is_empty(),
                assignment: KeyedVec::filled(self.phases.len(), None),
                trail: vec![],
                cost: 0,
                best: None,
                termination,
                statistics: &mut self.statistics,
            };

            for &indicator in assumptions {
                explainer_assert_simple!(indicator.id() < search.phases.len() as u32);
                if search.assignment[indicator].is_none() {
                    search.assign(indicator, true);
                }
            }

            let step = search.search();
            (step, search.best)
        };
        trace!("Clause search finished with {step:?}");

        match (step, best) {
            (Step::Interrupted, _) => SolveOutcome::Unknown,
            (_, Some((_, solution))) => {
                self.solution = Some(solution);
                SolveOutcome::Satisfiable
            }
            (_, None) => {
                self.core = assumptions.to_vec();
                self.core.sort();
                self.core.dedup();
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
        for &(indicator, value) in hints {
            self.phases[indicator] = value;
        }
    }

    fn indicator_value(&self, indicator: Indicator) -> Option<bool> {
        self.solution.as_ref().map(|solution| solution[indicator])
    }
}

impl OptimisationOracle for ClauseOracle {
    fn minimise(&mut self, objective: Vec<(Indicator, u64)>) {
        self.objective = objective;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Found,
    Exhausted,
    Interrupted,
}

struct ClauseSearch<'a, T> {
    clauses: &'a [Vec<Literal>],
    phases: &'a KeyedVec<Indicator, bool>,
    weights: KeyedVec<Indicator, u64>,
    optimise: bool,
    assignment: KeyedVec<Indicator, Option<bool>>,
    trail: Vec<Indicator>,
    /// The total weight of the indicators which are currently true.
    cost: u64,
    best: Option<(u64, KeyedVec<Indicator, bool>)>,
    termination: &'a mut T,
    statistics: &'a mut ClauseOracleStatistics,
}

impl<T: TerminationCondition> ClauseSearch<'_, T> {
    fn search(&mut self) -> Step {
        if self.termination.should_stop() {
            return Step::Interrupted;
        }

        let mark = self.trail.len();
        let step = self.explore();
        self.backtrack(mark);

        step
    }

    fn explore(&mut self) -> Step {
        if !self.propagate() {
            self.statistics.num_conflicts += 1;
            return Step::Exhausted;
        }

        if let Some((best_cost, _)) = &self.best {
            if self.cost >= *best_cost {
                return Step::Exhausted;
            }
        }

        let Some(indicator) = self
            .assignment
            .keys()
            .find(|&indicator| self.assignment[indicator].is_none())
        else {
            let solution = self
                .assignment
                .iter()
                .map(|value| value.unwrap_or(false))
                .collect::<Vec<_>>();
            if self.best.is_some() {
                self.statistics.num_improvements += 1;
            }
            self.best = Some((self.cost, KeyedVec::from(solution)));

            return if self.optimise {
                Step::Exhausted
            } else {
                Step::Found
            };
        };

        self.statistics.num_decisions += 1;
        let phase = self.phases[indicator];
        for value in [phase, !phase] {
            let mark = self.trail.len();
            self.assign(indicator, value);

            let step = self.search();
            self.backtrack(mark);

            if step != Step::Exhausted {
                return step;
            }
        }

        Step::Exhausted
    }

    /// Applies unit propagation until a fixpoint; returns false if a clause is falsified.
    fn propagate(&mut self) -> bool {
        let clauses = self.clauses;

        loop {
            let mut changed = false;

            for clause in clauses {
                let mut num_unassigned = 0;
                let mut unassigned = None;
                let mut satisfied = false;

                for &literal in clause {
                    match self.assignment[literal.indicator()] {
                        Some(value) if literal.evaluate(value) => {
                            satisfied = true;
                            break;
                        }
                        Some(_) => {}
                        None => {
                            num_unassigned += 1;
                            unassigned = Some(literal);
                        }
                    }
                }

                if satisfied {
                    continue;
                }

                match unassigned {
                    None => return false,
                    Some(literal) if num_unassigned == 1 => {
                        self.assign(literal.indicator(), literal.is_positive());
                        changed = true;
                    }
                    Some(_) => {}
                }
            }

            if !changed {
                return true;
            }
        }
    }

    fn assign(&mut self, indicator: Indicator, value: bool) {
        self.assignment[indicator] = Some(value);
        self.trail.push(indicator);
        if value {
            self.cost += self.weights[indicator];
        }
    }

    fn backtrack(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let Some(indicator) = self.trail.pop() else {
                break;
            };

            if self.assignment[indicator] == Some(true) {
                self.cost -= self.weights[indicator];
            }
            self.assignment[indicator] = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use explainer_core::termination::Indefinite;
    use explainer_core::termination::TimeBudget;

    use super::*;

    fn oracle(num_indicators: usize) -> (ClauseOracle, Vec<Indicator>) {
        let mut oracle = ClauseOracle::default();
        let indicators = (0..num_indicators)
            .map(|_| oracle.new_indicator())
            .collect();
        (oracle, indicators)
    }

    #[test]
    fn hinted_phases_are_tried_first() {
        let (mut oracle, indicators) = oracle(3);
        oracle.hint(&[(indicators[0], true), (indicators[2], true)]);
        oracle.add_clause(vec![indicators[0].negative(), indicators[1].negative()]);

        assert_eq!(oracle.solve(&[], &mut Indefinite), SolveOutcome::Satisfiable);
        assert_eq!(oracle.indicator_value(indicators[0]), Some(true));
        assert_eq!(oracle.indicator_value(indicators[1]), Some(false));
        assert_eq!(oracle.indicator_value(indicators[2]), Some(true));
    }

    #[test]
    fn unit_propagation_detects_unsatisfiability_under_assumptions() {
        let (mut oracle, indicators) = oracle(3);
        oracle.add_clause(vec![indicators[0].negative(), indicators[1].positive()]);
        oracle.add_clause(vec![indicators[1].negative(), indicators[2].negative()]);

        assert_eq!(
            oracle.solve(&[indicators[0], indicators[2]], &mut Indefinite),
            SolveOutcome::Unsatisfiable
        );
        assert_eq!(oracle.core(), vec![indicators[0], indicators[2]]);

        assert_eq!(
            oracle.solve(&[indicators[0]], &mut Indefinite),
            SolveOutcome::Satisfiable
        );
        assert_eq!(oracle.indicator_value(indicators[1]), Some(true));
    }

    #[test]
    fn empty_clause_makes_the_oracle_unsatisfiable() {
        let (mut oracle, _) = oracle(2);
        oracle.add_clause(vec![]);

        assert_eq!(oracle.solve(&[], &mut Indefinite), SolveOutcome::Unsatisfiable);
        assert_eq!(oracle.core(), vec![]);
    }

    #[test]
    fn minimises_the_weighted_sum() {
        let (mut oracle, indicators) = oracle(3);
        oracle.minimise(vec![
            (indicators[0], 3),
            (indicators[1], 1),
            (indicators[2], 1),
        ]);
        oracle.add_clause(vec![indicators[0].positive(), indicators[1].positive()]);
        oracle.add_clause(vec![indicators[0].positive(), indicators[2].positive()]);

        assert_eq!(oracle.solve(&[], &mut Indefinite), SolveOutcome::Satisfiable);
        assert_eq!(oracle.objective_value(), Some(2));
        assert_eq!(oracle.indicator_value(indicators[0]), Some(false));
        assert_eq!(oracle.indicator_value(indicators[1]), Some(true));
        assert_eq!(oracle.indicator_value(indicators[2]), Some(true));
    }

    #[test]
    fn exactly_one_picks_the_cheapest_indicator() {
        let (mut oracle, indicators) = oracle(3);
        oracle.minimise(vec![
            (indicators[0], 2),
            (indicators[1], 1),
            (indicators[2], 3),
        ]);
        oracle.add_exactly_one(&indicators);

        assert_eq!(oracle.solve(&[], &mut Indefinite), SolveOutcome::Satisfiable);
        assert_eq!(oracle.objective_value(), Some(1));
        assert_eq!(oracle.indicator_value(indicators[1]), Some(true));

        assert_eq!(
            oracle.solve(&[indicators[0], indicators[2]], &mut Indefinite),
            SolveOutcome::Unsatisfiable
        );
    }

    #[test]
    fn exhausted_budget_gives_unknown() {
        let (mut oracle, _) = oracle(2);
        let mut budget = TimeBudget::starting_now(Duration::ZERO);

        assert_eq!(oracle.solve(&[], &mut budget), SolveOutcome::Unknown);
        assert_eq!(oracle.indicator_value(Indicator::new(0)), None);
    }
}
