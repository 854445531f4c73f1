use std::sync::Arc;

use explainer_core::containers::KeyedVec;
use explainer_core::create_statistics_struct;
use explainer_core::explainer_assert_simple;
use explainer_core::oracle::ConstraintOracle;
use explainer_core::oracle::OptimisationOracle;
use explainer_core::oracle::Oracle;
use explainer_core::oracle::SolveOutcome;
use explainer_core::statistics::Statistic;
use explainer_core::statistics::StatisticLogger;
use explainer_core::termination::TerminationCondition;
use explainer_core::variables::Indicator;
use explainer_core::variables::Literal;
use log::trace;

use crate::constraints::DomainId;
use crate::constraints::IntConstraint;
use crate::constraints::IntVariable;

create_statistics_struct!(
    /// Statistics of a [`FiniteDomainOracle`].
    FiniteDomainStatistics {
        num_solves: usize,
        num_nodes: usize,
        num_failures: usize,
        /// The number of times a better solution was found while minimising.
        num_improvements: usize,
});

/// An exhaustive backtracking oracle over integer variables with finite interval domains.
///
/// Indicators are variables with the domain `{0, 1}`. The search assigns the indicators first and
/// then every other variable in creation order; a constraint is checked as soon as all variables
/// in its scope are assigned. Assumed indicators can only take the value 1, and hinted indicators
/// try the hinted value first. An indicator which only guards implications is never set to 1
/// unless it is assumed or hinted, as 0 satisfies everything 1 does.
///
/// With an objective set through [`OptimisationOracle::minimise`], the search continues after
/// every solution and prunes assignments of the indicators which are not cheaper than the best
/// solution so far.
///
/// When the search fails, the core consists of the assumed indicators which are in the scope of a
/// constraint that failed somewhere in the search tree. Freeing any other assumption cannot make
/// one of these failures disappear, so the search restricted to the core fails as well.
#[derive(Clone, Debug, Default)]
pub struct FiniteDomainOracle {
    domains: KeyedVec<DomainId, (i64, i64)>,
    indicator_domains: KeyedVec<Indicator, DomainId>,
    hints: KeyedVec<Indicator, Option<bool>>,
    hard_constraints: Vec<IntConstraint>,
    implications: Vec<(Indicator, IntConstraint)>,
    clauses: Vec<Vec<Literal>>,
    objective: Vec<(Indicator, u64)>,
    solution: Option<KeyedVec<DomainId, i64>>,
    core: Vec<Indicator>,
    statistics: FiniteDomainStatistics,
}

impl FiniteDomainOracle {
    /// Creates a variable with the domain `[lower_bound, upper_bound]`.
    pub fn new_variable(&mut self, lower_bound: i64, upper_bound: i64, name: &str) -> IntVariable {
        let domain = self.domains.push((lower_bound, upper_bound));
        IntVariable::new(domain, Arc::from(name))
    }

    pub fn num_variables(&self) -> usize {
        self.domains.len()
    }

    pub fn lower_bound(&self, variable: &IntVariable) -> i64 {
        self.domains[variable.domain()].0
    }

    pub fn upper_bound(&self, variable: &IntVariable) -> i64 {
        self.domains[variable.domain()].1
    }

    /// The 0/1 variable behind an indicator, so that constraints can be posted over indicators.
    pub fn indicator_variable(&self, indicator: Indicator) -> IntVariable {
        IntVariable::new(
            self.indicator_domains[indicator],
            Arc::from(format!("i{}", indicator.id())),
        )
    }

    /// The objective value of the last solution, which is zero without an objective.
    pub fn objective_value(&self) -> Option<u64> {
        self.solution.as_ref().map(|solution| {
            self.objective
                .iter()
                .filter(|(indicator, _)| solution[self.indicator_domains[*indicator]] == 1)
                .map(|(_, weight)| weight)
                .sum()
        })
    }

    /// The value of the variable in the last solution.
    pub fn value(&self, variable: &IntVariable) -> Option<i64> {
        self.solution
            .as_ref()
            .map(|solution| solution[variable.domain()])
    }

    pub fn statistics(&self) -> FiniteDomainStatistics {
        self.statistics
    }

    pub fn log_statistics(&self, statistic_logger: StatisticLogger) {
        self.statistics.log(statistic_logger);
    }

    /// The order in which the search assigns the domains: indicators first.
    fn search_order(&self) -> Vec<DomainId> {
        let mut is_indicator: KeyedVec<DomainId, bool> =
            KeyedVec::filled(self.domains.len(), false);
        for &domain in self.indicator_domains.iter() {
            is_indicator[domain] = true;
        }

        self.indicator_domains
            .iter()
            .copied()
            .chain(self.domains.keys().filter(|&domain| !is_indicator[domain]))
            .collect()
    }

    fn checks(&self) -> Vec<Check<'_>> {
        let hard = self.hard_constraints.iter().map(|constraint| Check {
            scope: constraint.scope(),
            kind: CheckKind::Hard(constraint),
        });

        let implications = self.implications.iter().map(|(indicator, constraint)| {
            let guard = self.indicator_domains[*indicator];
            let mut scope = constraint.scope();
            scope.push(guard);

            Check {
                scope,
                kind: CheckKind::Implication(guard, constraint),
            }
        });

        let clauses = self.clauses.iter().map(|clause| {
            let literals = clause
                .iter()
                .map(|literal| {
                    (
                        self.indicator_domains[literal.indicator()],
                        literal.is_positive(),
                    )
                })
                .collect::<Vec<_>>();

            Check {
                scope: literals.iter().map(|&(domain, _)| domain).collect(),
                kind: CheckKind::Clause(literals),
            }
        });

        hard.chain(implications).chain(clauses).collect()
    }

    /// The indicator domains which only occur as guards of implications.
    fn free_indicators(&self, checks: &[Check<'_>]) -> KeyedVec<DomainId, bool> {
        let mut free: KeyedVec<DomainId, bool> = KeyedVec::filled(self.domains.len(), false);
        for &domain in self.indicator_domains.iter() {
            free[domain] = true;
        }

        for check in checks {
            match &check.kind {
                CheckKind::Implication(guard, _) => {
                    for &domain in check.scope.iter().filter(|&domain| domain != guard) {
                        free[domain] = false;
                    }
                }
                CheckKind::Hard(_) | CheckKind::Clause(_) => {
                    for &domain in &check.scope {
                        free[domain] = false;
                    }
                }
            }
        }

        free
    }
}

impl Oracle for FiniteDomainOracle {
    fn new_indicator(&mut self) -> Indicator {
        let name = format!("i{}", self.indicator_domains.len());
        let domain = self.new_variable(0, 1, &name).domain();
        let _ = self.hints.push(None);

        self.indicator_domains.push(domain)
    }

    fn num_indicators(&self) -> usize {
        self.indicator_domains.len()
    }

    fn solve(
        &mut self,
        assumptions: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> SolveOutcome {
        self.statistics.num_solves += 1;
        self.solution = None;
        self.core.clear();

        let mut assumed: KeyedVec<DomainId, bool> =
            KeyedVec::filled(self.domains.len(), false);
        for &indicator in assumptions {
            explainer_assert_simple!(indicator.id() < self.indicator_domains.len() as u32);
            assumed[self.indicator_domains[indicator]] = true;
        }

        let mut preferred: KeyedVec<DomainId, Option<i64>> =
            KeyedVec::filled(self.domains.len(), None);
        for (indicator, hint) in self.hints.enumerate() {
            preferred[self.indicator_domains[indicator]] = hint.map(i64::from);
        }

        let order = self.search_order();
        let mut position: KeyedVec<DomainId, usize> = KeyedVec::filled(self.domains.len(), 0);
        for (index, &domain) in order.iter().enumerate() {
            position[domain] = index;
        }

        let mut weights: KeyedVec<DomainId, u64> = KeyedVec::filled(self.domains.len(), 0);
        for &(indicator, weight) in &self.objective {
            weights[self.indicator_domains[indicator]] += weight;
        }

        let checks = self.checks();
        let free = self.free_indicators(&checks);
        let mut root_checks = vec![];
        let mut checks_at = vec![vec![]; order.len()];
        for (index, check) in checks.iter().enumerate() {
            match check.scope.iter().map(|&domain| position[domain]).max() {
                Some(last) => checks_at[last].push(index),
                None => root_checks.push(index),
            }
        }

        let (step, values, best, in_core, num_nodes, num_failures, num_improvements) = {
            let mut search = Search {
                domains: &self.domains,
                order,
                checks,
                checks_at,
                assumed,
                free,
                preferred,
                weights,
                optimise: !self.objective.is_empty(),
                values: KeyedVec::filled(self.domains.len(), 0),
                cost: 0,
                best: None,
                in_core: KeyedVec::filled(self.domains.len(), false),
                termination,
                num_nodes: 0,
                num_failures: 0,
                num_improvements: 0,
            };

            let step = if root_checks
                .iter()
                .all(|&check| search.checks[check].holds(&search.values))
            {
                search.search(0)
            } else {
                Step::Exhausted
            };

            (
                step,
                search.values,
                search.best,
                search.in_core,
                search.num_nodes,
                search.num_failures,
                search.num_improvements,
            )
        };

        self.statistics.num_nodes += num_nodes;
        self.statistics.num_failures += num_failures;
        self.statistics.num_improvements += num_improvements;
        trace!("Search explored {num_nodes} nodes, outcome {step:?}");

        match (step, best) {
            (Step::Found, _) => {
                self.solution = Some(values);
                SolveOutcome::Satisfiable
            }
            (Step::Interrupted, _) => SolveOutcome::Unknown,
            (Step::Exhausted, Some((_, solution))) => {
                self.solution = Some(solution);
                SolveOutcome::Satisfiable
            }
            (Step::Exhausted, None) => {
                self.core = assumptions
                    .iter()
                    .copied()
                    .filter(|&indicator| in_core[self.indicator_domains[indicator]])
                    .collect();
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
            self.hints[indicator] = Some(value);
        }
    }

    fn indicator_value(&self, indicator: Indicator) -> Option<bool> {
        self.solution
            .as_ref()
            .map(|solution| solution[self.indicator_domains[indicator]] == 1)
    }
}

impl OptimisationOracle for FiniteDomainOracle {
    fn minimise(&mut self, objective: Vec<(Indicator, u64)>) {
        self.objective = objective;
    }
}

impl ConstraintOracle for FiniteDomainOracle {
    type Constraint = IntConstraint;

    fn post(&mut self, constraint: IntConstraint) {
        self.hard_constraints.push(constraint);
    }

    fn post_implication(&mut self, indicator: Indicator, constraint: IntConstraint) {
        self.implications.push((indicator, constraint));
    }

    fn constraint_value(&self, constraint: &IntConstraint) -> Option<bool> {
        self.solution
            .as_ref()
            .map(|solution| constraint.holds(|domain| solution[domain]))
    }
}

#[derive(Debug)]
struct Check<'a> {
    scope: Vec<DomainId>,
    kind: CheckKind<'a>,
}

#[derive(Debug)]
enum CheckKind<'a> {
    Hard(&'a IntConstraint),
    /// `guard == 1 -> constraint`
    Implication(DomainId, &'a IntConstraint),
    /// A clause over indicator domains, with the polarity of every literal.
    Clause(Vec<(DomainId, bool)>),
}

impl Check<'_> {
    fn holds(&self, values: &KeyedVec<DomainId, i64>) -> bool {
        match &self.kind {
            CheckKind::Hard(constraint) => constraint.holds(|domain| values[domain]),
            CheckKind::Implication(guard, constraint) => {
                values[*guard] == 0 || constraint.holds(|domain| values[domain])
            }
            CheckKind::Clause(literals) => literals
                .iter()
                .any(|&(domain, is_positive)| (values[domain] == 1) == is_positive),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Found,
    Exhausted,
    Interrupted,
}

struct Search<'a, T> {
    domains: &'a KeyedVec<DomainId, (i64, i64)>,
    order: Vec<DomainId>,
    checks: Vec<Check<'a>>,
    /// The checks which become fully assigned at every position of the order.
    checks_at: Vec<Vec<usize>>,
    assumed: KeyedVec<DomainId, bool>,
    free: KeyedVec<DomainId, bool>,
    preferred: KeyedVec<DomainId, Option<i64>>,
    /// The objective weight of every domain, which is zero for all but indicators.
    weights: KeyedVec<DomainId, u64>,
    optimise: bool,
    values: KeyedVec<DomainId, i64>,
    /// The weight of the indicators assigned 1 so far.
    cost: u64,
    best: Option<(u64, KeyedVec<DomainId, i64>)>,
    in_core: KeyedVec<DomainId, bool>,
    termination: &'a mut T,
    num_nodes: usize,
    num_failures: usize,
    num_improvements: usize,
}

impl<T: TerminationCondition> Search<'_, T> {
    fn search(&mut self, position: usize) -> Step {
        if position == self.order.len() {
            if !self.optimise {
                return Step::Found;
            }

            if self.best.is_some() {
                self.num_improvements += 1;
            }
            self.best = Some((self.cost, self.values.clone()));
            return Step::Exhausted;
        }
        if self.termination.should_stop() {
            return Step::Interrupted;
        }

        let domain = self.order[position];
        for value in self.candidate_values(domain) {
            let added = if value == 1 { self.weights[domain] } else { 0 };
            if let Some((best_cost, _)) = &self.best {
                if self.cost + added >= *best_cost {
                    continue;
                }
            }

            self.num_nodes += 1;
            self.values[domain] = value;

            if !self.consistent_at(position) {
                continue;
            }

            self.cost += added;
            let step = self.search(position + 1);
            self.cost -= added;

            match step {
                Step::Exhausted => {}
                step => return step,
            }
        }

        Step::Exhausted
    }

    fn candidate_values(&self, domain: DomainId) -> Vec<i64> {
        if self.assumed[domain] {
            return vec![1];
        }
        if self.free[domain] {
            return match self.preferred[domain] {
                Some(1) => vec![1, 0],
                _ => vec![0],
            };
        }

        let (lower_bound, upper_bound) = self.domains[domain];
        let preferred = self.preferred[domain]
            .filter(|value| (lower_bound..=upper_bound).contains(value));

        preferred
            .into_iter()
            .chain((lower_bound..=upper_bound).filter(|&value| Some(value) != preferred))
            .collect()
    }

    fn consistent_at(&mut self, position: usize) -> bool {
        let failed = self.checks_at[position]
            .iter()
            .copied()
            .find(|&check| !self.checks[check].holds(&self.values));

        let Some(failed) = failed else {
            return true;
        };

        self.num_failures += 1;
        for &domain in &self.checks[failed].scope {
            if self.assumed[domain] {
                self.in_core[domain] = true;
            }
        }

        false
    }
}
