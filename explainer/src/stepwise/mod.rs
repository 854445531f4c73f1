//! Explanations as sequences of small inference steps.
//!
//! A [`Step`] applies a few constraints to the current domains and removes every value which
//! does not occur in a solution of those constraints. Starting from the initial domains of the
//! variables, a [`StepwiseExplainer`] builds a sequence of steps which reaches a goal: either a
//! single solution, or a conflict, in which case the sequence explains why the constraints are
//! unsatisfiable.
//!
//! The sequence is built in four passes:
//! - [`StepwiseExplainer::construct_greedy`] repeatedly takes the step with the fewest
//!   constraints, found as an optimal unsatisfiable subset (see
//!   [`StepwiseExplainer::smallest_next_step`]);
//! - [`StepwiseExplainer::filter_sequence`] drops the steps which the goal can be reached without;
//! - [`StepwiseExplainer::relax_sequence`] reduces the premises of every step to a minimal set of
//!   previously derived literals;
//! - [`StepwiseExplainer::make_pertinent`] keeps only the conclusions which a later step, or the
//!   goal, depends on.
//!
//! [`StepwiseExplainer::find_sequence`] runs all of them.
mod backward;
mod domain_snapshot;
mod forward;
mod propagation;

use std::fmt::Display;
use std::fmt::Formatter;

pub use domain_snapshot::DomainSnapshot;
use explainer_core::create_statistics_struct;
use explainer_core::explainer_assert_simple;
use explainer_core::explanations::ConflictExtractor;
use explainer_core::options::ExtractorOptions;
use explainer_core::statistics::Statistic;
use explainer_core::statistics::StatisticLogger;
use explainer_core::termination::TerminationCondition;
use explainer_core::variables::Indicator;
use explainer_core::ExplanationError;
use fnv::FnvHashMap;
use log::info;
use propagation::Propagator;
use thiserror::Error;

use crate::constraints;
use crate::constraints::DomainId;
use crate::constraints::IntConstraint;
use crate::constraints::IntLiteral;
use crate::constraints::IntVariable;
use crate::oracles::FiniteDomainOracle;

create_statistics_struct!(
    /// Statistics of a [`StepwiseExplainer`].
    StepwiseStatistics {
        /// The number of steps found by [`StepwiseExplainer::smallest_next_step`].
        num_steps: usize,
        num_filtered_steps: usize,
        /// The number of candidate premises which were not needed by their step.
        num_relaxed_premises: usize,
        num_propagations: usize,
        num_propagation_cache_hits: usize,
});

/// Errors of a [`StepwiseExplainer`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepwiseError {
    #[error(transparent)]
    Explanation(#[from] ExplanationError),
    /// None of the constraints removes a value outside of the goal; the goal is not implied by
    /// the constraints.
    #[error("no step removes any of the {remaining} values outside of the goal")]
    Stuck { remaining: usize },
}

/// One inference: propagating `constraints` on the `input` domains gives the `output` domains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    constraints: Vec<usize>,
    input: DomainSnapshot,
    output: DomainSnapshot,
}

impl Step {
    /// The indices of the constraints the step applies, in ascending order.
    pub fn constraints(&self) -> &[usize] {
        &self.constraints
    }

    pub fn input(&self) -> &DomainSnapshot {
        &self.input
    }

    pub fn output(&self) -> &DomainSnapshot {
        &self.output
    }
}

/// What an [`ExplanationStep`] derives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Conclusion {
    Literals(Vec<IntLiteral>),
    /// The premises contradict the constraints of the step.
    Conflict,
}

impl Display for Conclusion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Conclusion::Literals(literals) => write_literals(f, literals),
            Conclusion::Conflict => write!(f, "false"),
        }
    }
}

/// A step of a finished explanation: the constraints together with the premises imply the
/// conclusion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplanationStep {
    pub constraints: Vec<usize>,
    pub premises: Vec<IntLiteral>,
    pub conclusion: Conclusion,
}

impl Display for ExplanationStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.premises.is_empty() {
            write!(f, "true")?;
        } else {
            write_literals(f, &self.premises)?;
        }
        write!(f, " => {}", self.conclusion)
    }
}

fn write_literals(f: &mut Formatter<'_>, literals: &[IntLiteral]) -> std::fmt::Result {
    for (position, literal) in literals.iter().enumerate() {
        if position > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{literal}")?;
    }
    Ok(())
}

/// The indicators of the literals `x != v` and `x == v` for one value of a variable.
#[derive(Clone, Copy, Debug)]
struct ValueIndicators {
    excluded: Indicator,
    assigned: Indicator,
}

/// Builds step-wise explanations for a fixed set of constraints.
///
/// The explainer keeps its oracles and the propagation cache for its whole lifetime, so repeated
/// calls share their work.
#[derive(Debug)]
pub struct StepwiseExplainer {
    constraints: Vec<IntConstraint>,
    variables: FnvHashMap<DomainId, IntVariable>,
    initial: DomainSnapshot,
    /// The oracle with only the variables, from which the premise minimisation starts.
    base: FiniteDomainOracle,
    /// Its soft constraints are the constraints, followed by the literals `x != v` and then the
    /// literals `x == v` for every initial value.
    extractor: ConflictExtractor<FiniteDomainOracle>,
    literals: FnvHashMap<(DomainId, i64), ValueIndicators>,
    /// The weight of every soft constraint of the extractor; any single constraint outweighs all
    /// literals together.
    weights: Vec<u64>,
    propagator: Propagator,
    statistics: StepwiseStatistics,
}

impl StepwiseExplainer {
    /// Creates an explainer for the `constraints` over the `variables`; the `oracle` should hold
    /// the variables and nothing else.
    pub fn new(
        oracle: FiniteDomainOracle,
        variables: Vec<IntVariable>,
        constraints: Vec<IntConstraint>,
    ) -> Result<Self, ExplanationError> {
        let initial = DomainSnapshot::new(variables.iter().map(|variable| {
            let values = (oracle.lower_bound(variable)..=oracle.upper_bound(variable)).collect();
            (variable.domain(), values)
        }));
        explainer_assert_simple!(
            constraints.iter().all(|constraint| constraint
                .scope()
                .iter()
                .all(|domain| !initial.values(*domain).is_empty())),
            "every constraint has to be over the given variables"
        );

        let value_literals = variables
            .iter()
            .flat_map(|variable| {
                initial
                    .values(variable.domain())
                    .iter()
                    .map(move |&value| (variable, value))
            })
            .collect::<Vec<_>>();

        let num_constraints = constraints.len();
        let num_values = value_literals.len();
        let literals = value_literals
            .iter()
            .enumerate()
            .map(|(index, &(variable, value))| {
                let indicators = ValueIndicators {
                    excluded: Indicator::new((num_constraints + index) as u32),
                    assigned: Indicator::new((num_constraints + num_values + index) as u32),
                };
                ((variable.domain(), value), indicators)
            })
            .collect();

        let soft = constraints
            .iter()
            .cloned()
            .chain(value_literals.iter().map(|&(variable, value)| {
                constraints::clause([IntLiteral::NotEquals(variable.clone(), value)])
            }))
            .chain(value_literals.iter().map(|&(variable, value)| {
                constraints::clause([IntLiteral::Equals(variable.clone(), value)])
            }))
            .collect::<Vec<_>>();

        let constraint_weight = 2 * num_values as u64 + 1;
        let weights = (0..soft.len())
            .map(|index| {
                if index < num_constraints {
                    constraint_weight
                } else {
                    1
                }
            })
            .collect();

        let base = oracle.clone();
        let extractor = ConflictExtractor::new(oracle, vec![], soft, ExtractorOptions::default())?;

        info!(
            "Explaining with {num_constraints} constraints over {} variables with {num_values} values",
            variables.len()
        );

        Ok(StepwiseExplainer {
            constraints,
            variables: variables
                .into_iter()
                .map(|variable| (variable.domain(), variable))
                .collect(),
            initial,
            base,
            extractor,
            literals,
            weights,
            propagator: Propagator::default(),
            statistics: StepwiseStatistics::default(),
        })
    }

    pub fn constraints(&self) -> &[IntConstraint] {
        &self.constraints
    }

    pub fn initial_domains(&self) -> &DomainSnapshot {
        &self.initial
    }

    /// The goal of explaining why the constraints have no solution.
    pub fn conflict_goal(&self) -> DomainSnapshot {
        DomainSnapshot::conflict(self.initial.domains())
    }

    pub fn statistics(&self) -> StepwiseStatistics {
        StepwiseStatistics {
            num_propagations: self.propagator.num_propagations,
            num_propagation_cache_hits: self.propagator.num_cache_hits,
            ..self.statistics
        }
    }

    pub fn log_statistics(&self, statistic_logger: StatisticLogger) {
        self.statistics()
            .log(statistic_logger.attach_to_prefix("stepwise"));
        self.extractor
            .log_statistics(statistic_logger.attach_to_prefix("extractor"));
    }

    /// Explains how the constraints lead from the initial domains to the `goal`, which has to
    /// hold every variable; see the [module documentation](self).
    pub fn find_sequence(
        &mut self,
        goal: &DomainSnapshot,
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<ExplanationStep>, StepwiseError> {
        let greedy = self.construct_greedy(goal, termination)?;
        let filtered = self.filter_sequence(greedy, goal, termination)?;
        let relaxed = self.relax_sequence(&filtered, goal, termination)?;
        let explanation = self.make_pertinent(&relaxed, goal);

        info!(
            "Explained the goal in {} steps using {} constraints",
            explanation.len(),
            explanation
                .iter()
                .map(|step| step.constraints.len())
                .sum::<usize>()
        );
        Ok(explanation)
    }

    /// The literal `x != value` for the variable `x` of the domain.
    fn excluded_literal(&self, (domain, value): (DomainId, i64)) -> Option<IntLiteral> {
        self.variables
            .get(&domain)
            .map(|variable| IntLiteral::NotEquals(variable.clone(), value))
    }

    fn propagate(
        &mut self,
        subset: &[usize],
        domains: &DomainSnapshot,
        termination: &mut impl TerminationCondition,
    ) -> Result<DomainSnapshot, ExplanationError> {
        self.propagator
            .propagate(&self.constraints, subset, domains, termination)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use explainer_core::termination::Indefinite;

    use super::*;

    fn literal_texts(literals: &[IntLiteral]) -> Vec<String> {
        literals.iter().map(|literal| literal.to_string()).collect()
    }

    fn conclusions(steps: &[ExplanationStep]) -> BTreeSet<String> {
        steps
            .iter()
            .flat_map(|step| match &step.conclusion {
                Conclusion::Literals(literals) => literal_texts(literals),
                Conclusion::Conflict => vec![],
            })
            .collect()
    }

    /// `x < y` and `y < z` over `{1, 2, 3}`, whose only solution is `x = 1, y = 2, z = 3`.
    fn chain() -> (StepwiseExplainer, DomainSnapshot) {
        let mut oracle = FiniteDomainOracle::default();
        let x = oracle.new_variable(1, 3, "x");
        let y = oracle.new_variable(1, 3, "y");
        let z = oracle.new_variable(1, 3, "z");

        let constraints = vec![
            constraints::less_than_or_equals(vec![(1, x.clone()), (-1, y.clone())], -1),
            constraints::less_than_or_equals(vec![(1, y.clone()), (-1, z.clone())], -1),
        ];
        let goal = DomainSnapshot::assignment([(x.domain(), 1), (y.domain(), 2), (z.domain(), 3)]);

        let explainer = StepwiseExplainer::new(oracle, vec![x, y, z], constraints)
            .expect("all constraints can be reified");
        (explainer, goal)
    }

    #[test]
    fn every_removed_value_of_the_solution_is_concluded_once() {
        let (mut explainer, goal) = chain();

        let steps = explainer
            .find_sequence(&goal, &mut Indefinite)
            .expect("the goal is implied");

        assert_eq!(steps.len(), 3);
        assert!(steps.iter().all(|step| step.constraints.len() == 1));

        let expected = ["x != 2", "x != 3", "y != 1", "y != 3", "z != 1", "z != 2"]
            .map(str::to_owned)
            .into_iter()
            .collect::<BTreeSet<_>>();
        assert_eq!(conclusions(&steps), expected);
        let num_conclusions = steps
            .iter()
            .map(|step| match &step.conclusion {
                Conclusion::Literals(literals) => literals.len(),
                Conclusion::Conflict => 0,
            })
            .sum::<usize>();
        assert_eq!(num_conclusions, expected.len());
    }

    #[test]
    fn premises_are_concluded_by_earlier_steps() {
        let (mut explainer, goal) = chain();

        let steps = explainer
            .find_sequence(&goal, &mut Indefinite)
            .expect("the goal is implied");

        for (index, step) in steps.iter().enumerate() {
            let earlier = conclusions(&steps[..index]);
            for premise in literal_texts(&step.premises) {
                assert!(earlier.contains(&premise), "{premise} is not derived before step {index}");
            }
        }

        let concluding_x = steps
            .iter()
            .find(|&step| conclusions(std::slice::from_ref(step)).contains("x != 2"))
            .expect("some step concludes x != 2");
        assert_eq!(literal_texts(&concluding_x.premises), vec!["y != 3"]);
    }

    #[test]
    fn unsatisfiable_constraints_end_in_a_conflict() {
        let mut oracle = FiniteDomainOracle::default();
        let x = oracle.new_variable(0, 1, "x");
        let y = oracle.new_variable(0, 1, "y");
        let constraints = vec![
            constraints::less_than_or_equals(vec![(1, x.clone()), (-1, y.clone())], -1),
            constraints::less_than_or_equals(vec![(1, y.clone()), (-1, x.clone())], -1),
        ];
        let mut explainer = StepwiseExplainer::new(oracle, vec![x, y], constraints)
            .expect("all constraints can be reified");

        let goal = explainer.conflict_goal();
        let steps = explainer
            .find_sequence(&goal, &mut Indefinite)
            .expect("the constraints are unsatisfiable");

        assert_eq!(steps.len(), 2);
        assert!(steps[0].premises.is_empty());
        assert_eq!(steps[1].conclusion, Conclusion::Conflict);
        assert_eq!(steps[1].premises.len(), 1);
        assert_eq!(
            steps[0].conclusion,
            Conclusion::Literals(steps[1].premises.clone())
        );
        assert_ne!(steps[0].constraints, steps[1].constraints);
    }

    #[test]
    fn replaying_the_sequence_hits_the_propagation_cache() {
        let (mut explainer, goal) = chain();

        let _ = explainer
            .find_sequence(&goal, &mut Indefinite)
            .expect("the goal is implied");

        let statistics = explainer.statistics();
        assert_eq!(statistics.num_steps, 3);
        assert!(statistics.num_propagation_cache_hits > 0);
    }

    #[test]
    fn goals_which_are_not_implied_get_stuck() {
        let mut oracle = FiniteDomainOracle::default();
        let x = oracle.new_variable(1, 2, "x");
        let constraints = vec![constraints::greater_than_or_equals(vec![(1, x.clone())], 1)];
        let goal = DomainSnapshot::assignment([(x.domain(), 2)]);
        let mut explainer = StepwiseExplainer::new(oracle, vec![x], constraints)
            .expect("all constraints can be reified");

        assert_eq!(
            explainer.find_sequence(&goal, &mut Indefinite),
            Err(StepwiseError::Stuck { remaining: 1 })
        );
    }

    #[test]
    fn steps_are_printed_as_implications() {
        let mut oracle = FiniteDomainOracle::default();
        let x = oracle.new_variable(0, 1, "x");

        let step = ExplanationStep {
            constraints: vec![0],
            premises: vec![IntLiteral::NotEquals(x.clone(), 0)],
            conclusion: Conclusion::Conflict,
        };
        assert_eq!(step.to_string(), "x != 0 => false");

        let step = ExplanationStep {
            constraints: vec![1],
            premises: vec![],
            conclusion: Conclusion::Literals(vec![
                IntLiteral::NotEquals(x.clone(), 1),
                IntLiteral::NotEquals(x, 0),
            ]),
        };
        assert_eq!(step.to_string(), "true => x != 1, x != 0");
    }
}
