//! Counterfactual explanations through inverse optimisation.
//!
//! A user expects a different solution than the one which minimises the objective. The
//! [`InverseOptimisation`] finds the smallest change to the weights of the objective, measured as
//! the sum of the absolute changes, under which the solution of the user is optimal. Only the
//! weights of a chosen set of indicators may change.
use explainer_core::create_statistics_struct;
use explainer_core::oracle::check_assumptions;
use explainer_core::oracle::ConstraintOracle;
use explainer_core::oracle::OptimisationOracle;
use explainer_core::oracle::Oracle;
use explainer_core::statistics::Statistic;
use explainer_core::statistics::StatisticLogger;
use explainer_core::termination::check_budget;
use explainer_core::termination::TerminationCondition;
use explainer_core::variables::Indicator;
use explainer_core::ExplanationError;
use explainer_core::Feasibility;
use log::debug;
use log::info;
use thiserror::Error;

use crate::constraints;
use crate::constraints::IntVariable;
use crate::oracles::FiniteDomainOracle;

create_statistics_struct!(
    /// Statistics of an [`InverseOptimisation`].
    CounterfactualStatistics {
        /// The number of weight changes which were tried on the sub-problem.
        num_iterations: usize,
        /// The number of solutions which were cut off because they beat the choice of the user.
        num_cuts: usize,
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CounterfactualError {
    #[error(transparent)]
    Explanation(#[from] ExplanationError),
    #[error("the chosen indicators cannot be part of any solution")]
    InfeasibleChoice,
    #[error("no change to the allowed weights makes the chosen solution optimal")]
    NoCounterfactual,
}

/// A weight of the objective which may change, and by how much it has changed.
#[derive(Debug)]
struct Change {
    /// The position of the term in the objective.
    term: usize,
    magnitude: IntVariable,
}

/// Computes the weights which make a chosen solution optimal.
///
/// The master problem holds the magnitudes of the changes. The weight of an indicator which the
/// user selects can only decrease, and the weight of any other indicator can only increase;
/// changes in the other direction never help the choice of the user. Every solution of the
/// sub-problem which is still cheaper than the choice adds a constraint to the master problem,
/// until the optimum of the sub-problem costs as much as the choice.
#[derive(Debug)]
pub struct InverseOptimisation<O: OptimisationOracle> {
    sub_problem: O,
    objective: Vec<(Indicator, u64)>,
    changeable: Vec<usize>,
    statistics: CounterfactualStatistics,
}

impl<O: OptimisationOracle> InverseOptimisation<O> {
    /// Creates the inverse problem of minimising `objective` over the `sub_problem`, in which only
    /// the weights of the `changeable` indicators may change.
    pub fn new(sub_problem: O, objective: Vec<(Indicator, u64)>, changeable: &[Indicator]) -> Self {
        let changeable = objective
            .iter()
            .enumerate()
            .filter(|(_, (indicator, _))| changeable.contains(indicator))
            .map(|(term, _)| term)
            .collect();

        InverseOptimisation {
            sub_problem,
            objective,
            changeable,
            statistics: CounterfactualStatistics::default(),
        }
    }

    pub fn statistics(&self) -> CounterfactualStatistics {
        self.statistics
    }

    pub fn log_statistics(&self, statistic_logger: StatisticLogger) {
        self.statistics.log(statistic_logger);
    }

    /// Returns the closest objective under which a solution containing the `choice` is optimal.
    ///
    /// The choice is the set of indicators the user wants to be true. It is completed into a
    /// solution by minimising the original objective with the choice assumed.
    pub fn inverse_optimise(
        &mut self,
        choice: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<(Indicator, u64)>, CounterfactualError> {
        let user = self.complete(choice, termination)?;

        let total_weight = self.objective.iter().map(|&(_, weight)| weight).sum::<u64>();
        let mut master = FiniteDomainOracle::default();
        let changes = self
            .changeable
            .iter()
            .map(|&term| {
                let cap = if user[term] {
                    self.objective[term].1
                } else {
                    total_weight
                };
                Change {
                    term,
                    magnitude: master.new_variable(0, cap as i64, &format!("m{term}")),
                }
            })
            .collect::<Vec<_>>();

        let mut lower_bound = 0;
        loop {
            let (magnitudes, total_change) =
                minimum_change(&mut master, &changes, &mut lower_bound, termination)?;
            self.statistics.num_iterations += 1;

            let weights = self
                .objective
                .iter()
                .enumerate()
                .map(|(term, &(indicator, weight))| {
                    let magnitude = changes
                        .iter()
                        .zip(&magnitudes)
                        .find(|(change, _)| change.term == term)
                        .map_or(0, |(_, &magnitude)| magnitude);
                    let weight = if user[term] {
                        weight - magnitude
                    } else {
                        weight + magnitude
                    };
                    (indicator, weight)
                })
                .collect::<Vec<_>>();

            self.sub_problem.minimise(weights.clone());
            if let Feasibility::Unsatisfiable(_) =
                check_assumptions(&mut self.sub_problem, &[], termination)?
            {
                return Err(CounterfactualError::InfeasibleChoice);
            }
            let optimum = self.solution();

            let user_cost = cost(&weights, &user);
            let optimum_cost = cost(&weights, &optimum);
            if user_cost <= optimum_cost {
                info!(
                    "Changed the weights by {total_change} in total after {} iterations",
                    self.statistics.num_iterations
                );
                return Ok(weights);
            }

            let gap = cost(&self.objective, &user) as i64 - cost(&self.objective, &optimum) as i64;
            let differing = changes
                .iter()
                .filter(|change| user[change.term] != optimum[change.term])
                .map(|change| (1, change.magnitude.clone()))
                .collect::<Vec<_>>();
            if differing.is_empty() {
                debug!("A solution beats the choice by {gap} and no allowed weight can change that");
                return Err(CounterfactualError::NoCounterfactual);
            }

            debug!("Cutting off a solution which is cheaper than the choice by {gap}");
            self.statistics.num_cuts += 1;
            master.post(constraints::greater_than_or_equals(differing, gap));
        }
    }

    /// Completes the `choice` into a solution of minimum original cost.
    fn complete(
        &mut self,
        choice: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<bool>, CounterfactualError> {
        self.sub_problem.minimise(self.objective.clone());

        match check_assumptions(&mut self.sub_problem, choice, termination)? {
            Feasibility::Satisfiable => Ok(self.solution()),
            Feasibility::Unsatisfiable(_) => Err(CounterfactualError::InfeasibleChoice),
        }
    }

    /// Whether every term of the objective is true in the last solution of the sub-problem.
    fn solution(&self) -> Vec<bool> {
        self.objective
            .iter()
            .map(|&(indicator, _)| self.sub_problem.indicator_value(indicator) == Some(true))
            .collect()
    }
}

/// Finds magnitudes of least total sum which satisfy the master problem, raising the bound one
/// step at a time from `lower_bound`. Every bound which is proven infeasible is added to the
/// master problem, so the next call starts where this one ended.
fn minimum_change(
    master: &mut FiniteDomainOracle,
    changes: &[Change],
    lower_bound: &mut i64,
    termination: &mut impl TerminationCondition,
) -> Result<(Vec<u64>, i64), CounterfactualError> {
    let terms = changes
        .iter()
        .map(|change| (1, change.magnitude.clone()))
        .collect::<Vec<_>>();

    if let Feasibility::Unsatisfiable(_) = check_assumptions(master, &[], termination)? {
        return Err(CounterfactualError::NoCounterfactual);
    }
    let primal = total(master, changes);
    let mut best = magnitudes(master, changes);

    while *lower_bound < primal {
        check_budget(termination)?;

        let bound = master.new_indicator();
        master.post_implication(
            bound,
            constraints::less_than_or_equals(terms.clone(), *lower_bound),
        );
        match check_assumptions(master, &[bound], termination)? {
            Feasibility::Satisfiable => {
                best = magnitudes(master, changes);
                break;
            }
            Feasibility::Unsatisfiable(_) => {
                master.post(constraints::greater_than_or_equals(
                    terms.clone(),
                    *lower_bound + 1,
                ));
                *lower_bound += 1;
            }
        }
    }

    let total_change = best.iter().sum::<u64>() as i64;
    *lower_bound = total_change;
    Ok((best, total_change))
}

fn magnitudes(master: &FiniteDomainOracle, changes: &[Change]) -> Vec<u64> {
    changes
        .iter()
        .map(|change| master.value(&change.magnitude).unwrap_or(0) as u64)
        .collect()
}

fn total(master: &FiniteDomainOracle, changes: &[Change]) -> i64 {
    magnitudes(master, changes).iter().sum::<u64>() as i64
}

fn cost(objective: &[(Indicator, u64)], solution: &[bool]) -> u64 {
    objective
        .iter()
        .zip(solution)
        .filter(|(_, is_true)| **is_true)
        .map(|(&(_, weight), _)| weight)
        .sum()
}

#[cfg(test)]
mod tests {
    use explainer_core::termination::Indefinite;

    use super::*;

    /// Three items of weights 1, 2 and 4, of which at least two have to be taken; the cheapest
    /// choice is the first two items.
    fn items(at_most_two: bool) -> (FiniteDomainOracle, Vec<(Indicator, u64)>) {
        let mut oracle = FiniteDomainOracle::default();
        let items = (0..3).map(|_| oracle.new_indicator()).collect::<Vec<_>>();
        let terms = items
            .iter()
            .map(|&item| (1, oracle.indicator_variable(item)))
            .collect::<Vec<_>>();

        oracle.post(constraints::greater_than_or_equals(terms.clone(), 2));
        if at_most_two {
            oracle.post(constraints::less_than_or_equals(terms, 2));
        }

        let objective = items.into_iter().zip([1, 2, 4]).collect();
        (oracle, objective)
    }

    fn weights(objective: &[(Indicator, u64)]) -> Vec<u64> {
        objective.iter().map(|&(_, weight)| weight).collect()
    }

    #[test]
    fn lowering_the_weight_of_a_chosen_item() {
        let (oracle, objective) = items(false);
        let (a, c) = (objective[0].0, objective[2].0);
        let mut inverse = InverseOptimisation::new(oracle, objective, &[c]);

        let result = inverse
            .inverse_optimise(&[a, c], &mut Indefinite)
            .expect("the weight of c can be lowered");

        assert_eq!(weights(&result), vec![1, 2, 2]);
        assert_eq!(inverse.statistics().num_cuts, 1);
        assert_eq!(inverse.statistics().num_iterations, 2);
    }

    #[test]
    fn raising_the_weight_of_an_item_which_is_not_chosen() {
        let (oracle, objective) = items(false);
        let (a, b, c) = (objective[0].0, objective[1].0, objective[2].0);
        let mut inverse = InverseOptimisation::new(oracle, objective, &[b]);

        let result = inverse
            .inverse_optimise(&[a, c], &mut Indefinite)
            .expect("the weight of b can be raised");

        assert_eq!(weights(&result), vec![1, 4, 4]);
    }

    #[test]
    fn optimal_choices_keep_their_weights() {
        let (oracle, objective) = items(false);
        let (a, b) = (objective[0].0, objective[1].0);
        let mut inverse = InverseOptimisation::new(oracle, objective.clone(), &[a, b]);

        let result = inverse
            .inverse_optimise(&[b], &mut Indefinite)
            .expect("the choice is already optimal");

        assert_eq!(result, objective);
        assert_eq!(inverse.statistics().num_cuts, 0);
    }

    #[test]
    fn weights_which_do_not_separate_the_solutions_give_no_counterfactual() {
        let (oracle, objective) = items(false);
        let (a, c) = (objective[0].0, objective[2].0);
        let mut inverse = InverseOptimisation::new(oracle, objective, &[a]);

        assert_eq!(
            inverse.inverse_optimise(&[a, c], &mut Indefinite),
            Err(CounterfactualError::NoCounterfactual)
        );
    }

    #[test]
    fn choices_without_solution_are_infeasible() {
        let (oracle, objective) = items(true);
        let all = objective.iter().map(|&(item, _)| item).collect::<Vec<_>>();
        let mut inverse = InverseOptimisation::new(oracle, objective, &all);

        assert_eq!(
            inverse.inverse_optimise(&all, &mut Indefinite),
            Err(CounterfactualError::InfeasibleChoice)
        );
    }
}
