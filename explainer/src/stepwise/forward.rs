use explainer_core::explanations::HittingSetOptimizer;
use explainer_core::options::HittingSetOptions;
use explainer_core::termination::TerminationCondition;
use explainer_core::ExplanationError;
use log::debug;

use super::DomainSnapshot;
use super::Step;
use super::StepwiseError;
use super::StepwiseExplainer;
use crate::oracles::ClauseOracle;

impl StepwiseExplainer {
    /// Finds the step from `domains` towards the `goal` which uses the fewest constraints.
    ///
    /// The step is an optimal unsatisfiable subset of the constraints, the literals `x != v` for
    /// the values already removed from `domains`, and exactly one literal `x == v` for a value
    /// which is still in `domains` but not in the `goal`. Its constraints are then propagated on
    /// `domains`, which removes at least that value.
    pub fn smallest_next_step(
        &mut self,
        domains: &DomainSnapshot,
        goal: &DomainSnapshot,
        termination: &mut impl TerminationCondition,
    ) -> Result<Step, StepwiseError> {
        let mut optimizer = HittingSetOptimizer::new(
            ClauseOracle::default(),
            self.weights.clone(),
            HittingSetOptions::default(),
        );

        let mut targets = vec![];
        for (&(domain, value), indicators) in &self.literals {
            if domains.contains(domain, value) {
                optimizer.forbid(indicators.excluded);
                if goal.contains(domain, value) {
                    optimizer.forbid(indicators.assigned);
                } else {
                    targets.push(indicators.assigned);
                }
            } else {
                optimizer.forbid(indicators.assigned);
            }
        }
        let remaining = targets.len();
        if remaining == 0 {
            return Err(StepwiseError::Stuck { remaining });
        }
        targets.sort_unstable();
        optimizer.exactly_one_of(&targets);

        let conflict = match optimizer.optimal_mus(&mut self.extractor, termination) {
            Ok(conflict) => conflict,
            Err(ExplanationError::NoConflict) => return Err(StepwiseError::Stuck { remaining }),
            Err(error) => return Err(error.into()),
        };

        let mut constraints = conflict
            .iter()
            .map(|indicator| indicator.id() as usize)
            .filter(|&index| index < self.constraints.len())
            .collect::<Vec<_>>();
        constraints.sort_unstable();

        let output = self.propagate(&constraints, domains, termination)?;
        if output == *domains {
            return Err(StepwiseError::Stuck { remaining });
        }

        self.statistics.num_steps += 1;
        debug!(
            "Step {} applies {constraints:?} and removes {} values",
            self.statistics.num_steps,
            domains.num_values() - output.num_values()
        );
        Ok(Step {
            constraints,
            input: domains.clone(),
            output,
        })
    }

    /// Takes the smallest next step until the goal is reached.
    pub fn construct_greedy(
        &mut self,
        goal: &DomainSnapshot,
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Step>, StepwiseError> {
        let mut domains = self.initial.clone();
        let mut steps = vec![];

        while !reaches_goal(&domains, goal) {
            let step = self.smallest_next_step(&domains, goal, termination)?;
            domains = step.output.clone();
            steps.push(step);
        }

        Ok(steps)
    }
}

/// Whether the `domains` are within the `goal`; a conflict goal is reached by any conflict.
pub(super) fn reaches_goal(domains: &DomainSnapshot, goal: &DomainSnapshot) -> bool {
    if goal.is_conflict() {
        domains.is_conflict()
    } else {
        domains.is_subset_of(goal)
    }
}
