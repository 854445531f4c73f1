use std::collections::BTreeSet;

use explainer_core::explanations::ConflictExtractor;
use explainer_core::options::ExtractorOptions;
use explainer_core::termination::TerminationCondition;
use explainer_core::ExplanationError;
use log::debug;

use super::forward::reaches_goal;
use super::propagation::scope_of;
use super::Conclusion;
use super::DomainSnapshot;
use super::ExplanationStep;
use super::Step;
use super::StepwiseError;
use super::StepwiseExplainer;
use crate::constraints;
use crate::constraints::DomainId;
use crate::constraints::IntConstraint;
use crate::constraints::IntLiteral;

type ValueLiteral = (DomainId, i64);

impl StepwiseExplainer {
    /// Replays the constraints of the `steps` from the initial domains, propagating each of them
    /// as far as possible. Steps which remove nothing are left out, and the sequence ends as
    /// soon as the `goal` is reached.
    pub fn make_maximal(
        &mut self,
        steps: &[Step],
        goal: &DomainSnapshot,
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Step>, StepwiseError> {
        let sequence = steps
            .iter()
            .map(|step| step.constraints.clone())
            .collect::<Vec<_>>();

        self.replay_to_goal(&sequence, goal, termination)
    }

    /// Removes steps from back to front as long as the remaining steps still reach the `goal`.
    pub fn filter_sequence(
        &mut self,
        steps: Vec<Step>,
        goal: &DomainSnapshot,
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Step>, StepwiseError> {
        let mut sequence = steps
            .into_iter()
            .map(|step| step.constraints)
            .collect::<Vec<_>>();

        for index in (0..sequence.len()).rev() {
            let mut candidate = sequence.clone();
            let _ = candidate.remove(index);

            let (_, domains) = self.replay(&candidate, goal, termination)?;
            if reaches_goal(&domains, goal) {
                self.statistics.num_filtered_steps += 1;
                sequence = candidate;
            }
        }

        self.replay_to_goal(&sequence, goal, termination)
    }

    /// Reduces the input of every step to a minimal set of literals `x != v` from which its
    /// constraints still derive what the later steps and the `goal` need.
    ///
    /// The sequence is walked from back to front. Literals which are already needed by a later
    /// step are preferred as premises, so that the earlier steps have to derive as little as
    /// possible. Steps which derive nothing needed are dropped.
    pub fn relax_sequence(
        &mut self,
        steps: &[Step],
        goal: &DomainSnapshot,
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Step>, StepwiseError> {
        let mut required = goal_literals(&self.initial, goal);
        let mut relaxed = vec![];

        for step in steps.iter().rev() {
            let is_conflict = step.output.is_conflict();
            let needed = if is_conflict {
                vec![]
            } else {
                new_literals(&self.initial, step)
                    .into_iter()
                    .filter(|literal| required.contains(literal))
                    .collect::<Vec<_>>()
            };
            if needed.is_empty() && !is_conflict {
                debug!(
                    "Dropping the step with {:?} as nothing it derives is needed",
                    step.constraints
                );
                continue;
            }

            let scope = scope_of(&self.constraints, &step.constraints);
            let candidates = step
                .input
                .excluded_from(&self.initial)
                .into_iter()
                .filter(|(domain, _)| scope.binary_search(domain).is_ok())
                .collect::<Vec<_>>();
            let premises =
                self.minimal_premises(step, &needed, &candidates, &required, termination)?;
            self.statistics.num_relaxed_premises += candidates.len() - premises.len();

            let input = self.initial.excluding(&premises);
            let output = self.propagate(&step.constraints, &input, termination)?;
            let step = Step {
                constraints: step.constraints.clone(),
                input,
                output,
            };

            if is_conflict {
                required.clear();
            } else {
                for literal in new_literals(&self.initial, &step) {
                    let _ = required.remove(&literal);
                }
            }
            required.extend(premises);
            relaxed.push(step);
        }

        relaxed.reverse();
        Ok(relaxed)
    }

    /// Turns the steps into an explanation, in which every step only concludes the literals
    /// which a later step or the `goal` needs and which were not concluded before.
    pub fn make_pertinent(&self, steps: &[Step], goal: &DomainSnapshot) -> Vec<ExplanationStep> {
        let premises = steps
            .iter()
            .map(|step| step.input.excluded_from(&self.initial))
            .collect::<Vec<_>>();

        let mut needed = goal_literals(&self.initial, goal);
        needed.extend(premises.iter().flatten().copied());

        let mut derived = BTreeSet::new();
        steps
            .iter()
            .zip(premises)
            .map(|(step, premises)| {
                let conclusion = if step.output.is_conflict() {
                    Conclusion::Conflict
                } else {
                    let literals = new_literals(&self.initial, step)
                        .into_iter()
                        .filter(|literal| needed.contains(literal) && derived.insert(*literal))
                        .collect::<Vec<_>>();
                    Conclusion::Literals(self.literals_of(&literals))
                };

                ExplanationStep {
                    constraints: step.constraints.clone(),
                    premises: self.literals_of(&premises),
                    conclusion,
                }
            })
            .collect()
    }

    /// Propagates each subset of constraints in turn, starting from the initial domains, and
    /// returns the steps which removed something together with the final domains.
    fn replay(
        &mut self,
        sequence: &[Vec<usize>],
        goal: &DomainSnapshot,
        termination: &mut impl TerminationCondition,
    ) -> Result<(Vec<Step>, DomainSnapshot), ExplanationError> {
        let mut domains = self.initial.clone();
        let mut steps = vec![];

        for constraints in sequence {
            if reaches_goal(&domains, goal) {
                break;
            }

            let output = self.propagate(constraints, &domains, termination)?;
            if output == domains {
                continue;
            }
            steps.push(Step {
                constraints: constraints.clone(),
                input: domains,
                output: output.clone(),
            });
            domains = output;
        }

        Ok((steps, domains))
    }

    fn replay_to_goal(
        &mut self,
        sequence: &[Vec<usize>],
        goal: &DomainSnapshot,
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Step>, StepwiseError> {
        let (steps, domains) = self.replay(sequence, goal, termination)?;
        if reaches_goal(&domains, goal) {
            Ok(steps)
        } else {
            Err(StepwiseError::Stuck {
                remaining: remaining_values(&domains, goal),
            })
        }
    }

    /// A minimal subset of the `candidates` which, together with the constraints of the `step`,
    /// excludes every `needed` literal, or contradicts the constraints if nothing is needed.
    ///
    /// Candidates outside of `required` are minimised first while the required ones are kept;
    /// the required candidates are minimised afterwards.
    fn minimal_premises(
        &self,
        step: &Step,
        needed: &[ValueLiteral],
        candidates: &[ValueLiteral],
        required: &BTreeSet<ValueLiteral>,
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<ValueLiteral>, ExplanationError> {
        let mut hard = step
            .constraints
            .iter()
            .map(|&index| self.constraints[index].clone())
            .collect::<Vec<_>>();
        if !needed.is_empty() {
            let violations = needed
                .iter()
                .filter_map(|&(domain, value)| {
                    self.variables
                        .get(&domain)
                        .map(|variable| IntLiteral::Equals(variable.clone(), value))
                })
                .collect::<Vec<_>>();
            hard.push(constraints::clause(violations));
        }

        let (fresh, reused): (Vec<ValueLiteral>, Vec<ValueLiteral>) = candidates
            .iter()
            .copied()
            .partition(|literal| !required.contains(literal));

        let kept = self.minimise_literals(hard.clone(), &fresh, &reused, termination)?;
        let mut premises = self.minimise_literals(hard, &reused, &kept, termination)?;
        premises.extend(kept);
        premises.sort_unstable();
        Ok(premises)
    }

    /// A minimal subset of `soft` which is unsatisfiable together with `hard` and `fixed`.
    fn minimise_literals(
        &self,
        hard: Vec<IntConstraint>,
        soft: &[ValueLiteral],
        fixed: &[ValueLiteral],
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<ValueLiteral>, ExplanationError> {
        if soft.is_empty() {
            return Ok(vec![]);
        }

        let as_clause = |literal: IntLiteral| constraints::clause([literal]);
        let hard = hard
            .into_iter()
            .chain(self.literals_of(fixed).into_iter().map(as_clause));
        let soft_constraints = self.literals_of(soft).into_iter().map(as_clause);

        let mut extractor = ConflictExtractor::new(
            self.base.clone(),
            hard,
            soft_constraints,
            ExtractorOptions::default(),
        )?;
        let all = extractor.model().indicators().collect::<Vec<_>>();
        let conflict = extractor.shrink(&all, termination)?;

        Ok(conflict
            .into_iter()
            .map(|indicator| soft[indicator.id() as usize])
            .collect())
    }

    fn literals_of(&self, literals: &[ValueLiteral]) -> Vec<IntLiteral> {
        literals
            .iter()
            .filter_map(|&literal| self.excluded_literal(literal))
            .collect()
    }
}

/// The literals `x != v` which the step derives.
fn new_literals(initial: &DomainSnapshot, step: &Step) -> Vec<ValueLiteral> {
    step.output
        .excluded_from(initial)
        .into_iter()
        .filter(|&(domain, value)| step.input.contains(domain, value))
        .collect()
}

/// The literals `x != v` which hold in the goal; none for a conflict.
fn goal_literals(initial: &DomainSnapshot, goal: &DomainSnapshot) -> BTreeSet<ValueLiteral> {
    if goal.is_conflict() {
        BTreeSet::new()
    } else {
        goal.excluded_from(initial).into_iter().collect()
    }
}

fn remaining_values(domains: &DomainSnapshot, goal: &DomainSnapshot) -> usize {
    if goal.is_conflict() {
        return domains.num_values();
    }
    domains
        .domains()
        .map(|domain| {
            domains
                .values(domain)
                .iter()
                .filter(|&&value| !goal.contains(domain, value))
                .count()
        })
        .sum()
}
