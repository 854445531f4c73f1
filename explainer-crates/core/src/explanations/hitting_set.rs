use log::debug;
use log::info;

use super::ConflictExtractor;
use crate::basic_types::ExplanationError;
use crate::basic_types::Feasibility;
use crate::containers::KeyedVec;
use crate::create_statistics_struct;
use crate::explainer_assert_eq_simple;
use crate::explainer_assert_simple;
use crate::options::CorrectionStrategy;
use crate::options::HittingSetOptions;
use crate::oracle::inconclusive;
use crate::oracle::ConstraintOracle;
use crate::oracle::OptimisationOracle;
use crate::oracle::SolveOutcome;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;
use crate::termination::check_budget;
use crate::termination::TerminationCondition;
use crate::variables::Indicator;

/// Minimum-weight hitting sets over a growing collection of sets of indicators.
#[derive(Debug)]
pub(crate) struct HittingSets<H> {
    oracle: H,
    num_indicators: usize,
}

impl<H: OptimisationOracle> HittingSets<H> {
    pub(crate) fn new(mut oracle: H, weights: &[u64]) -> Self {
        explainer_assert_simple!(oracle.num_indicators() == 0);

        let objective = weights
            .iter()
            .map(|&weight| (oracle.new_indicator(), weight))
            .collect::<Vec<_>>();
        oracle.minimise(objective);

        HittingSets {
            oracle,
            num_indicators: weights.len(),
        }
    }

    /// Every future hitting set contains at least one indicator of `set`.
    pub(crate) fn require_hit(&mut self, set: &[Indicator]) {
        self.oracle
            .add_clause(set.iter().map(|indicator| indicator.positive()).collect());
    }

    pub(crate) fn exclude(&mut self, indicator: Indicator) {
        self.oracle.add_clause(vec![indicator.negative()]);
    }

    pub(crate) fn exactly_one(&mut self, group: &[Indicator]) {
        self.oracle.add_exactly_one(group);
    }

    /// Computes a minimum-weight hitting set, or [`None`] if no set hits everything required.
    pub(crate) fn minimum(
        &mut self,
        termination: &mut impl TerminationCondition,
    ) -> Result<Option<Vec<Indicator>>, ExplanationError> {
        check_budget(termination)?;

        match self.oracle.solve(&[], termination) {
            SolveOutcome::Satisfiable => Ok(Some(
                (0..self.num_indicators as u32)
                    .map(Indicator::new)
                    .filter(|&indicator| self.oracle.indicator_value(indicator) == Some(true))
                    .collect(),
            )),
            SolveOutcome::Unsatisfiable => Ok(None),
            SolveOutcome::Unknown => Err(inconclusive(termination)),
        }
    }
}

create_statistics_struct!(
    /// Statistics of a [`HittingSetOptimizer`].
    HittingSetStatistics {
        /// The number of hitting sets which were computed.
        num_iterations: usize,
        /// The number of correction subsets which the hitting sets were required to hit.
        num_correction_subsets: usize,
});

/// Computes optimal constrained unsatisfiable subsets (OCUS): unsatisfiable subsets of minimum
/// total weight, optionally restricted to contain exactly one constraint of a given group.
///
/// The optimizer is the implicit hitting set dual of MUS extraction. Every unsatisfiable subset
/// intersects every correction subset; conversely, a minimum-weight set which hits all correction
/// subsets and is unsatisfiable is an optimal conflict. The optimizer alternates between computing
/// a minimum-weight hitting set of the correction subsets found so far, and, when the hitting set
/// turns out to be satisfiable, finding new correction subsets it does not hit.
///
/// The optimizer owns its hitting-set oracle; the [`ConflictExtractor`] which answers the
/// feasibility checks is lent to it for each call.
#[derive(Debug)]
pub struct HittingSetOptimizer<H: OptimisationOracle> {
    hitting_sets: HittingSets<H>,
    weights: KeyedVec<Indicator, u64>,
    /// Constraints which may not be part of any future conflict.
    forbidden: KeyedVec<Indicator, bool>,
    options: HittingSetOptions,
    statistics: HittingSetStatistics,
}

impl<H: OptimisationOracle> HittingSetOptimizer<H> {
    /// Creates an optimizer which weighs the soft constraint with indicator `k` by `weights[k]`;
    /// the `oracle` should not contain any indicators yet.
    pub fn new(oracle: H, weights: Vec<u64>, options: HittingSetOptions) -> Self {
        let num_indicators = weights.len();

        HittingSetOptimizer {
            hitting_sets: HittingSets::new(oracle, &weights),
            weights: KeyedVec::from(weights),
            forbidden: KeyedVec::filled(num_indicators, false),
            options,
            statistics: HittingSetStatistics::default(),
        }
    }

    /// Creates an optimizer which minimises the number of constraints in the conflict.
    pub fn with_unit_weights(oracle: H, num_indicators: usize, options: HittingSetOptions) -> Self {
        HittingSetOptimizer::new(oracle, vec![1; num_indicators], options)
    }

    pub fn statistics(&self) -> HittingSetStatistics {
        self.statistics
    }

    pub fn log_statistics(&self, statistic_logger: StatisticLogger) {
        self.statistics.log(statistic_logger);
    }

    /// The total weight of the given constraints.
    pub fn weight(&self, subset: &[Indicator]) -> u64 {
        subset.iter().map(|&indicator| self.weights[indicator]).sum()
    }

    /// Restricts future conflicts to contain exactly one constraint of the `group`.
    pub fn exactly_one_of(&mut self, group: &[Indicator]) {
        self.hitting_sets.exactly_one(group);
    }

    /// Excludes the constraint from all future conflicts.
    pub fn forbid(&mut self, indicator: Indicator) {
        if !self.forbidden[indicator] {
            self.forbidden[indicator] = true;
            self.hitting_sets.exclude(indicator);
        }
    }

    /// The constraints which have not been forbidden.
    pub fn allowed(&self) -> Vec<Indicator> {
        self.forbidden
            .keys()
            .filter(|&indicator| !self.forbidden[indicator])
            .collect()
    }

    /// Computes a minimum-weight unsatisfiable subset of the allowed constraints.
    ///
    /// Returns [`ExplanationError::NoConflict`] if the allowed constraints are satisfiable, or if
    /// no unsatisfiable subset meets the exactly-one restriction.
    pub fn optimal_mus<O: ConstraintOracle>(
        &mut self,
        extractor: &mut ConflictExtractor<O>,
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Indicator>, ExplanationError> {
        explainer_assert_eq_simple!(
            extractor.model().num_soft_constraints(),
            self.weights.len(),
            "every soft constraint needs a weight"
        );

        let allowed = self.allowed();

        loop {
            let Some(mut hitting_set) = self.hitting_sets.minimum(termination)? else {
                debug!("No hitting set remains, the allowed constraints have no conflict");
                return Err(ExplanationError::NoConflict);
            };
            self.statistics.num_iterations += 1;
            explainer_assert_simple!(hitting_set
                .iter()
                .all(|&indicator| !self.forbidden[indicator]));

            if let Feasibility::Unsatisfiable(_) =
                extractor.solve_for_values(&hitting_set, termination)?
            {
                extractor.sort_in_order(&mut hitting_set);
                info!(
                    "Found an optimal conflict of size {} and weight {} after {} hitting sets",
                    hitting_set.len(),
                    self.weight(&hitting_set),
                    self.statistics.num_iterations
                );
                return Ok(hitting_set);
            }

            match self.options.correction_strategy {
                CorrectionStrategy::Greedy => {
                    self.add_disjoint_corrections(extractor, &allowed, termination)?
                }
                CorrectionStrategy::Grow => {
                    let satisfiable = extractor.grow_within(&hitting_set, &allowed, termination)?;
                    let correction = allowed
                        .iter()
                        .copied()
                        .filter(|indicator| !satisfiable.contains(indicator))
                        .collect::<Vec<_>>();
                    if correction.is_empty() {
                        return Err(ExplanationError::NoConflict);
                    }

                    self.add_correction(&correction);
                }
            }
        }
    }

    /// Reads correction subsets off the solution left in the oracle, repeatedly activating the
    /// constraints of the last correction subset until the activated set is unsatisfiable. The
    /// correction subsets found this way are pairwise disjoint.
    fn add_disjoint_corrections<O: ConstraintOracle>(
        &mut self,
        extractor: &mut ConflictExtractor<O>,
        allowed: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> Result<(), ExplanationError> {
        let mut activated: Vec<Indicator> = vec![];

        loop {
            let correction = extractor
                .falsified_constraints(allowed)
                .into_iter()
                .filter(|indicator| !activated.contains(indicator))
                .collect::<Vec<_>>();
            if correction.is_empty() {
                debug!("A solution satisfies every allowed constraint");
                return Err(ExplanationError::NoConflict);
            }

            self.add_correction(&correction);
            activated.extend(correction);

            if !extractor
                .solve_for_values(&activated, termination)?
                .is_satisfiable()
            {
                return Ok(());
            }
        }
    }

    fn add_correction(&mut self, correction: &[Indicator]) {
        self.statistics.num_correction_subsets += 1;
        self.hitting_sets.require_hit(correction);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::options::ExtractorOptions;
    use crate::oracle::test_oracles::TestConstraint;
    use crate::oracle::test_oracles::TestHittingSetOracle;
    use crate::oracle::test_oracles::TestOracle;
    use crate::termination::Indefinite;
    use crate::termination::TimeBudget;

    fn indicators(ids: &[u32]) -> Vec<Indicator> {
        ids.iter().map(|&id| Indicator::new(id)).collect()
    }

    fn extractor(num_constraints: usize, conflicts: &[&[u32]]) -> ConflictExtractor<TestOracle> {
        let names = ["a", "b", "c", "d", "e"];
        ConflictExtractor::new(
            TestOracle::with_conflicts(conflicts),
            vec![],
            names[..num_constraints]
                .iter()
                .map(|name| TestConstraint::new(name)),
            ExtractorOptions::default(),
        )
        .expect("test constraints can be reified")
    }

    fn optimizer(
        weights: Vec<u64>,
        strategy: CorrectionStrategy,
    ) -> HittingSetOptimizer<TestHittingSetOracle> {
        HittingSetOptimizer::new(
            TestHittingSetOracle::default(),
            weights,
            HittingSetOptions {
                correction_strategy: strategy,
            },
        )
    }

    #[test]
    fn finds_the_conflict_of_minimum_weight() {
        for strategy in [CorrectionStrategy::Greedy, CorrectionStrategy::Grow] {
            let mut extractor = extractor(4, &[&[0, 1], &[2], &[1, 3]]);
            let mut optimizer = optimizer(vec![1, 1, 5, 1], strategy);

            let conflict = optimizer
                .optimal_mus(&mut extractor, &mut Indefinite)
                .expect("the constraints are unsatisfiable");

            assert_eq!(optimizer.weight(&conflict), 2, "{strategy:?}");
            assert!(
                conflict == indicators(&[0, 1]) || conflict == indicators(&[1, 3]),
                "{strategy:?}: {conflict:?}"
            );
        }
    }

    #[test]
    fn unit_weights_prefer_the_smallest_conflict() {
        let mut extractor = extractor(4, &[&[0, 1, 2], &[3]]);
        let mut optimizer = HittingSetOptimizer::with_unit_weights(
            TestHittingSetOracle::default(),
            4,
            HittingSetOptions::default(),
        );

        let conflict = optimizer
            .optimal_mus(&mut extractor, &mut Indefinite)
            .expect("the constraints are unsatisfiable");

        assert_eq!(conflict, indicators(&[3]));
    }

    #[test]
    fn exactly_one_restricts_the_conflict() {
        let mut extractor = extractor(4, &[&[0], &[1, 2], &[2, 3]]);
        let mut optimizer = optimizer(vec![5, 1, 1, 1], CorrectionStrategy::Greedy);
        optimizer.exactly_one_of(&indicators(&[1, 3]));

        let conflict = optimizer
            .optimal_mus(&mut extractor, &mut Indefinite)
            .expect("a conflict with exactly one of the group exists");

        assert!(
            conflict == indicators(&[1, 2]) || conflict == indicators(&[2, 3]),
            "{conflict:?}"
        );
    }

    #[test]
    fn forbidden_constraints_are_never_part_of_a_conflict() {
        let mut extractor = extractor(3, &[&[0], &[1, 2]]);
        let mut optimizer = optimizer(vec![1, 1, 1], CorrectionStrategy::Greedy);
        optimizer.forbid(Indicator::new(0));

        let conflict = optimizer
            .optimal_mus(&mut extractor, &mut Indefinite)
            .expect("the remaining constraints are unsatisfiable");

        assert_eq!(conflict, indicators(&[1, 2]));
        assert_eq!(optimizer.allowed(), indicators(&[1, 2]));
    }

    #[test]
    fn satisfiable_allowed_constraints_have_no_conflict() {
        for strategy in [CorrectionStrategy::Greedy, CorrectionStrategy::Grow] {
            let mut extractor = extractor(3, &[&[0, 1]]);
            let mut optimizer = optimizer(vec![1, 1, 1], strategy);
            optimizer.forbid(Indicator::new(1));

            assert_eq!(
                optimizer.optimal_mus(&mut extractor, &mut Indefinite),
                Err(ExplanationError::NoConflict),
                "{strategy:?}"
            );
        }
    }

    #[test]
    fn exhausted_budget_is_a_timeout() {
        let mut extractor = extractor(2, &[&[0, 1]]);
        let mut optimizer = optimizer(vec![1, 1], CorrectionStrategy::Greedy);

        assert_eq!(
            optimizer.optimal_mus(&mut extractor, &mut TimeBudget::starting_now(Duration::ZERO)),
            Err(ExplanationError::Timeout)
        );
    }
}
