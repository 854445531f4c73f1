use log::info;

use super::hitting_set::HittingSets;
use super::ConflictExtractor;
use crate::basic_types::ExplanationError;
use crate::basic_types::Feasibility;
use crate::containers::KeyedVec;
use crate::create_statistics_struct;
use crate::explainer_assert_eq_simple;
use crate::oracle::ConstraintOracle;
use crate::oracle::OptimisationOracle;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;
use crate::termination::TerminationCondition;
use crate::variables::Indicator;

create_statistics_struct!(
    /// Statistics of a [`CorrectionSetOptimizer`].
    CorrectionSetStatistics {
        num_iterations: usize,
        num_cores: usize,
});

/// Computes correction subsets of minimum total weight: the cheapest sets of soft constraints
/// whose removal makes the model satisfiable.
///
/// Every correction subset hits every unsatisfiable core. The optimizer computes minimum-weight
/// hitting sets of the cores found so far; when removing a hitting set leaves the model
/// satisfiable it is optimal, otherwise the oracle reports a new core which it misses.
#[derive(Debug)]
pub struct CorrectionSetOptimizer<H: OptimisationOracle> {
    hitting_sets: HittingSets<H>,
    weights: KeyedVec<Indicator, u64>,
    statistics: CorrectionSetStatistics,
}

impl<H: OptimisationOracle> CorrectionSetOptimizer<H> {
    /// Creates an optimizer which weighs the soft constraint with indicator `k` by `weights[k]`;
    /// the `oracle` should not contain any indicators yet.
    pub fn new(oracle: H, weights: Vec<u64>) -> Self {
        CorrectionSetOptimizer {
            hitting_sets: HittingSets::new(oracle, &weights),
            weights: KeyedVec::from(weights),
            statistics: CorrectionSetStatistics::default(),
        }
    }

    pub fn with_unit_weights(oracle: H, num_indicators: usize) -> Self {
        CorrectionSetOptimizer::new(oracle, vec![1; num_indicators])
    }

    pub fn statistics(&self) -> CorrectionSetStatistics {
        self.statistics
    }

    pub fn log_statistics(&self, statistic_logger: StatisticLogger) {
        self.statistics.log(statistic_logger);
    }

    pub fn weight(&self, subset: &[Indicator]) -> u64 {
        subset.iter().map(|&indicator| self.weights[indicator]).sum()
    }

    /// Computes a minimum-weight correction subset of the soft constraints.
    ///
    /// Returns an empty set if the model is satisfiable, and
    /// [`ExplanationError::HardConstraintsInfeasible`] if no correction subset exists.
    pub fn optimal_correction_subset<O: ConstraintOracle>(
        &mut self,
        extractor: &mut ConflictExtractor<O>,
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Indicator>, ExplanationError> {
        explainer_assert_eq_simple!(
            extractor.model().num_soft_constraints(),
            self.weights.len(),
            "every soft constraint needs a weight"
        );

        loop {
            let Some(mut hitting_set) = self.hitting_sets.minimum(termination)? else {
                return Err(ExplanationError::HardConstraintsInfeasible);
            };
            self.statistics.num_iterations += 1;

            let remainder = extractor
                .model()
                .indicators()
                .filter(|indicator| !hitting_set.contains(indicator))
                .collect::<Vec<_>>();

            match extractor.check_subset(&remainder, termination)? {
                Feasibility::Satisfiable => {
                    extractor.sort_in_order(&mut hitting_set);
                    info!(
                        "Found an optimal correction subset of size {} and weight {}",
                        hitting_set.len(),
                        self.weight(&hitting_set)
                    );
                    return Ok(hitting_set);
                }
                Feasibility::Unsatisfiable(core) => {
                    if core.is_empty() {
                        return Err(ExplanationError::HardConstraintsInfeasible);
                    }

                    self.statistics.num_cores += 1;
                    self.hitting_sets.require_hit(&core);
                }
            }
        }
    }
}
