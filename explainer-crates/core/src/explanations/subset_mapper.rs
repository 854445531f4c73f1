use log::debug;
use log::info;

use super::ConflictExtractor;
use crate::basic_types::ExplanationError;
use crate::basic_types::Feasibility;
use crate::create_statistics_struct;
use crate::explainer_assert_simple;
use crate::oracle::inconclusive;
use crate::oracle::ConstraintOracle;
use crate::oracle::Oracle;
use crate::oracle::SolveOutcome;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;
use crate::termination::check_budget;
use crate::termination::TerminationCondition;
use crate::variables::Indicator;

create_statistics_struct!(
    /// Statistics of a [`SubsetMapper`].
    MapperStatistics {
        num_seeds: usize,
        num_mus: usize,
        num_mss: usize,
});

/// A subset of the soft constraints found during enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LatticeSubset {
    /// A minimal unsatisfiable subset.
    Mus(Vec<Indicator>),
    /// A maximal satisfiable subset; its complement is a minimal correction subset.
    Mss(Vec<Indicator>),
}

/// Enumerates all MUSes and MSSes of a model.
///
/// The map oracle tracks which subsets of the soft constraints have not yet been explored. Every
/// solution of the map is a seed, which is either shrunk into a new MUS (if it is unsatisfiable)
/// or grown into a new MSS (if it is satisfiable). Afterwards the map is restricted such that the
/// same region of subsets is never proposed again:
/// - [`SubsetMapper::block_up`] excludes a MUS and all of its supersets,
/// - [`SubsetMapper::block_down`] excludes an MSS and all of its subsets.
///
/// Seeds are requested with all indicators hinted to true, so that they tend to be large; large
/// unsatisfiable seeds shrink quickly into conflicts.
#[derive(Debug)]
pub struct SubsetMapper<O: ConstraintOracle, M: Oracle> {
    extractor: ConflictExtractor<O>,
    map: M,
    statistics: MapperStatistics,
}

impl<O: ConstraintOracle, M: Oracle> SubsetMapper<O, M> {
    /// Creates a mapper over the soft constraints of the `extractor`; the `map` oracle should not
    /// contain any indicators yet.
    pub fn new(extractor: ConflictExtractor<O>, mut map: M) -> Self {
        explainer_assert_simple!(map.num_indicators() == 0);

        for indicator in extractor.model().indicators() {
            let created = map.new_indicator();
            explainer_assert_simple!(created == indicator);
        }

        SubsetMapper {
            extractor,
            map,
            statistics: MapperStatistics::default(),
        }
    }

    pub fn extractor(&self) -> &ConflictExtractor<O> {
        &self.extractor
    }

    pub fn statistics(&self) -> MapperStatistics {
        self.statistics
    }

    pub fn log_statistics(&self, statistic_logger: StatisticLogger) {
        self.statistics
            .log(statistic_logger.attach_to_prefix("mapper"));
        self.extractor
            .log_statistics(statistic_logger.attach_to_prefix("extractor"));
    }

    /// Returns the next unexplored subset of the soft constraints, or [`None`] if every subset has
    /// been explored.
    pub fn next_seed(
        &mut self,
        termination: &mut impl TerminationCondition,
    ) -> Result<Option<Vec<Indicator>>, ExplanationError> {
        check_budget(termination)?;

        let hints = self
            .extractor
            .model()
            .indicators()
            .map(|indicator| (indicator, true))
            .collect::<Vec<_>>();
        self.map.hint(&hints);

        match self.map.solve(&[], termination) {
            SolveOutcome::Satisfiable => {
                self.statistics.num_seeds += 1;
                let seed = self
                    .extractor
                    .model()
                    .indicators()
                    .filter(|&indicator| self.map.indicator_value(indicator) == Some(true))
                    .collect();
                Ok(Some(seed))
            }
            SolveOutcome::Unsatisfiable => Ok(None),
            SolveOutcome::Unknown => Err(inconclusive(termination)),
        }
    }

    /// Excludes the satisfiable subset and all of its subsets from future seeds.
    pub fn block_down(&mut self, satisfiable: &[Indicator]) {
        let correction = self.extractor.correction_subset(satisfiable);
        self.map.add_clause(
            correction
                .into_iter()
                .map(|indicator| indicator.positive())
                .collect(),
        );
    }

    /// Excludes the conflict and all of its supersets from future seeds.
    pub fn block_up(&mut self, conflict: &[Indicator]) {
        self.map.add_clause(
            conflict
                .iter()
                .map(|indicator| indicator.negative())
                .collect(),
        );
    }

    /// Explores the next seed, returning [`None`] when the enumeration is complete.
    pub fn next_subset(
        &mut self,
        termination: &mut impl TerminationCondition,
    ) -> Result<Option<LatticeSubset>, ExplanationError> {
        let Some(seed) = self.next_seed(termination)? else {
            debug!("The map is exhausted, enumeration is complete");
            return Ok(None);
        };

        match self.extractor.check_subset(&seed, termination)? {
            Feasibility::Satisfiable => {
                let satisfiable = self.extractor.grow(&seed, termination)?;
                self.block_down(&satisfiable);
                self.statistics.num_mss += 1;

                info!("Found an MSS of size {}", satisfiable.len());
                Ok(Some(LatticeSubset::Mss(satisfiable)))
            }
            Feasibility::Unsatisfiable(core) => {
                let conflict = self.extractor.shrink_core(core, termination)?;
                self.block_up(&conflict);
                self.statistics.num_mus += 1;

                info!("Found a MUS of size {}", conflict.len());
                Ok(Some(LatticeSubset::Mus(conflict)))
            }
        }
    }

    /// Enumerates all remaining MUSes and MSSes.
    pub fn enumerate(
        &mut self,
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<LatticeSubset>, ExplanationError> {
        let mut subsets = vec![];
        while let Some(subset) = self.next_subset(termination)? {
            subsets.push(subset);
        }

        Ok(subsets)
    }
}
