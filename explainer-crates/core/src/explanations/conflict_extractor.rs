use log::debug;
use log::trace;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::subset_cache::SubsetCache;
use crate::basic_types::ExplanationError;
use crate::basic_types::Feasibility;
use crate::containers::KeyedVec;
use crate::create_statistics_struct;
use crate::explainer_assert_advanced;
use crate::explainer_assert_simple;
use crate::model::IndicatorModel;
use crate::options::ExtractorOptions;
use crate::options::ShrinkOrder;
use crate::oracle::check_assumptions;
use crate::oracle::ConstraintOracle;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;
use crate::termination::check_budget;
use crate::termination::TerminationCondition;
use crate::variables::Indicator;
use crate::variables::Literal;

create_statistics_struct!(
    /// Statistics of a [`ConflictExtractor`].
    ExtractorStatistics {
        /// The number of calls made to the main oracle.
        num_oracle_calls: usize,
        /// The number of feasibility checks answered from the cache.
        num_cache_hits: usize,
        /// The number of times a shrink step adopted a core smaller than the tested subset.
        num_core_refinements: usize,
        /// The number of removal tests skipped because the constraint was known to be critical.
        num_critical_skips: usize,
        /// The number of constraints found to occur in every minimal unsatisfiable subset.
        num_critical_constraints: usize,
});

/// Computes minimal unsatisfiable subsets (MUSes), maximal satisfiable subsets (MSSes), and
/// minimal correction subsets (MCSes) of the soft constraints of an [`IndicatorModel`].
///
/// The extractor owns the main oracle. All feasibility checks go through
/// [`ConflictExtractor::check_subset`], which reuses earlier outcomes for identical subsets.
///
/// Subsets returned by the extractor are sorted in its visiting order (see
/// [`ExtractorOptions::shrink_order`]).
#[derive(Debug)]
pub struct ConflictExtractor<O: ConstraintOracle> {
    oracle: O,
    model: IndicatorModel<O::Constraint>,
    /// The order in which constraints are visited by shrink and grow.
    order: Vec<Indicator>,
    /// The position of every indicator in `order`.
    rank: KeyedVec<Indicator, usize>,
    /// Constraints which are part of every MUS; removing them from a conflict never needs to be
    /// tested.
    critical: KeyedVec<Indicator, bool>,
    cache: Option<SubsetCache>,
    statistics: ExtractorStatistics,
}

impl<O: ConstraintOracle> ConflictExtractor<O> {
    /// Builds the [`IndicatorModel`] for the given constraints on the `oracle` and creates an
    /// extractor for it.
    pub fn new(
        mut oracle: O,
        hard: impl IntoIterator<Item = O::Constraint>,
        soft: impl IntoIterator<Item = O::Constraint>,
        options: ExtractorOptions,
    ) -> Result<Self, ExplanationError> {
        let model = IndicatorModel::new(&mut oracle, hard, soft)?;

        let order = match options.shrink_order {
            ShrinkOrder::ConstraintText => model.canonical_order(),
            ShrinkOrder::InputOrder => model.indicators().collect(),
            ShrinkOrder::Shuffled => {
                let mut order = model.indicators().collect::<Vec<_>>();
                order.shuffle(&mut SmallRng::seed_from_u64(options.random_seed));
                order
            }
        };

        let num_soft_constraints = model.num_soft_constraints();
        let mut extractor = ConflictExtractor {
            oracle,
            model,
            order: vec![],
            rank: KeyedVec::default(),
            critical: KeyedVec::filled(num_soft_constraints, false),
            cache: options.use_cache.then(SubsetCache::default),
            statistics: ExtractorStatistics::default(),
        };
        extractor.set_order(order);

        Ok(extractor)
    }

    pub fn model(&self) -> &IndicatorModel<O::Constraint> {
        &self.model
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn statistics(&self) -> ExtractorStatistics {
        self.statistics
    }

    pub fn log_statistics(&self, statistic_logger: StatisticLogger) {
        self.statistics.log(statistic_logger);
    }

    /// The order in which constraints are visited.
    pub fn order(&self) -> &[Indicator] {
        &self.order
    }

    /// Replaces the visiting order; `order` has to contain every indicator exactly once.
    pub fn set_order(&mut self, order: Vec<Indicator>) {
        let num_soft_constraints = self.model.num_soft_constraints();
        explainer_assert_simple!(
            order.len() == num_soft_constraints,
            "the order has to contain every indicator"
        );

        let mut rank = KeyedVec::filled(num_soft_constraints, usize::MAX);
        for (position, &indicator) in order.iter().enumerate() {
            rank[indicator] = position;
        }
        explainer_assert_advanced!(rank.iter().all(|&position| position != usize::MAX));

        self.rank = rank;
        self.order = order;
    }

    /// Sorts the indicators in the visiting order.
    pub fn sort_in_order(&self, subset: &mut [Indicator]) {
        subset.sort_by_key(|&indicator| self.rank[indicator]);
    }

    /// The constraints which are known to be part of every MUS.
    pub fn critical_constraints(&self) -> Vec<Indicator> {
        self.order
            .iter()
            .copied()
            .filter(|&indicator| self.critical[indicator])
            .collect()
    }

    /// Permanently adds a clause over the indicators to the main oracle.
    ///
    /// Cached outcomes and critical constraints are forgotten, since the clause may make subsets
    /// unsatisfiable which were satisfiable before.
    pub fn add_clause(&mut self, clause: Vec<Literal>) {
        self.oracle.add_clause(clause);

        if let Some(cache) = &mut self.cache {
            cache.advance_epoch();
        }
        self.critical = KeyedVec::filled(self.model.num_soft_constraints(), false);
    }

    /// Determines whether the hard constraints together with the given soft constraints are
    /// satisfiable.
    ///
    /// Outcomes are cached; a cached satisfiable outcome does not leave a solution in the oracle,
    /// see [`ConflictExtractor::solve_for_values`] for that.
    pub fn check_subset(
        &mut self,
        subset: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> Result<Feasibility, ExplanationError> {
        if let Some(feasibility) = self.cache.as_ref().and_then(|cache| cache.get(subset)) {
            self.statistics.num_cache_hits += 1;
            return Ok(feasibility.clone());
        }

        self.solve_for_values(subset, termination)
    }

    /// Like [`ConflictExtractor::check_subset`], but always calls the oracle; if the subset is
    /// satisfiable, the solution can be inspected with
    /// [`ConflictExtractor::falsified_constraints`] afterwards.
    pub fn solve_for_values(
        &mut self,
        subset: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> Result<Feasibility, ExplanationError> {
        check_budget(termination)?;

        self.statistics.num_oracle_calls += 1;
        let feasibility = check_assumptions(&mut self.oracle, subset, termination)?;
        if let Some(cache) = &mut self.cache {
            cache.insert(subset, feasibility.clone());
        }
        trace!(
            "Checked subset of size {}: satisfiable = {}",
            subset.len(),
            feasibility.is_satisfiable()
        );

        Ok(feasibility)
    }

    /// Returns the constraints among `among` which do not hold in the solution of the last call to
    /// [`ConflictExtractor::solve_for_values`].
    pub fn falsified_constraints(&self, among: &[Indicator]) -> Vec<Indicator> {
        among
            .iter()
            .copied()
            .filter(|&indicator| {
                self.oracle
                    .constraint_value(self.model.constraint(indicator))
                    != Some(true)
            })
            .collect()
    }

    /// Shrinks the unsatisfiable `seed` to a minimal unsatisfiable subset of it.
    ///
    /// Returns [`ExplanationError::NoConflict`] if the seed is satisfiable. An empty result means
    /// that the hard constraints are infeasible by themselves.
    pub fn shrink(
        &mut self,
        seed: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Indicator>, ExplanationError> {
        match self.check_subset(seed, termination)? {
            Feasibility::Satisfiable => Err(ExplanationError::NoConflict),
            Feasibility::Unsatisfiable(core) => self.shrink_core(core, termination),
        }
    }

    /// Shrinks a known unsatisfiable core to a minimal unsatisfiable subset.
    ///
    /// Each constraint of the core is tested for removal once, in the visiting order. When the
    /// remainder is unsatisfiable, the (possibly smaller) core reported by the oracle becomes the
    /// new conflict.
    pub(crate) fn shrink_core(
        &mut self,
        core: Vec<Indicator>,
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Indicator>, ExplanationError> {
        let initial_size = core.len();
        let mut conflict = core;
        self.sort_in_order(&mut conflict);
        conflict.dedup();

        let candidates = conflict.clone();
        for indicator in candidates {
            if !conflict.contains(&indicator) {
                continue;
            }
            if self.critical[indicator] {
                self.statistics.num_critical_skips += 1;
                continue;
            }

            let remainder = conflict
                .iter()
                .copied()
                .filter(|&other| other != indicator)
                .collect::<Vec<_>>();

            if let Feasibility::Unsatisfiable(mut core) =
                self.check_subset(&remainder, termination)?
            {
                if core.len() < remainder.len() {
                    self.statistics.num_core_refinements += 1;
                }
                self.sort_in_order(&mut core);
                core.dedup();
                conflict = core;
            }
        }

        debug!(
            "Shrunk a core of size {initial_size} to a conflict of size {}",
            conflict.len()
        );
        Ok(conflict)
    }

    /// Grows the satisfiable `seed` into a maximal satisfiable subset of all soft constraints.
    ///
    /// Returns [`ExplanationError::NoSolution`] if the seed is unsatisfiable.
    pub fn grow(
        &mut self,
        seed: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Indicator>, ExplanationError> {
        let universe = self.model.indicators().collect::<Vec<_>>();
        let satisfiable = self.grow_within(seed, &universe, termination)?;

        if satisfiable.len() + 1 == universe.len() {
            // A correction subset of size one is contained in every conflict.
            if let Some(&indicator) = universe
                .iter()
                .find(|indicator| !satisfiable.contains(indicator))
            {
                if !self.critical[indicator] {
                    debug!("Constraint {indicator} is part of every conflict");
                    self.critical[indicator] = true;
                    self.statistics.num_critical_constraints += 1;
                }
            }
        }

        Ok(satisfiable)
    }

    /// Grows the satisfiable `seed` into a satisfiable subset to which no further constraint of
    /// `universe` can be added.
    pub fn grow_within(
        &mut self,
        seed: &[Indicator],
        universe: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Indicator>, ExplanationError> {
        if !self.check_subset(seed, termination)?.is_satisfiable() {
            return Err(ExplanationError::NoSolution);
        }

        let mut in_universe = KeyedVec::filled(self.model.num_soft_constraints(), false);
        for &indicator in universe {
            in_universe[indicator] = true;
        }

        let mut satisfiable = seed.to_vec();
        for position in 0..self.order.len() {
            let indicator = self.order[position];
            if !in_universe[indicator] || satisfiable.contains(&indicator) {
                continue;
            }

            satisfiable.push(indicator);
            if !self.check_subset(&satisfiable, termination)?.is_satisfiable() {
                let _ = satisfiable.pop();
            }
        }

        self.sort_in_order(&mut satisfiable);
        Ok(satisfiable)
    }

    /// The soft constraints which are not part of the given satisfiable subset. For a maximal
    /// satisfiable subset, this is a minimal correction subset.
    pub fn correction_subset(&self, satisfiable: &[Indicator]) -> Vec<Indicator> {
        self.order
            .iter()
            .copied()
            .filter(|indicator| !satisfiable.contains(indicator))
            .collect()
    }

    /// Grows the `seed` into a maximal satisfiable subset and returns its complement.
    pub fn minimal_correction_subset(
        &mut self,
        seed: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Indicator>, ExplanationError> {
        let satisfiable = self.grow(seed, termination)?;
        Ok(self.correction_subset(&satisfiable))
    }
}
