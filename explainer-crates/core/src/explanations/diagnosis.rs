use log::debug;
use log::info;

use super::Choice;
use super::ChoiceProvider;
use super::ConflictExtractor;
use super::HittingSetOptimizer;
use crate::basic_types::ExplanationError;
use crate::basic_types::Feasibility;
use crate::create_statistics_struct;
use crate::explainer_assert_moderate;
use crate::oracle::ConstraintOracle;
use crate::oracle::OptimisationOracle;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;
use crate::termination::TerminationCondition;
use crate::variables::Indicator;

/// Produces the conflicts which are presented during a [`DiagnosisSession`].
pub trait ConflictSource<O: ConstraintOracle> {
    /// Computes a conflict among the `remaining` constraints, which are known to be unsatisfiable.
    fn next_conflict(
        &mut self,
        extractor: &mut ConflictExtractor<O>,
        remaining: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Indicator>, ExplanationError>;

    /// Called when the constraint has been removed from the remaining constraints.
    fn remove(&mut self, indicator: Indicator);

    fn log_statistics(&self, _statistic_logger: StatisticLogger) {}
}

/// Presents minimal unsatisfiable subsets, obtained by shrinking the remaining constraints.
#[derive(Clone, Copy, Debug, Default)]
pub struct MinimalConflicts;

impl<O: ConstraintOracle> ConflictSource<O> for MinimalConflicts {
    fn next_conflict(
        &mut self,
        extractor: &mut ConflictExtractor<O>,
        remaining: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Indicator>, ExplanationError> {
        extractor.shrink(remaining, termination)
    }

    fn remove(&mut self, _: Indicator) {}
}

/// Presents minimum-weight conflicts; removed constraints are forbidden in the optimizer.
impl<O: ConstraintOracle, H: OptimisationOracle> ConflictSource<O> for HittingSetOptimizer<H> {
    fn next_conflict(
        &mut self,
        extractor: &mut ConflictExtractor<O>,
        remaining: &[Indicator],
        termination: &mut impl TerminationCondition,
    ) -> Result<Vec<Indicator>, ExplanationError> {
        explainer_assert_moderate!(self.allowed() == remaining);
        self.optimal_mus(extractor, termination)
    }

    fn remove(&mut self, indicator: Indicator) {
        self.forbid(indicator);
    }

    fn log_statistics(&self, statistic_logger: StatisticLogger) {
        HittingSetOptimizer::log_statistics(self, statistic_logger);
    }
}

/// How a [`DiagnosisSession`] ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosisResult<C> {
    /// The remaining constraints are satisfiable.
    Feasible { removed: Vec<C> },
    /// The choice provider stopped the session.
    Aborted { removed: Vec<C> },
    /// The session could not continue.
    Failed {
        removed: Vec<C>,
        error: ExplanationError,
    },
}

impl<C> DiagnosisResult<C> {
    /// The removed constraints, in removal order.
    pub fn removed(&self) -> &[C] {
        match self {
            DiagnosisResult::Feasible { removed }
            | DiagnosisResult::Aborted { removed }
            | DiagnosisResult::Failed { removed, .. } => removed,
        }
    }
}

create_statistics_struct!(DiagnosisStatistics {
    num_iterations: usize,
    num_removed: usize,
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionEnd {
    Feasible,
    Aborted,
}

/// Interactively restores feasibility of a model by removing soft constraints.
///
/// As long as the remaining constraints are unsatisfiable, a conflict among them is presented to a
/// [`ChoiceProvider`] (sorted by the text of the constraints), which picks one constraint of the
/// conflict to remove. Every removal resolves the presented conflict, so the session ends after at
/// most as many iterations as there are soft constraints.
#[derive(Debug)]
pub struct DiagnosisSession<O: ConstraintOracle, S> {
    extractor: ConflictExtractor<O>,
    conflicts: S,
    remaining: Vec<Indicator>,
    removed: Vec<Indicator>,
    statistics: DiagnosisStatistics,
}

impl<O: ConstraintOracle> DiagnosisSession<O, MinimalConflicts> {
    /// A session which presents minimal unsatisfiable subsets.
    pub fn basic(extractor: ConflictExtractor<O>) -> Self {
        DiagnosisSession::new(extractor, MinimalConflicts)
    }
}

impl<O: ConstraintOracle, H: OptimisationOracle> DiagnosisSession<O, HittingSetOptimizer<H>> {
    /// A session which presents minimum-weight conflicts.
    pub fn optimal(extractor: ConflictExtractor<O>, optimizer: HittingSetOptimizer<H>) -> Self {
        DiagnosisSession::new(extractor, optimizer)
    }
}

impl<O: ConstraintOracle, S: ConflictSource<O>> DiagnosisSession<O, S> {
    pub fn new(extractor: ConflictExtractor<O>, conflicts: S) -> Self {
        let remaining = extractor.model().indicators().collect();

        DiagnosisSession {
            extractor,
            conflicts,
            remaining,
            removed: vec![],
            statistics: DiagnosisStatistics::default(),
        }
    }

    pub fn extractor(&self) -> &ConflictExtractor<O> {
        &self.extractor
    }

    /// The constraints which have not been removed.
    pub fn remaining(&self) -> &[Indicator] {
        &self.remaining
    }

    /// The removed constraints, in removal order.
    pub fn removed(&self) -> &[Indicator] {
        &self.removed
    }

    pub fn statistics(&self) -> DiagnosisStatistics {
        self.statistics
    }

    pub fn log_statistics(&self, statistic_logger: StatisticLogger) {
        self.statistics
            .log(statistic_logger.attach_to_prefix("diagnosis"));
        self.extractor
            .log_statistics(statistic_logger.attach_to_prefix("extractor"));
        self.conflicts
            .log_statistics(statistic_logger.attach_to_prefix("conflicts"));
    }

    /// Runs the session until the remaining constraints are satisfiable, the choice provider
    /// aborts, or an error occurs.
    pub fn run(
        &mut self,
        choices: &mut impl ChoiceProvider<O::Constraint>,
        termination: &mut impl TerminationCondition,
    ) -> DiagnosisResult<O::Constraint> {
        let end = self.diagnose(choices, termination);

        let removed = self
            .extractor
            .model()
            .constraints(&self.removed)
            .cloned()
            .collect();

        match end {
            Ok(SessionEnd::Feasible) => {
                info!("The remaining constraints are satisfiable");
                DiagnosisResult::Feasible { removed }
            }
            Ok(SessionEnd::Aborted) => {
                info!("Diagnosis aborted");
                DiagnosisResult::Aborted { removed }
            }
            Err(error) => {
                info!("Diagnosis failed: {error}");
                DiagnosisResult::Failed { removed, error }
            }
        }
    }

    fn diagnose(
        &mut self,
        choices: &mut impl ChoiceProvider<O::Constraint>,
        termination: &mut impl TerminationCondition,
    ) -> Result<SessionEnd, ExplanationError> {
        loop {
            match self.extractor.check_subset(&self.remaining, termination)? {
                Feasibility::Satisfiable => return Ok(SessionEnd::Feasible),
                Feasibility::Unsatisfiable(core) if core.is_empty() => {
                    return Err(ExplanationError::HardConstraintsInfeasible)
                }
                Feasibility::Unsatisfiable(_) => {}
            }

            self.statistics.num_iterations += 1;
            let mut conflict =
                self.conflicts
                    .next_conflict(&mut self.extractor, &self.remaining, termination)?;
            if conflict.is_empty() {
                return Err(ExplanationError::HardConstraintsInfeasible);
            }

            let model = self.extractor.model();
            model.sort_canonically(&mut conflict);
            info!(
                "Iteration {}: presenting a conflict of size {}",
                self.statistics.num_iterations,
                conflict.len()
            );

            let presented = model.constraints(&conflict).collect::<Vec<_>>();
            let removed = model.constraints(&self.removed).collect::<Vec<_>>();
            let index = match choices.present(&presented, &removed) {
                Choice::Abort => return Ok(SessionEnd::Aborted),
                Choice::Remove(index) => index,
            };

            let Some(&indicator) = conflict.get(index) else {
                return Err(ExplanationError::InvalidChoice {
                    index,
                    len: conflict.len(),
                });
            };
            debug!("Removing {}", model.constraint(indicator));

            self.remaining.retain(|&other| other != indicator);
            self.removed.push(indicator);
            self.conflicts.remove(indicator);
            self.statistics.num_removed += 1;
        }
    }
}
