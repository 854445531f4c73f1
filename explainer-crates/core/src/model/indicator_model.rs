use log::debug;

use crate::basic_types::ExplanationError;
use crate::containers::KeyedVec;
use crate::containers::StorageKey;
use crate::explainer_assert_eq_simple;
use crate::explainer_assert_simple;
use crate::oracle::Constraint;
use crate::oracle::ConstraintOracle;
use crate::variables::Indicator;

/// The soft constraints of a model, each paired with the [`Indicator`] which guards it.
///
/// Building the model posts the hard constraints and the implications `indicator -> constraint`
/// for every soft constraint to the oracle. Afterwards, any subset of the soft constraints can be
/// activated by solving under the corresponding indicators as assumptions.
///
/// The indicator of the soft constraint at position `k` is the indicator with id `k`; this
/// correspondence is the same in every oracle of a session.
#[derive(Clone, Debug)]
pub struct IndicatorModel<C> {
    soft_constraints: KeyedVec<Indicator, C>,
    /// The position of each indicator when sorting the soft constraints by their text.
    canonical_rank: KeyedVec<Indicator, usize>,
    num_hard_constraints: usize,
}

impl<C: Constraint + Clone> IndicatorModel<C> {
    /// Posts the hard constraints and the reified soft constraints to the `oracle`, which should
    /// not have any indicators yet.
    ///
    /// Reifiability of every soft constraint is checked before anything is posted; the first
    /// constraint which cannot be reified results in [`ExplanationError::NotReifiable`].
    pub fn new<O: ConstraintOracle<Constraint = C>>(
        oracle: &mut O,
        hard: impl IntoIterator<Item = C>,
        soft: impl IntoIterator<Item = C>,
    ) -> Result<Self, ExplanationError> {
        let soft = soft.into_iter().collect::<Vec<_>>();
        if let Some((index, constraint)) = soft
            .iter()
            .enumerate()
            .find(|(_, constraint)| !constraint.can_reify())
        {
            return Err(ExplanationError::NotReifiable {
                index,
                constraint: constraint.to_string(),
            });
        }

        explainer_assert_simple!(
            oracle.num_indicators() == 0,
            "the indicators of the model have to be the first indicators of the oracle"
        );

        let mut num_hard_constraints = 0;
        for constraint in hard {
            oracle.post(constraint);
            num_hard_constraints += 1;
        }

        let mut soft_constraints = KeyedVec::default();
        for constraint in soft {
            let indicator = oracle.new_indicator();
            let key = soft_constraints.push(constraint.clone());
            explainer_assert_eq_simple!(indicator, key);

            oracle.post_implication(indicator, constraint);
        }

        let texts = soft_constraints
            .iter()
            .map(|constraint| constraint.to_string())
            .collect::<Vec<_>>();
        let mut sorted = soft_constraints.keys().collect::<Vec<_>>();
        sorted.sort_by(|&lhs, &rhs| {
            texts[lhs.index()]
                .cmp(&texts[rhs.index()])
                .then(lhs.cmp(&rhs))
        });
        let mut canonical_rank = KeyedVec::filled(sorted.len(), 0);
        for (rank, indicator) in sorted.into_iter().enumerate() {
            canonical_rank[indicator] = rank;
        }

        debug!(
            "Posted {num_hard_constraints} hard and {} soft constraints",
            soft_constraints.len()
        );

        Ok(IndicatorModel {
            soft_constraints,
            canonical_rank,
            num_hard_constraints,
        })
    }
}

impl<C> IndicatorModel<C> {
    pub fn num_soft_constraints(&self) -> usize {
        self.soft_constraints.len()
    }

    pub fn num_hard_constraints(&self) -> usize {
        self.num_hard_constraints
    }

    /// All indicators, in the order in which the soft constraints were given.
    pub fn indicators(&self) -> impl Iterator<Item = Indicator> + '_ {
        self.soft_constraints.keys()
    }

    /// The soft constraint guarded by the given indicator.
    pub fn constraint(&self, indicator: Indicator) -> &C {
        &self.soft_constraints[indicator]
    }

    /// The soft constraints guarded by the given indicators, in the same order.
    pub fn constraints<'a>(
        &'a self,
        indicators: &'a [Indicator],
    ) -> impl Iterator<Item = &'a C> + 'a {
        indicators
            .iter()
            .map(|&indicator| &self.soft_constraints[indicator])
    }

    /// Sorts the indicators by the text of the constraints they guard; ties are broken by the
    /// position of the constraints in the input.
    pub fn sort_canonically(&self, indicators: &mut [Indicator]) {
        indicators.sort_by_key(|&indicator| self.canonical_rank[indicator]);
    }

    /// All indicators, sorted by the text of the constraints they guard.
    pub fn canonical_order(&self) -> Vec<Indicator> {
        let mut indicators = self.indicators().collect::<Vec<_>>();
        self.sort_canonically(&mut indicators);
        indicators
    }
}
