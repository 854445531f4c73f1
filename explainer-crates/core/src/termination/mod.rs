//! A [`TerminationCondition`] is a condition which is polled by the explanation algorithms and the
//! oracles they call. It indicates when the search should stop, even if no definitive conclusions
//! have been made. The most common example would be [`TimeBudget`], which gives the algorithms a
//! certain time budget to complete.
//!
//! When an oracle gives up because the termination condition triggered, the algorithms report
//! [`ExplanationError::Timeout`]; they never treat an inconclusive answer as satisfiable or
//! unsatisfiable.

mod combinator;
mod time_budget;

pub use combinator::*;
pub use time_budget::*;

use crate::basic_types::ExplanationError;

/// The central trait that defines a termination condition. A termination condition determines when
/// the search should give up.
pub trait TerminationCondition {
    /// Returns `true` when the search should stop, `false` otherwise.
    fn should_stop(&mut self) -> bool;
}

/// Never stops; every operation runs until it reaches a conclusion.
#[derive(Clone, Copy, Debug, Default)]
pub struct Indefinite;

impl TerminationCondition for Indefinite {
    fn should_stop(&mut self) -> bool {
        false
    }
}

/// [`None`] never stops.
impl<T: TerminationCondition> TerminationCondition for Option<T> {
    fn should_stop(&mut self) -> bool {
        match self {
            Some(t) => t.should_stop(),
            None => false,
        }
    }
}

impl<T: TerminationCondition + ?Sized> TerminationCondition for &mut T {
    fn should_stop(&mut self) -> bool {
        (**self).should_stop()
    }
}

/// Returns [`ExplanationError::Timeout`] if the termination condition has triggered.
pub fn check_budget(
    termination: &mut impl TerminationCondition,
) -> Result<(), ExplanationError> {
    if termination.should_stop() {
        Err(ExplanationError::Timeout)
    } else {
        Ok(())
    }
}
