use super::TerminationCondition;

/// Which of the two conditions of a [`Combinator`] triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Triggered {
    First,
    Second,
}

/// Stops as soon as either of two conditions stops, and keeps stopping afterwards.
///
/// The first condition is polled first; once one of them has triggered, neither is polled again.
#[derive(Clone, Copy, Debug)]
pub struct Combinator<T1, T2> {
    first: T1,
    second: T2,
    triggered: Option<Triggered>,
}

impl<T1, T2> Combinator<T1, T2> {
    pub fn new(first: T1, second: T2) -> Self {
        Combinator {
            first,
            second,
            triggered: None,
        }
    }

    /// The condition which stopped the search, if any.
    pub fn triggered(&self) -> Option<Triggered> {
        self.triggered
    }
}

impl<T1: TerminationCondition, T2: TerminationCondition> TerminationCondition
    for Combinator<T1, T2>
{
    fn should_stop(&mut self) -> bool {
        if self.triggered.is_none() {
            if self.first.should_stop() {
                self.triggered = Some(Triggered::First);
            } else if self.second.should_stop() {
                self.triggered = Some(Triggered::Second);
            }
        }

        self.triggered.is_some()
    }
}
