use std::fmt::Display;

use crate::containers::StorageKey;
use crate::variables::Literal;

/// A boolean surrogate for a single soft constraint.
///
/// Setting the indicator to true activates the constraint it guards (`indicator -> constraint`),
/// leaving it unassigned or false makes the constraint inert. Indicators are numbered
/// consecutively from zero in the order in which the soft constraints were given, and the same
/// number refers to the same constraint in every oracle of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Indicator {
    id: u32,
}

impl Indicator {
    pub const fn new(id: u32) -> Self {
        Indicator { id }
    }

    pub fn id(self) -> u32 {
        self.id
    }

    /// The literal which is true when this indicator is true.
    pub fn positive(self) -> Literal {
        Literal::new(self, true)
    }

    /// The literal which is true when this indicator is false.
    pub fn negative(self) -> Literal {
        Literal::new(self, false)
    }
}

impl StorageKey for Indicator {
    fn index(self) -> usize {
        self.id as usize
    }

    fn from_index(index: usize) -> Self {
        Indicator { id: index as u32 }
    }
}

impl Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i{}", self.id)
    }
}
