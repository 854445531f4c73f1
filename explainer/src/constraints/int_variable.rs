use std::fmt::Display;
use std::sync::Arc;

use explainer_core::containers::StorageKey;

/// The identifier of a domain of a [`FiniteDomainOracle`](crate::oracles::FiniteDomainOracle).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainId {
    id: u32,
}

impl DomainId {
    pub const fn new(id: u32) -> Self {
        DomainId { id }
    }

    pub fn id(self) -> u32 {
        self.id
    }
}

impl StorageKey for DomainId {
    fn index(self) -> usize {
        self.id as usize
    }

    fn from_index(index: usize) -> Self {
        DomainId { id: index as u32 }
    }
}

/// A named integer variable. Two variables are the same if they refer to the same domain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntVariable {
    domain: DomainId,
    name: Arc<str>,
}

impl IntVariable {
    pub fn new(domain: DomainId, name: Arc<str>) -> Self {
        IntVariable { domain, name }
    }

    pub fn domain(&self) -> DomainId {
        self.domain
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for IntVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An atomic statement about the value of an [`IntVariable`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntLiteral {
    Equals(IntVariable, i64),
    NotEquals(IntVariable, i64),
}

impl IntLiteral {
    pub fn variable(&self) -> &IntVariable {
        match self {
            IntLiteral::Equals(variable, _) | IntLiteral::NotEquals(variable, _) => variable,
        }
    }

    /// Evaluates the literal under the value assigned to its variable.
    pub fn holds(&self, value: i64) -> bool {
        match self {
            IntLiteral::Equals(_, expected) => value == *expected,
            IntLiteral::NotEquals(_, excluded) => value != *excluded,
        }
    }
}

impl Display for IntLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntLiteral::Equals(variable, value) => write!(f, "{variable} == {value}"),
            IntLiteral::NotEquals(variable, value) => write!(f, "{variable} != {value}"),
        }
    }
}
