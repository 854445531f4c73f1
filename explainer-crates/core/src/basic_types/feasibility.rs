use crate::variables::Indicator;

/// The conclusion of a feasibility check of a set of assumptions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Feasibility {
    /// The assumptions are satisfiable together with the hard constraints.
    Satisfiable,
    /// The assumptions are unsatisfiable; the provided core is a subset of the assumptions which is
    /// unsatisfiable on its own.
    Unsatisfiable(Vec<Indicator>),
}

impl Feasibility {
    pub fn is_satisfiable(&self) -> bool {
        matches!(self, Feasibility::Satisfiable)
    }
}
