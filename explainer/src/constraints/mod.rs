//! The constraints which can be posted to a
//! [`FiniteDomainOracle`](crate::oracles::FiniteDomainOracle), and functions to create them.
mod int_constraint;
mod int_variable;

pub use int_constraint::IntConstraint;
pub use int_variable::DomainId;
pub use int_variable::IntLiteral;
pub use int_variable::IntVariable;

/// Creates the [`IntConstraint`] `sum(terms) <= rhs`.
pub fn less_than_or_equals(
    terms: impl IntoIterator<Item = (i64, IntVariable)>,
    rhs: i64,
) -> IntConstraint {
    IntConstraint::LinearLessOrEqual {
        terms: terms.into_iter().collect(),
        rhs,
    }
}

/// Creates the [`IntConstraint`] `sum(terms) >= rhs`, which is stored as `-sum(terms) <= -rhs`.
pub fn greater_than_or_equals(
    terms: impl IntoIterator<Item = (i64, IntVariable)>,
    rhs: i64,
) -> IntConstraint {
    less_than_or_equals(
        terms
            .into_iter()
            .map(|(coefficient, variable)| (-coefficient, variable)),
        -rhs,
    )
}

/// Creates the [`IntConstraint`] `sum(terms) == rhs`.
pub fn equals(terms: impl IntoIterator<Item = (i64, IntVariable)>, rhs: i64) -> IntConstraint {
    IntConstraint::LinearEqual {
        terms: terms.into_iter().collect(),
        rhs,
    }
}

/// Creates the [`IntConstraint`] `sum(terms) != rhs`.
pub fn not_equals(
    terms: impl IntoIterator<Item = (i64, IntVariable)>,
    rhs: i64,
) -> IntConstraint {
    IntConstraint::LinearNotEqual {
        terms: terms.into_iter().collect(),
        rhs,
    }
}

/// Creates the disjunction of the given literals.
pub fn clause(literals: impl IntoIterator<Item = IntLiteral>) -> IntConstraint {
    IntConstraint::Clause(literals.into_iter().collect())
}

/// Creates the conjunction of the given clauses.
pub fn cnf(clauses: impl IntoIterator<Item = Vec<IntLiteral>>) -> IntConstraint {
    IntConstraint::Cnf(clauses.into_iter().collect())
}

/// Creates the [`IntConstraint`] which requires the variables to take pairwise different values.
///
/// This constraint cannot be reified, so it can only be used as a hard constraint.
pub fn all_different(variables: impl IntoIterator<Item = IntVariable>) -> IntConstraint {
    IntConstraint::AllDifferent(variables.into_iter().collect())
}
