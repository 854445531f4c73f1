use std::fmt::Display;
use std::fmt::Formatter;

use explainer_core::oracle::Constraint;

use super::DomainId;
use super::IntLiteral;
use super::IntVariable;

/// A constraint over [`IntVariable`]s which a
/// [`FiniteDomainOracle`](crate::oracles::FiniteDomainOracle) can hold.
///
/// Linear constraints are of the form `sum(coefficient * variable) <op> rhs`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntConstraint {
    LinearLessOrEqual {
        terms: Vec<(i64, IntVariable)>,
        rhs: i64,
    },
    LinearEqual {
        terms: Vec<(i64, IntVariable)>,
        rhs: i64,
    },
    LinearNotEqual {
        terms: Vec<(i64, IntVariable)>,
        rhs: i64,
    },
    /// At least one of the literals holds.
    Clause(Vec<IntLiteral>),
    /// Every clause holds.
    Cnf(Vec<Vec<IntLiteral>>),
    /// The variables take pairwise different values. Cannot be reified.
    AllDifferent(Vec<IntVariable>),
}

impl IntConstraint {
    /// The domains the constraint depends on, sorted and without duplicates.
    pub fn scope(&self) -> Vec<DomainId> {
        let mut scope: Vec<DomainId> = match self {
            IntConstraint::LinearLessOrEqual { terms, .. }
            | IntConstraint::LinearEqual { terms, .. }
            | IntConstraint::LinearNotEqual { terms, .. } => terms
                .iter()
                .map(|(_, variable)| variable.domain())
                .collect(),
            IntConstraint::Clause(literals) => literals
                .iter()
                .map(|literal| literal.variable().domain())
                .collect(),
            IntConstraint::Cnf(clauses) => clauses
                .iter()
                .flatten()
                .map(|literal| literal.variable().domain())
                .collect(),
            IntConstraint::AllDifferent(variables) => {
                variables.iter().map(IntVariable::domain).collect()
            }
        };

        scope.sort();
        scope.dedup();
        scope
    }

    /// Evaluates the constraint; `value` has to provide a value for every domain in the
    /// [`IntConstraint::scope`].
    pub fn holds(&self, value: impl Fn(DomainId) -> i64) -> bool {
        let literal_holds =
            |literal: &IntLiteral| literal.holds(value(literal.variable().domain()));

        match self {
            IntConstraint::LinearLessOrEqual { terms, rhs } => {
                linear_sum(terms, &value) <= i128::from(*rhs)
            }
            IntConstraint::LinearEqual { terms, rhs } => {
                linear_sum(terms, &value) == i128::from(*rhs)
            }
            IntConstraint::LinearNotEqual { terms, rhs } => {
                linear_sum(terms, &value) != i128::from(*rhs)
            }
            IntConstraint::Clause(literals) => literals.iter().any(literal_holds),
            IntConstraint::Cnf(clauses) => clauses
                .iter()
                .all(|clause| clause.iter().any(literal_holds)),
            IntConstraint::AllDifferent(variables) => {
                let mut values = variables
                    .iter()
                    .map(|variable| value(variable.domain()))
                    .collect::<Vec<_>>();
                values.sort_unstable();
                values.windows(2).all(|pair| pair[0] != pair[1])
            }
        }
    }
}

fn linear_sum(terms: &[(i64, IntVariable)], value: &impl Fn(DomainId) -> i64) -> i128 {
    terms
        .iter()
        .map(|(coefficient, variable)| {
            i128::from(*coefficient) * i128::from(value(variable.domain()))
        })
        .sum()
}

impl Constraint for IntConstraint {
    fn can_reify(&self) -> bool {
        !matches!(self, IntConstraint::AllDifferent(_))
    }
}

impl Display for IntConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IntConstraint::LinearLessOrEqual { terms, rhs } => {
                write_terms(f, terms)?;
                write!(f, " <= {rhs}")
            }
            IntConstraint::LinearEqual { terms, rhs } => {
                write_terms(f, terms)?;
                write!(f, " == {rhs}")
            }
            IntConstraint::LinearNotEqual { terms, rhs } => {
                write_terms(f, terms)?;
                write!(f, " != {rhs}")
            }
            IntConstraint::Clause(literals) => write_clause(f, literals),
            IntConstraint::Cnf(clauses) => {
                if clauses.is_empty() {
                    return write!(f, "true");
                }

                for (position, clause) in clauses.iter().enumerate() {
                    if position > 0 {
                        write!(f, " and ")?;
                    }
                    write!(f, "(")?;
                    write_clause(f, clause)?;
                    write!(f, ")")?;
                }
                Ok(())
            }
            IntConstraint::AllDifferent(variables) => {
                write!(f, "all_different(")?;
                for (position, variable) in variables.iter().enumerate() {
                    if position > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{variable}")?;
                }
                write!(f, ")")
            }
        }
    }
}

fn write_terms(f: &mut Formatter<'_>, terms: &[(i64, IntVariable)]) -> std::fmt::Result {
    if terms.is_empty() {
        return write!(f, "0");
    }

    for (position, (coefficient, variable)) in terms.iter().enumerate() {
        if *coefficient < 0 {
            write!(f, "{}", if position == 0 { "-" } else { " - " })?;
        } else if position > 0 {
            write!(f, " + ")?;
        }

        let magnitude = coefficient.unsigned_abs();
        if magnitude == 1 {
            write!(f, "{variable}")?;
        } else {
            write!(f, "{magnitude}*{variable}")?;
        }
    }

    Ok(())
}

fn write_clause(f: &mut Formatter<'_>, literals: &[IntLiteral]) -> std::fmt::Result {
    if literals.is_empty() {
        return write!(f, "false");
    }

    for (position, literal) in literals.iter().enumerate() {
        if position > 0 {
            write!(f, " or ")?;
        }
        write!(f, "{literal}")?;
    }
    Ok(())
}
