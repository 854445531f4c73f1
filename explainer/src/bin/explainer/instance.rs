use std::num::NonZeroI32;

use explainer::constraints;
use explainer::constraints::IntConstraint;
use explainer::constraints::IntLiteral;
use explainer::constraints::IntVariable;
use explainer::core::variables::Indicator;
use explainer::oracles::FiniteDomainOracle;
use fnv::FnvHashMap;

use crate::gcnf::GroupedCnf;
use crate::result::ExplainerError;
use crate::result::ExplainerResult;

/// A parsed instance, translated into 0/1 variables of a [`FiniteDomainOracle`].
///
/// Every soft group becomes one [`IntConstraint::Cnf`], so the indicator of the `k`-th soft
/// constraint belongs to the `k`-th group in ascending group order.
#[derive(Debug)]
pub(crate) struct Instance {
    pub(crate) oracle: FiniteDomainOracle,
    /// The variable `x{k}` of the file is at index `k - 1`.
    pub(crate) variables: Vec<IntVariable>,
    pub(crate) hard_constraints: Vec<IntConstraint>,
    pub(crate) soft_constraints: Vec<IntConstraint>,
    pub(crate) groups: Groups,
}

/// The relation between group numbers and indicators.
#[derive(Debug)]
pub(crate) struct Groups {
    numbers: Vec<u32>,
    indicators: FnvHashMap<u32, Indicator>,
}

impl Instance {
    pub(crate) fn new(cnf: GroupedCnf) -> Instance {
        let mut oracle = FiniteDomainOracle::default();
        let variables = (1..=cnf.num_variables)
            .map(|index| oracle.new_variable(0, 1, &format!("x{index}")))
            .collect::<Vec<_>>();

        let to_literals = |clause: Vec<NonZeroI32>| -> Vec<IntLiteral> {
            clause
                .into_iter()
                .map(|literal| {
                    let variable = variables[literal.unsigned_abs().get() as usize - 1].clone();
                    to_literal(variable, literal.is_positive())
                })
                .collect()
        };

        let hard_constraints = cnf
            .hard_clauses
            .into_iter()
            .map(|clause| constraints::clause(to_literals(clause)))
            .collect();

        let mut numbers = vec![];
        let mut soft_constraints = vec![];
        for (group, clauses) in cnf.groups {
            numbers.push(group);
            soft_constraints.push(constraints::cnf(clauses.into_iter().map(to_literals)));
        }

        let indicators = numbers
            .iter()
            .enumerate()
            .map(|(index, &group)| (group, Indicator::new(index as u32)))
            .collect();

        Instance {
            oracle,
            variables,
            hard_constraints,
            soft_constraints,
            groups: Groups {
                numbers,
                indicators,
            },
        }
    }
}

impl Groups {
    pub(crate) fn len(&self) -> usize {
        self.numbers.len()
    }

    /// The group of the `index`-th soft constraint.
    pub(crate) fn number(&self, index: usize) -> u32 {
        self.numbers[index]
    }

    pub(crate) fn indicator(&self, group: u32) -> ExplainerResult<Indicator> {
        self.indicators
            .get(&group)
            .copied()
            .ok_or(ExplainerError::UnknownGroup(group))
    }

    /// Formats the subset as the sorted list of its group numbers, e.g. `MUS: 1 4`.
    pub(crate) fn format(&self, label: &str, subset: &[Indicator]) -> String {
        let mut groups = subset
            .iter()
            .map(|indicator| self.numbers[indicator.id() as usize])
            .collect::<Vec<_>>();
        groups.sort_unstable();

        let mut line = format!("{label}:");
        for group in groups {
            line.push_str(&format!(" {group}"));
        }
        line
    }
}

fn to_literal(variable: IntVariable, is_positive: bool) -> IntLiteral {
    IntLiteral::Equals(variable, i64::from(is_positive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcnf::parse_gcnf;

    #[test]
    fn groups_become_soft_constraints_in_ascending_order() {
        let cnf = parse_gcnf("p gcnf 2 3 5\n{5} 1 0\n{0} -1 -2 0\n{2} 2 0\n".as_bytes())
            .expect("valid file");
        let instance = Instance::new(cnf);

        assert_eq!(instance.groups.len(), 2);
        assert_eq!(instance.variables.len(), 2);
        assert_eq!(instance.hard_constraints.len(), 1);
        assert_eq!(
            instance.hard_constraints[0].to_string(),
            "x1 == 0 or x2 == 0"
        );
        assert_eq!(instance.soft_constraints[0].to_string(), "(x2 == 1)");
        assert_eq!(instance.soft_constraints[1].to_string(), "(x1 == 1)");

        let groups = &instance.groups;
        assert_eq!(groups.indicator(5).ok(), Some(Indicator::new(1)));
        assert_eq!(groups.number(0), 2);
        assert!(groups.indicator(3).is_err());
        assert_eq!(
            groups.format("MUS", &[Indicator::new(1), Indicator::new(0)]),
            "MUS: 2 5"
        );
        assert_eq!(groups.format("MCS", &[]), "MCS:");
    }
}
