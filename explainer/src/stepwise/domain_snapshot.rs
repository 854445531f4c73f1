use std::collections::BTreeMap;
use std::fmt::Display;
use std::fmt::Formatter;

use crate::constraints::DomainId;

/// The values which remain possible for a set of domains of a
/// [`FiniteDomainOracle`](crate::oracles::FiniteDomainOracle).
///
/// Snapshots are ordered by inclusion: a snapshot is a subset of another if every domain it holds
/// is a subset of the same domain in the other. A snapshot in which some domain is empty is a
/// conflict.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DomainSnapshot {
    /// Every list of values is sorted and free of duplicates.
    domains: BTreeMap<DomainId, Vec<i64>>,
}

impl DomainSnapshot {
    pub fn new(domains: impl IntoIterator<Item = (DomainId, Vec<i64>)>) -> Self {
        DomainSnapshot {
            domains: domains
                .into_iter()
                .map(|(domain, mut values)| {
                    values.sort_unstable();
                    values.dedup();
                    (domain, values)
                })
                .collect(),
        }
    }

    /// The snapshot in which every domain only holds its value in `solution`.
    pub fn assignment(solution: impl IntoIterator<Item = (DomainId, i64)>) -> Self {
        DomainSnapshot::new(
            solution
                .into_iter()
                .map(|(domain, value)| (domain, vec![value])),
        )
    }

    /// The snapshot in which every given domain is empty.
    pub fn conflict(domains: impl IntoIterator<Item = DomainId>) -> Self {
        DomainSnapshot {
            domains: domains.into_iter().map(|domain| (domain, vec![])).collect(),
        }
    }

    pub fn domains(&self) -> impl Iterator<Item = DomainId> + '_ {
        self.domains.keys().copied()
    }

    /// The remaining values of the domain; empty for a domain the snapshot does not hold.
    pub fn values(&self, domain: DomainId) -> &[i64] {
        self.domains.get(&domain).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, domain: DomainId, value: i64) -> bool {
        self.values(domain).binary_search(&value).is_ok()
    }

    pub fn num_values(&self) -> usize {
        self.domains.values().map(Vec::len).sum()
    }

    pub fn is_conflict(&self) -> bool {
        self.domains.values().any(Vec::is_empty)
    }

    pub fn is_subset_of(&self, other: &DomainSnapshot) -> bool {
        self.domains.iter().all(|(&domain, values)| {
            other.domains.get(&domain).is_some_and(|others| {
                values
                    .iter()
                    .all(|value| others.binary_search(value).is_ok())
            })
        })
    }

    /// The part of the snapshot which concerns the given domains.
    pub fn restrict_to(&self, scope: &[DomainId]) -> DomainSnapshot {
        DomainSnapshot {
            domains: scope
                .iter()
                .filter_map(|domain| {
                    self.domains
                        .get(domain)
                        .map(|values| (*domain, values.clone()))
                })
                .collect(),
        }
    }

    /// Replaces the domains held by `update`; the other domains stay as they are.
    pub fn updated_with(&self, update: &DomainSnapshot) -> DomainSnapshot {
        let mut domains = self.domains.clone();
        for (&domain, values) in &update.domains {
            let _ = domains.insert(domain, values.clone());
        }
        DomainSnapshot { domains }
    }

    /// The values of `initial` which this snapshot excludes, as `(domain, value)` pairs which
    /// stand for the literals `domain != value`.
    pub fn excluded_from(&self, initial: &DomainSnapshot) -> Vec<(DomainId, i64)> {
        initial
            .domains
            .iter()
            .flat_map(|(&domain, values)| {
                values
                    .iter()
                    .filter(move |&&value| !self.contains(domain, value))
                    .map(move |&value| (domain, value))
            })
            .collect()
    }

    /// This snapshot without the given values.
    pub fn excluding(&self, excluded: &[(DomainId, i64)]) -> DomainSnapshot {
        let mut domains = self.domains.clone();
        for (domain, value) in excluded {
            if let Some(values) = domains.get_mut(domain) {
                values.retain(|remaining| remaining != value);
            }
        }
        DomainSnapshot { domains }
    }
}

impl Display for DomainSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (position, (domain, values)) in self.domains.iter().enumerate() {
            if position > 0 {
                write!(f, " ")?;
            }
            write!(f, "d{}={values:?}", domain.id())?;
        }
        Ok(())
    }
}
