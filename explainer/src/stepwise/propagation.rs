use explainer_core::termination::TerminationCondition;
use explainer_core::ExplanationError;
use fnv::FnvHashMap;
use log::trace;

use super::DomainSnapshot;
use crate::constraints::DomainId;
use crate::constraints::IntConstraint;

/// Removes the values which do not occur in any solution of a subset of the constraints within
/// the current domains.
///
/// The outcome only depends on the subset and on the domains in its scope, so it is cached under
/// exactly that key for the lifetime of the propagator.
#[derive(Debug, Default)]
pub(crate) struct Propagator {
    /// The supported values of the scope, or [`None`] if the subset has no solution.
    cache: FnvHashMap<(Vec<usize>, DomainSnapshot), Option<DomainSnapshot>>,
    pub(crate) num_propagations: usize,
    pub(crate) num_cache_hits: usize,
}

impl Propagator {
    /// Propagates the constraints with the given indices on `domains`. When they have no solution,
    /// every domain of the result is empty.
    pub(crate) fn propagate(
        &mut self,
        constraints: &[IntConstraint],
        subset: &[usize],
        domains: &DomainSnapshot,
        termination: &mut impl TerminationCondition,
    ) -> Result<DomainSnapshot, ExplanationError> {
        let mut subset = subset.to_vec();
        subset.sort_unstable();
        subset.dedup();

        let scope = scope_of(constraints, &subset);
        let key = (subset, domains.restrict_to(&scope));

        let supported = match self.cache.get(&key) {
            Some(supported) => {
                self.num_cache_hits += 1;
                supported.clone()
            }
            None => {
                self.num_propagations += 1;
                let supported = supports(constraints, &key.0, &key.1, termination)?;
                let _ = self.cache.insert(key, supported.clone());
                supported
            }
        };

        Ok(match supported {
            Some(supported) => domains.updated_with(&supported),
            None => DomainSnapshot::conflict(domains.domains()),
        })
    }
}

/// The domains of the constraints with the given indices, sorted and without duplicates.
pub(crate) fn scope_of(constraints: &[IntConstraint], subset: &[usize]) -> Vec<DomainId> {
    let mut scope = subset
        .iter()
        .flat_map(|&index| constraints[index].scope())
        .collect::<Vec<_>>();
    scope.sort();
    scope.dedup();
    scope
}

fn supports(
    constraints: &[IntConstraint],
    subset: &[usize],
    domains: &DomainSnapshot,
    termination: &mut impl TerminationCondition,
) -> Result<Option<DomainSnapshot>, ExplanationError> {
    let order = domains.domains().collect::<Vec<_>>();
    let position = order
        .iter()
        .enumerate()
        .map(|(position, &domain)| (domain, position))
        .collect::<FnvHashMap<_, _>>();

    let mut root = vec![];
    let mut checks_at = vec![vec![]; order.len()];
    for &index in subset {
        let constraint = &constraints[index];
        let Some(positions) = constraint
            .scope()
            .iter()
            .map(|domain| position.get(domain).copied())
            .collect::<Option<Vec<_>>>()
        else {
            // A constraint over a domain outside of the snapshot cannot be evaluated.
            return Ok(Some(domains.clone()));
        };

        match positions.into_iter().max() {
            Some(last) => checks_at[last].push(constraint),
            None => root.push(constraint),
        }
    }

    if !root.iter().all(|constraint| constraint.holds(|_| 0)) {
        return Ok(None);
    }

    let mut search = SupportSearch {
        candidates: order.iter().map(|&domain| domains.values(domain)).collect(),
        supported: order
            .iter()
            .map(|&domain| vec![false; domains.values(domain).len()])
            .collect(),
        num_unsupported: domains.num_values(),
        order,
        position,
        checks_at,
        chosen: vec![],
        termination,
    };

    if !search.search()? {
        trace!("Constraints {subset:?} have no solution within the domains");
        return Ok(None);
    }

    Ok(Some(DomainSnapshot::new(
        search
            .order
            .iter()
            .zip(search.candidates.iter().zip(&search.supported))
            .map(|(&domain, (candidates, supported))| {
                let values = candidates
                    .iter()
                    .zip(supported)
                    .filter(|&(_, &supported)| supported)
                    .map(|(&value, _)| value)
                    .collect();
                (domain, values)
            }),
    )))
}

fn value_of(position: &FnvHashMap<DomainId, usize>, chosen: &[i64], domain: DomainId) -> i64 {
    position
        .get(&domain)
        .and_then(|&position| chosen.get(position))
        .copied()
        .unwrap_or_default()
}

struct SupportSearch<'a, T> {
    order: Vec<DomainId>,
    position: FnvHashMap<DomainId, usize>,
    candidates: Vec<&'a [i64]>,
    /// The constraints which become fully assigned at every position of the order.
    checks_at: Vec<Vec<&'a IntConstraint>>,
    /// Per position, which candidate values occur in a solution found so far.
    supported: Vec<Vec<bool>>,
    num_unsupported: usize,
    /// The index of the chosen candidate at every assigned position.
    chosen: Vec<usize>,
    termination: &'a mut T,
}

impl<T: TerminationCondition> SupportSearch<'_, T> {
    /// Enumerates the solutions and marks their values as supported; returns whether a solution
    /// exists.
    fn search(&mut self) -> Result<bool, ExplanationError> {
        if self.termination.should_stop() {
            return Err(ExplanationError::Timeout);
        }

        let position = self.chosen.len();
        if position == self.order.len() {
            for (position, &index) in self.chosen.iter().enumerate() {
                if !self.supported[position][index] {
                    self.supported[position][index] = true;
                    self.num_unsupported -= 1;
                }
            }
            return Ok(true);
        }

        let mut found = false;
        for index in 0..self.candidates[position].len() {
            self.chosen.push(index);
            if self.consistent_at(position) {
                found |= self.search()?;
            }
            let _ = self.chosen.pop();

            if self.num_unsupported == 0 {
                break;
            }
        }

        Ok(found)
    }

    fn consistent_at(&self, position: usize) -> bool {
        let values = self
            .chosen
            .iter()
            .enumerate()
            .map(|(position, &index)| self.candidates[position][index])
            .collect::<Vec<_>>();

        self.checks_at[position]
            .iter()
            .all(|constraint| constraint.holds(|domain| value_of(&self.position, &values, domain)))
    }
}
