use fnv::FnvHashMap;

use crate::basic_types::Feasibility;
use crate::variables::Indicator;

/// Remembers the outcomes of feasibility checks of subsets of soft constraints.
///
/// Entries are keyed on the sorted indicator ids of the subset together with the epoch of the
/// oracle. Adding a permanent clause to the oracle may change the outcome for a subset, which is
/// reflected by [`SubsetCache::advance_epoch`].
#[derive(Debug, Default)]
pub(crate) struct SubsetCache {
    entries: FnvHashMap<CacheKey, Feasibility>,
    epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    subset: Box<[u32]>,
    epoch: u64,
}

impl SubsetCache {
    fn key(&self, subset: &[Indicator]) -> CacheKey {
        let mut ids = subset
            .iter()
            .map(|indicator| indicator.id())
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();

        CacheKey {
            subset: ids.into_boxed_slice(),
            epoch: self.epoch,
        }
    }

    pub(crate) fn get(&self, subset: &[Indicator]) -> Option<&Feasibility> {
        self.entries.get(&self.key(subset))
    }

    pub(crate) fn insert(&mut self, subset: &[Indicator], feasibility: Feasibility) {
        let key = self.key(subset);
        let _ = self.entries.insert(key, feasibility);
    }

    /// Invalidates all entries; entries of earlier epochs can never be hit again and are dropped.
    pub(crate) fn advance_epoch(&mut self) {
        self.epoch += 1;
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
