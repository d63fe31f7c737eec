//! Read-through key -> position cache over an externally owned list.
//!
//! The first lookup builds the whole map under the write lock; later
//! lookups take the read lock only. The cache never looks at the backing
//! list again once populated. Owners whose list changes either call
//! `invalidate` or, as `PartitionedService` does, install a fresh cache.

use core::borrow::Borrow;
use core::hash::Hash;
use hashbrown::HashMap;
use parking_lot::RwLock;

#[derive(Debug)]
pub struct IndexCache<T> {
    map: RwLock<Option<HashMap<T, usize>>>,
}

impl<T> Default for IndexCache<T> {
    fn default() -> Self {
        Self {
            map: RwLock::new(None),
        }
    }
}

impl<T> IndexCache<T>
where
    T: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of the first occurrence of `key` in `keys`, as of the list
    /// the cache was populated from.
    pub fn try_get_index<Q>(&self, key: &Q, keys: &[T]) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if let Some(map) = self.map.read().as_ref() {
            return map.get(key).copied();
        }

        let mut guard = self.map.write();
        // another reader may have populated it while we waited
        let map = guard.get_or_insert_with(|| {
            log::trace!("Populating index cache from {} keys", keys.len());
            build(keys)
        });
        map.get(key).copied()
    }

    pub fn contains_key<Q>(&self, key: &Q, keys: &[T]) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.try_get_index(key, keys).is_some()
    }
}

impl<T> IndexCache<T> {
    /// Forgets the cached map; the next lookup repopulates it.
    pub fn invalidate(&self) {
        *self.map.write() = None;
    }

    pub fn is_populated(&self) -> bool {
        self.map.read().is_some()
    }

    /// Number of distinct cached keys; zero until populated.
    pub fn len(&self) -> usize {
        self.map.read().as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn build<T: Eq + Hash + Clone>(keys: &[T]) -> HashMap<T, usize> {
    let mut map = HashMap::with_capacity(keys.len());
    for (i, k) in keys.iter().enumerate() {
        map.entry(k.clone()).or_insert(i);
    }
    map
}
