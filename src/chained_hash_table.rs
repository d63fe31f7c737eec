//! ChainedHashTable: fixed bucket array of singly linked overflow chains.
//!
//! Nodes live in a generational slot arena and chains link them by slot
//! key, so relinking during `resize` never moves or reallocates a node and
//! a stale link can never alias a newer node.

use crate::config::TableConfig;
use crate::error::{TableError, TableResult};
use crate::hasher::{BuildKeyHasher, KeyEq, KeyHasher, NaturalEq};
use crate::reentrancy::DebugReentrancy;
use crate::search_stats::{SearchCounters, SearchStats};
use core::fmt;
use core::mem;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    struct NodeKey;
}

struct Node<K, V> {
    key: K,
    value: V,
    // cached at insertion; `hash % size` is always the bucket holding the node
    hash: u32,
    next: Option<NodeKey>,
}

/// Outcome of a successful `put`.
#[derive(Debug, PartialEq, Eq)]
pub enum PutOutcome<V> {
    /// A new node was appended to its chain.
    Inserted,
    /// The key existed and `force_update` was set; carries the prior value.
    Replaced(V),
    /// The key existed and `force_update` was not set; nothing changed.
    Collision,
}

#[derive(Debug, Default, Clone, Copy)]
struct Cursor {
    // next bucket whose head has not been visited yet
    bucket: usize,
    next: Option<NodeKey>,
}

/// Open-chained hash table with a pluggable 32-bit key hasher and an
/// optional pluggable key comparator.
///
/// The table performs no internal synchronization. It is `Send` when its
/// contents are, but not `Sync`; callers that share it wrap it in their own
/// lock.
pub struct ChainedHashTable<K, V, H = BuildKeyHasher, E = NaturalEq> {
    buckets: Vec<Option<NodeKey>>,
    nodes: SlotMap<NodeKey, Node<K, V>>,
    hasher: H,
    eq: E,
    max_entries: u32,
    cursor: Cursor,
    stats: SearchCounters,
    reentrancy: DebugReentrancy,
}

impl<K, V> ChainedHashTable<K, V> {
    /// An uninitialized table using `K: Hash` and `K: PartialEq`.
    pub fn new() -> Self {
        Self::uninitialized_with(BuildKeyHasher::default(), NaturalEq)
    }
}

impl<K, V> Default for ChainedHashTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> ChainedHashTable<K, V, H, NaturalEq>
where
    H: KeyHasher<K>,
    K: PartialEq,
{
    pub fn with_hasher(size: u32, hasher: H) -> TableResult<Self> {
        Self::with_hasher_and_eq(size, hasher, NaturalEq)
    }
}

impl<K, V> ChainedHashTable<K, V>
where
    K: core::hash::Hash + PartialEq,
{
    pub fn with_size(size: u32) -> TableResult<Self> {
        Self::with_hasher_and_eq(size, BuildKeyHasher::default(), NaturalEq)
    }
}

impl<K, V, H, E> ChainedHashTable<K, V, H, E> {
    /// A table with no bucket array. Lookups find nothing and `put` fails
    /// with `TableError::Uninitialized` until `initialize` is called.
    pub fn uninitialized_with(hasher: H, eq: E) -> Self {
        Self {
            buckets: Vec::new(),
            nodes: SlotMap::with_key(),
            hasher,
            eq,
            max_entries: u32::MAX,
            cursor: Cursor::default(),
            stats: SearchCounters::new(false),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn with_hasher_and_eq(size: u32, hasher: H, eq: E) -> TableResult<Self> {
        let mut table = Self::uninitialized_with(hasher, eq);
        table.initialize(size)?;
        Ok(table)
    }

    /// Builds a table from `config`; a zero bucket count yields an
    /// uninitialized table.
    pub fn with_config(config: &TableConfig, hasher: H, eq: E) -> TableResult<Self> {
        let mut table = Self::uninitialized_with(hasher, eq);
        table.max_entries = config.max_entries;
        table.stats = SearchCounters::new(config.track_search_stats);
        if config.bucket_count > 0 {
            table.initialize(config.bucket_count)?;
        }
        Ok(table)
    }

    /// (Re)allocates a zeroed bucket array of `size` and drops all entries.
    ///
    /// The new array is reserved before anything is dropped, so on error
    /// the table keeps its previous contents.
    pub fn initialize(&mut self, size: u32) -> TableResult<()> {
        let _g = self.reentrancy.enter();
        let buckets = allocate_buckets(size)?;
        self.nodes.clear();
        self.buckets = buckets;
        self.cursor = Cursor::default();
        self.stats.reset();
        log::trace!("Initialized chained hash table with {size} buckets");
        Ok(())
    }

    /// Like `initialize`, also replacing the hash and equality functions.
    pub fn initialize_with(&mut self, size: u32, hasher: H, eq: E) -> TableResult<()> {
        self.initialize(size)?;
        self.hasher = hasher;
        self.eq = eq;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        !self.buckets.is_empty()
    }

    /// Number of live entries.
    pub fn count(&self) -> u32 {
        // bounded by `max_entries`
        self.nodes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of buckets.
    pub fn size(&self) -> u32 {
        self.buckets.len() as u32
    }

    /// `count * 100 / size`; zero for an uninitialized table.
    pub fn saturation(&self) -> u32 {
        self.saturation_for(self.size())
    }

    /// Saturation the current entries would have in a table of `size`
    /// buckets.
    pub fn saturation_for(&self, size: u32) -> u32 {
        if size == 0 {
            return 0;
        }
        (u64::from(self.count()) * 100 / u64::from(size)) as u32
    }

    /// Drops every entry and empties every bucket, keeping the array.
    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.nodes.clear();
        self.buckets.fill(None);
        self.cursor = Cursor::default();
        self.stats.reset();
        log::trace!("Cleared chained hash table ({} buckets)", self.buckets.len());
    }

    /// Installs a bucket array of `new_size` and relinks every node into it
    /// by its cached hash. Keys are not rehashed and nodes are not moved.
    pub fn resize(&mut self, new_size: u32) -> TableResult<()> {
        let _g = self.reentrancy.enter();
        let mut buckets = allocate_buckets(new_size)?;
        let modulus = u64::from(new_size);
        for (k, node) in self.nodes.iter_mut() {
            let b = (u64::from(node.hash) % modulus) as usize;
            node.next = buckets[b];
            buckets[b] = Some(k);
        }
        let old_size = mem::replace(&mut self.buckets, buckets).len();
        self.cursor = Cursor::default();
        self.stats.reset();
        log::debug!(
            "Resized chained hash table from {old_size} to {new_size} buckets ({} entries)",
            self.nodes.len()
        );
        Ok(())
    }

    /// Current lookup statistics; all zero unless tracking was enabled in
    /// the `TableConfig`.
    pub fn search_stats(&self) -> SearchStats {
        self.stats.snapshot()
    }

    pub fn is_tracking_search_stats(&self) -> bool {
        self.stats.is_enabled()
    }

    pub fn reset_search_stats(&self) {
        self.stats.reset();
    }

    /// Rewinds the cursor to the first bucket.
    pub fn reset_cursor(&mut self) {
        self.cursor = Cursor::default();
    }

    /// Advances the cursor and returns the next entry in bucket order.
    ///
    /// Returns `None` once every bucket has been visited, and keeps doing
    /// so until `reset_cursor`. Removing an entry while a cursor is live is
    /// allowed and never yields a removed entry; inserting may or may not
    /// surface the new entry. `resize`, `clear` and `initialize` rewind the
    /// cursor.
    pub fn next_entry(&mut self) -> Option<(&K, &V)> {
        loop {
            if let Some(k) = self.cursor.next {
                if let Some(node) = self.nodes.get(k) {
                    self.cursor.next = node.next;
                    return Some((&node.key, &node.value));
                }
                self.cursor.next = None;
            }
            let head = *self.buckets.get(self.cursor.bucket)?;
            self.cursor.bucket += 1;
            self.cursor.next = head;
        }
    }

    /// Iterates all entries in unspecified order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.nodes.iter(),
        }
    }

    /// Iterates all entries with mutable values in unspecified order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.nodes.iter_mut(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    #[inline]
    fn bucket_of(&self, hash: u32) -> usize {
        (u64::from(hash) % self.buckets.len() as u64) as usize
    }
}

impl<K, V, H, E> ChainedHashTable<K, V, H, E>
where
    H: KeyHasher<K>,
    E: KeyEq<K>,
{
    /// Walks the key's chain and records the depth of the walk.
    fn locate(&self, key: &K) -> Option<NodeKey> {
        if self.buckets.is_empty() {
            return None;
        }
        let hash = self.hasher.hash_key(key);
        let mut cur = self.buckets[self.bucket_of(hash)];
        let mut depth = 0u32;
        while let Some(k) = cur {
            let node = &self.nodes[k];
            if self.eq.key_eq(&node.key, key) {
                self.stats.record_hit(depth);
                return Some(k);
            }
            depth += 1;
            cur = node.next;
        }
        self.stats.record_miss(depth);
        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let _g = self.reentrancy.enter();
        let k = self.locate(key)?;
        Some(&self.nodes[k].value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let _g = self.reentrancy.enter();
        let k = self.locate(key)?;
        Some(&mut self.nodes[k].value)
    }

    /// Returns a copy of the value so the caller holds no borrow of the table.
    pub fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.get(key).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let _g = self.reentrancy.enter();
        self.locate(key).is_some()
    }

    /// Inserts `key -> value`, or handles an existing key per `force_update`.
    ///
    /// A new node is appended at the tail of its chain. On error nothing is
    /// modified and `key`/`value` are dropped.
    pub fn put(&mut self, key: K, value: V, force_update: bool) -> TableResult<PutOutcome<V>> {
        let _g = self.reentrancy.enter();
        if self.buckets.is_empty() {
            return Err(TableError::Uninitialized);
        }
        let hash = self.hasher.hash_key(&key);
        let b = self.bucket_of(hash);

        let mut tail = None;
        let mut cur = self.buckets[b];
        while let Some(k) = cur {
            let node = &self.nodes[k];
            if self.eq.key_eq(&node.key, &key) {
                if !force_update {
                    return Ok(PutOutcome::Collision);
                }
                let prev = mem::replace(&mut self.nodes[k].value, value);
                return Ok(PutOutcome::Replaced(prev));
            }
            tail = Some(k);
            cur = node.next;
        }

        if self.nodes.len() >= self.max_entries as usize {
            return Err(TableError::OutOfMemory);
        }
        let new = self.nodes.insert(Node {
            key,
            value,
            hash,
            next: None,
        });
        match tail {
            Some(t) => self.nodes[t].next = Some(new),
            None => self.buckets[b] = Some(new),
        }
        Ok(PutOutcome::Inserted)
    }

    /// Removes `key` and returns its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes `key` and returns the stored key and value.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let _g = self.reentrancy.enter();
        if self.buckets.is_empty() {
            return None;
        }
        let hash = self.hasher.hash_key(key);
        let b = self.bucket_of(hash);

        let mut prev: Option<NodeKey> = None;
        let mut cur = self.buckets[b];
        while let Some(k) = cur {
            let node = &self.nodes[k];
            let next = node.next;
            if self.eq.key_eq(&node.key, key) {
                match prev {
                    Some(p) => self.nodes[p].next = next,
                    None => self.buckets[b] = next,
                }
                if self.cursor.next == Some(k) {
                    self.cursor.next = next;
                }
                let node = self.nodes.remove(k)?;
                return Some((node.key, node.value));
            }
            prev = Some(k);
            cur = next;
        }
        None
    }
}

fn allocate_buckets(size: u32) -> TableResult<Vec<Option<NodeKey>>> {
    if size == 0 {
        return Err(TableError::ZeroSize);
    }
    let len = size as usize;
    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(len)
        .map_err(|_| TableError::OutOfMemory)?;
    buckets.resize(len, None);
    Ok(buckets)
}

impl<K: fmt::Debug, V: fmt::Debug, H, E> fmt::Debug for ChainedHashTable<K, V, H, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over immutable entries in `ChainedHashTable`.
pub struct Iter<'a, K, V> {
    it: slotmap::basic::Iter<'a, NodeKey, Node<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, n)| (&n.key, &n.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

/// Iterator over mutable entries in `ChainedHashTable`.
pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, NodeKey, Node<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, n)| (&n.key, &mut n.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, K, V, H, E> IntoIterator for &'a ChainedHashTable<K, V, H, E> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn table(size: u32) -> ChainedHashTable<String, i32> {
        ChainedHashTable::with_size(size).unwrap()
    }

    fn s(k: &str) -> String {
        k.to_string()
    }

    /// Walks every chain and checks cached-hash placement and chain uniqueness.
    fn assert_chains_consistent<K, V, H, E>(t: &ChainedHashTable<K, V, H, E>)
    where
        H: KeyHasher<K>,
        E: KeyEq<K>,
    {
        let mut seen = 0usize;
        for (b, head) in t.buckets.iter().enumerate() {
            let mut chain: Vec<NodeKey> = Vec::new();
            let mut cur = *head;
            while let Some(k) = cur {
                let node = &t.nodes[k];
                assert_eq!(t.bucket_of(node.hash), b, "node in wrong bucket");
                for other in &chain {
                    assert!(!t.eq.key_eq(&t.nodes[*other].key, &node.key), "duplicate key in chain");
                }
                chain.push(k);
                cur = node.next;
            }
            seen += chain.len();
        }
        assert_eq!(seen, t.count() as usize, "count disagrees with chains");
    }

    /// Invariant: an uninitialized table finds nothing and refuses inserts.
    #[test]
    fn uninitialized_table() {
        let mut t: ChainedHashTable<String, i32> = ChainedHashTable::new();
        assert!(!t.is_initialized());
        assert_eq!(t.size(), 0);
        assert_eq!(t.saturation(), 0);
        assert_eq!(t.get(&s("a")), None);
        assert!(!t.contains_key(&s("a")));
        assert_eq!(t.remove(&s("a")), None);
        assert_eq!(t.put(s("a"), 1, false), Err(TableError::Uninitialized));
        assert_eq!(t.next_entry(), None);

        t.initialize(7).unwrap();
        assert!(t.is_initialized());
        assert_eq!(t.put(s("a"), 1, false), Ok(PutOutcome::Inserted));
        assert_eq!(t.get(&s("a")), Some(&1));
    }

    #[test]
    fn zero_size_rejected() {
        assert_eq!(
            ChainedHashTable::<String, i32>::with_size(0).err(),
            Some(TableError::ZeroSize)
        );
        let mut t = table(3);
        t.put(s("a"), 1, false).unwrap();
        assert_eq!(t.resize(0), Err(TableError::ZeroSize));
        assert_eq!(t.size(), 3);
        assert_eq!(t.get(&s("a")), Some(&1));
    }

    /// Invariant: `put(force_update=false)` on an existing key is a collision and
    /// leaves the value; `force_update=true` replaces in place and yields the old value.
    #[test]
    fn update_semantics() {
        let mut t = table(11);
        assert_eq!(t.put(s("k"), 1, false), Ok(PutOutcome::Inserted));
        assert_eq!(t.put(s("k"), 2, false), Ok(PutOutcome::Collision));
        assert_eq!(t.get(&s("k")), Some(&1));
        assert_eq!(t.put(s("k"), 3, true), Ok(PutOutcome::Replaced(1)));
        assert_eq!(t.get(&s("k")), Some(&3));
        assert_eq!(t.count(), 1);
    }

    #[test]
    fn remove_reports_value_and_not_found() {
        let mut t = table(5);
        t.put(s("a"), 1, false).unwrap();
        t.put(s("b"), 2, false).unwrap();
        assert_eq!(t.remove_entry(&s("a")), Some((s("a"), 1)));
        assert_eq!(t.remove(&s("a")), None);
        assert_eq!(t.count(), 1);
        assert_eq!(t.remove(&s("b")), Some(2));
        assert!(t.is_empty());
    }

    /// Invariant: chains resolve collisions by equality; removal from the head,
    /// middle and tail of a chain keeps the remaining links intact.
    #[test]
    fn single_bucket_chain_unlinking() {
        let mut t: ChainedHashTable<u32, u32, _> =
            ChainedHashTable::with_hasher(1, |_: &u32| 0u32).unwrap();
        for i in 0..6 {
            assert_eq!(t.put(i, i * 10, false), Ok(PutOutcome::Inserted));
        }
        assert_chains_consistent(&t);

        assert_eq!(t.remove(&0), Some(0)); // head
        assert_eq!(t.remove(&3), Some(30)); // middle
        assert_eq!(t.remove(&5), Some(50)); // tail
        assert_chains_consistent(&t);
        for (k, v) in [(1, 10), (2, 20), (4, 40)] {
            assert_eq!(t.get(&k), Some(&v));
        }
        assert_eq!(t.count(), 3);

        assert_eq!(t.put(6, 60, false), Ok(PutOutcome::Inserted));
        assert_chains_consistent(&t);
    }

    /// Invariant: new nodes are appended at the chain tail, so a single-bucket
    /// table walks entries in insertion order.
    #[test]
    fn chain_is_tail_appended() {
        let mut t: ChainedHashTable<u32, (), _> =
            ChainedHashTable::with_hasher(1, |_: &u32| 42u32).unwrap();
        for i in [5, 3, 9, 1] {
            t.put(i, (), false).unwrap();
        }
        let mut order = Vec::new();
        while let Some((k, _)) = t.next_entry() {
            order.push(*k);
        }
        assert_eq!(order, vec![5, 3, 9, 1]);
    }

    /// Invariant: resize preserves every entry and the count, and re-buckets nodes
    /// by cached hash without invoking the hasher.
    #[test]
    fn resize_is_lossless_and_does_not_rehash() {
        use std::cell::Cell;
        let calls = Cell::new(0u32);
        let hasher = |k: &u64| {
            calls.set(calls.get() + 1);
            (*k as u32).wrapping_mul(2_654_435_761)
        };
        let mut t: ChainedHashTable<u64, u64, _> = ChainedHashTable::with_hasher(3, hasher).unwrap();
        for i in 0..200 {
            t.put(i, i * i, false).unwrap();
        }
        let before = calls.get();
        t.resize(401).unwrap();
        assert_eq!(calls.get(), before, "resize must not call the hasher");
        assert_eq!(t.size(), 401);
        assert_eq!(t.count(), 200);
        assert_chains_consistent(&t);
        for i in 0..200 {
            assert_eq!(t.get(&i), Some(&(i * i)));
        }
        t.resize(2).unwrap();
        assert_chains_consistent(&t);
        assert_eq!(t.count(), 200);
    }

    #[test]
    fn clear_keeps_buckets() {
        let mut t = table(13);
        for i in 0..20 {
            t.put(format!("k{i}"), i, false).unwrap();
        }
        t.clear();
        assert_eq!(t.count(), 0);
        assert_eq!(t.size(), 13);
        assert!(t.buckets.iter().all(Option::is_none));
        assert_eq!(t.get(&s("k1")), None);
        t.put(s("k1"), 1, false).unwrap();
        assert_eq!(t.get(&s("k1")), Some(&1));
    }

    /// Invariant: re-initializing drops all entries and installs the new size.
    #[test]
    fn initialize_acts_as_reset() {
        let mut t = table(3);
        t.put(s("a"), 1, false).unwrap();
        t.initialize(17).unwrap();
        assert_eq!(t.size(), 17);
        assert_eq!(t.count(), 0);
        assert!(!t.contains_key(&s("a")));
    }

    fn len_hash(k: &String) -> u32 {
        k.len() as u32
    }

    fn exact_eq(a: &String, b: &String) -> bool {
        a == b
    }

    fn folded_eq(a: &String, b: &String) -> bool {
        a.eq_ignore_ascii_case(b)
    }

    #[test]
    fn initialize_with_replaces_functions() {
        type Table = ChainedHashTable<String, i32, fn(&String) -> u32, fn(&String, &String) -> bool>;
        let hasher: fn(&String) -> u32 = len_hash;
        let mut t: Table = ChainedHashTable::with_hasher_and_eq(5, hasher, exact_eq as fn(&String, &String) -> bool).unwrap();
        t.put(s("Key"), 1, false).unwrap();
        assert_eq!(t.put(s("KEY"), 2, false), Ok(PutOutcome::Inserted));

        t.initialize_with(5, hasher, folded_eq).unwrap();
        assert!(t.is_empty());
        t.put(s("Key"), 1, false).unwrap();
        assert_eq!(t.put(s("KEY"), 2, false), Ok(PutOutcome::Collision));
        assert_eq!(t.get(&s("kEy")), Some(&1));
    }

    #[test]
    fn saturation_math() {
        let mut t = table(10);
        for i in 0..6 {
            t.put(format!("{i}"), i, false).unwrap();
        }
        assert_eq!(t.saturation(), 60);
        assert_eq!(t.saturation_for(20), 30);
        assert_eq!(t.saturation_for(4), 150);
        assert_eq!(t.saturation_for(0), 0);
    }

    /// Invariant: exhausting the entry budget reports OutOfMemory and leaves the
    /// table unchanged; updates of existing keys still succeed.
    #[test]
    fn entry_budget_reports_out_of_memory() {
        let config = TableConfig::new().bucket_count(7).max_entries(2);
        let mut t: ChainedHashTable<String, i32> =
            ChainedHashTable::with_config(&config, BuildKeyHasher::default(), NaturalEq).unwrap();
        t.put(s("a"), 1, false).unwrap();
        t.put(s("b"), 2, false).unwrap();
        assert_eq!(t.put(s("c"), 3, false), Err(TableError::OutOfMemory));
        assert_eq!(t.count(), 2);
        assert!(!t.contains_key(&s("c")));
        assert_eq!(t.put(s("a"), 10, true), Ok(PutOutcome::Replaced(1)));

        t.remove(&s("b"));
        assert_eq!(t.put(s("c"), 3, false), Ok(PutOutcome::Inserted));
    }

    #[test]
    fn config_without_buckets_is_uninitialized() {
        let t: ChainedHashTable<String, i32> =
            ChainedHashTable::with_config(&TableConfig::new(), BuildKeyHasher::default(), NaturalEq)
                .unwrap();
        assert!(!t.is_initialized());
    }

    /// Invariant: the cursor yields every entry exactly once, then stays exhausted
    /// until reset.
    #[test]
    fn cursor_visits_each_entry_once() {
        let mut t = table(7);
        let keys: BTreeSet<String> = (0..30).map(|i| format!("k{i}")).collect();
        for (i, k) in keys.iter().enumerate() {
            t.put(k.clone(), i as i32, false).unwrap();
        }

        let mut seen = BTreeSet::new();
        t.reset_cursor();
        while let Some((k, _)) = t.next_entry() {
            assert!(seen.insert(k.clone()), "entry yielded twice");
        }
        assert_eq!(seen, keys);
        assert_eq!(t.next_entry(), None);
        assert_eq!(t.next_entry(), None);

        t.reset_cursor();
        assert!(t.next_entry().is_some());
    }

    /// Invariant: removing the entry the cursor would yield next does not
    /// surface it; the walk continues with the rest of the chain.
    #[test]
    fn cursor_survives_removal_of_pending_entry() {
        let mut t: ChainedHashTable<u32, u32, _> =
            ChainedHashTable::with_hasher(1, |_: &u32| 0u32).unwrap();
        for i in 0..4 {
            t.put(i, i, false).unwrap();
        }
        assert_eq!(t.next_entry(), Some((&0, &0)));
        t.remove(&1);
        let rest: Vec<u32> = std::iter::from_fn(|| t.next_entry().map(|(k, _)| *k)).collect();
        assert_eq!(rest, vec![2, 3]);
    }

    #[test]
    fn resize_rewinds_cursor() {
        let mut t = table(3);
        for i in 0..5 {
            t.put(format!("{i}"), i, false).unwrap();
        }
        while t.next_entry().is_some() {}
        t.resize(5).unwrap();
        let n = std::iter::from_fn(|| t.next_entry().map(|_| ())).count();
        assert_eq!(n, 5);
    }

    #[test]
    fn iterators_and_get_mut() {
        let mut t = table(5);
        for i in 0..4 {
            t.put(format!("k{i}"), i, false).unwrap();
        }
        for (_, v) in t.iter_mut() {
            *v += 100;
        }
        *t.get_mut(&s("k0")).unwrap() = -1;
        let mut vals: Vec<i32> = t.values().copied().collect();
        vals.sort();
        assert_eq!(vals, vec![-1, 101, 102, 103]);
        assert_eq!(t.keys().count(), 4);
        assert_eq!((&t).into_iter().count(), 4);
        assert_eq!(t.get_cloned(&s("k2")), Some(102));
    }

    /// Invariant: a custom comparator decides key identity.
    #[test]
    fn custom_equality() {
        let mut t = ChainedHashTable::with_hasher_and_eq(
            7,
            |k: &String| k.to_ascii_lowercase().bytes().map(u32::from).sum::<u32>(),
            |a: &String, b: &String| a.eq_ignore_ascii_case(b),
        )
        .unwrap();
        assert_eq!(t.put(s("Alpha"), 1, false), Ok(PutOutcome::Inserted));
        assert_eq!(t.put(s("ALPHA"), 2, false), Ok(PutOutcome::Collision));
        assert_eq!(t.get(&s("alpha")), Some(&1));
        assert_eq!(t.count(), 1);
    }

    fn byte_sum(k: &String) -> u32 {
        k.bytes().map(u32::from).sum()
    }

    /// Invariant: the comparator alone decides identity within a chain, even
    /// when equal keys hash differently.
    #[test]
    fn comparator_decides_identity_within_chain() {
        let mut t = ChainedHashTable::with_hasher_and_eq(
            1,
            byte_sum as fn(&String) -> u32,
            |a: &String, b: &String| a.eq_ignore_ascii_case(b),
        )
        .unwrap();
        assert_ne!(byte_sum(&s("Key")), byte_sum(&s("KEY")));
        assert_eq!(t.put(s("Key"), 1, false), Ok(PutOutcome::Inserted));
        assert_eq!(t.put(s("KEY"), 2, false), Ok(PutOutcome::Collision));
        assert_eq!(t.count(), 1);
        assert_eq!(t.get(&s("kEy")), Some(&1));
        assert_eq!(t.put(s("KEY"), 3, true), Ok(PutOutcome::Replaced(1)));
        assert_eq!(t.remove(&s("key")), Some(3));
        assert!(t.is_empty());
        assert_chains_consistent(&t);
    }

    /// Invariant: hits are bucketed by the depth of the matching node; resize and
    /// clear reset the counters.
    #[test]
    fn search_stats_by_depth() {
        let config = TableConfig::new().bucket_count(1).track_search_stats(true);
        let mut t = ChainedHashTable::with_config(&config, |_: &u32| 0u32, NaturalEq).unwrap();
        for i in 0..4u32 {
            t.put(i, (), false).unwrap();
        }
        for i in 0..4u32 {
            assert!(t.contains_key(&i));
        }
        assert!(!t.contains_key(&99));
        assert_eq!(
            t.search_stats(),
            SearchStats {
                depth_0: 1,
                depth_1: 1,
                depth_2_plus: 2,
                max_depth: 4,
            }
        );
        t.resize(8).unwrap();
        assert_eq!(t.search_stats(), SearchStats::default());
    }

    #[test]
    fn stats_off_by_default() {
        let mut t = table(3);
        t.put(s("a"), 1, false).unwrap();
        let _ = t.get(&s("a"));
        assert!(!t.is_tracking_search_stats());
        assert_eq!(t.search_stats(), SearchStats::default());
    }

    /// Documented misuse: a hash that drifts after insertion makes the key
    /// unreachable but keeps the table structurally sound.
    #[test]
    fn drifting_hash_strands_key_without_corruption() {
        use std::cell::Cell;
        let salt = Cell::new(0u32);
        let mut t = ChainedHashTable::with_hasher(97, |k: &u32| k.wrapping_add(salt.get())).unwrap();
        t.put(1u32, "one", false).unwrap();
        t.put(2u32, "two", false).unwrap();
        salt.set(13);
        assert_eq!(t.get(&1), None);
        assert_eq!(t.count(), 2);
        t.resize(101).unwrap();
        assert_eq!(t.count(), 2);
        assert_eq!(t.iter().count(), 2);
        salt.set(0);
        assert_eq!(t.get(&2), Some(&"two"));
    }

    #[test]
    fn debug_renders_as_map() {
        let mut t = table(3);
        t.put(s("a"), 1, false).unwrap();
        assert_eq!(format!("{t:?}"), r#"{"a": 1}"#);
    }

    /// Invariant (debug-only): re-entering the table from the comparator panics.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_from_comparator_panics() {
        use std::cell::Cell;
        type Table = ChainedHashTable<u32, u32, fn(&u32) -> u32, Box<dyn Fn(&u32, &u32) -> bool>>;
        let target: std::rc::Rc<Cell<*const Table>> = std::rc::Rc::new(Cell::new(core::ptr::null()));
        let probe = target.clone();
        let eq: Box<dyn Fn(&u32, &u32) -> bool> = Box::new(move |a: &u32, b: &u32| {
            let p = probe.get();
            if !p.is_null() {
                // Re-enter the same table during probing.
                unsafe {
                    let _ = (*p).contains_key(a);
                }
            }
            a == b
        });
        let hasher: fn(&u32) -> u32 = |_| 0;
        let mut t: Table = ChainedHashTable::with_hasher_and_eq(1, hasher, eq).unwrap();
        t.put(1, 1, false).unwrap();
        target.set(&t as *const Table);
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = t.get(&2);
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }
}
