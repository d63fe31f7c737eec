//! Hash and equality capabilities plugged into `ChainedHashTable`.
//!
//! Both traits are implemented for plain closures so callers can pass
//! `|k: &u64| *k as u32` or `|a: &String, b: &String| a.eq_ignore_ascii_case(b)`
//! directly.
//!
//! Contract: the hash of a key must not change while the key is present in
//! a table. Nodes cache the hash at insertion and the table never calls the
//! hasher for a stored key again, so a drifting hash makes the key
//! unreachable rather than corrupting the table.
//!
//! Within a chain the comparator alone decides key identity; the cached
//! hash only picks the bucket. Keys that compare equal but hash apart are
//! only recognised as equal when they share a bucket, so a comparator
//! looser than the hasher should come with a hasher that agrees with it.

use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;

/// Produces the 32-bit bucket hash of a key.
pub trait KeyHasher<K: ?Sized> {
    fn hash_key(&self, key: &K) -> u32;
}

impl<K: ?Sized, F> KeyHasher<K> for F
where
    F: Fn(&K) -> u32,
{
    #[inline]
    fn hash_key(&self, key: &K) -> u32 {
        self(key)
    }
}

/// Adapts any `BuildHasher` to a `KeyHasher` by folding the 64-bit hash.
#[derive(Clone, Debug, Default)]
pub struct BuildKeyHasher<S = RandomState> {
    build: S,
}

impl<S> BuildKeyHasher<S> {
    pub fn new(build: S) -> Self {
        Self { build }
    }
}

impl<K, S> KeyHasher<K> for BuildKeyHasher<S>
where
    K: ?Sized + Hash,
    S: BuildHasher,
{
    #[inline]
    fn hash_key(&self, key: &K) -> u32 {
        let h = self.build.hash_one(key);
        (h ^ (h >> 32)) as u32
    }
}

/// Decides whether two keys are the same entry.
pub trait KeyEq<K: ?Sized> {
    fn key_eq(&self, a: &K, b: &K) -> bool;
}

impl<K: ?Sized, F> KeyEq<K> for F
where
    F: Fn(&K, &K) -> bool,
{
    #[inline]
    fn key_eq(&self, a: &K, b: &K) -> bool {
        self(a, b)
    }
}

/// The key type's own `PartialEq`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaturalEq;

impl<K: ?Sized + PartialEq> KeyEq<K> for NaturalEq {
    #[inline]
    fn key_eq(&self, a: &K, b: &K) -> bool {
        a == b
    }
}
