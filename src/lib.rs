//! keyspace: an open-chained hash table and lossless int64 partition
//! range mapping for partitioned services.
//!
//! Internal Design:
//!
//! Summary
//! - Two independent components:
//!   - ChainedHashTable<K, V, H, E>: fixed-size bucket array of singly
//!     linked overflow chains with a pluggable 32-bit hasher and an
//!     optional pluggable comparator; explicit `resize` relinks nodes by
//!     their cached hash.
//!   - Partition range mapping: pure functions that split an inclusive
//!     `[low, high]` i64 range into N contiguous partitions and find the
//!     partition owning a key, plus `IndexCache` and `PartitionedService`
//!     for cuid- and name-addressed partitions.
//!
//! Constraints
//! - ChainedHashTable is single-threaded: `Send` but not `Sync`, no
//!   locks or atomics. Callers that share one serialize access themselves.
//! - Allocation-bound operations (`initialize`, `put` of a new key,
//!   `resize`) either succeed or leave the table untouched.
//! - The partition functions are pure and re-entrant; `IndexCache` is the
//!   only shared state and guards itself with a read/write lock.
//!
//! Storage
//! - Chain nodes live in a generational slot arena; bucket heads and
//!   `next` links are slot keys. Relinking during `resize` is one modulo
//!   and two link writes per node; nodes are never moved or rehashed.
//! - A stale slot key (e.g. a cursor pointing at a removed node) resolves
//!   to nothing instead of aliasing a newer node.
//!
//! Hasher invariants
//! - Each node stores the `u32` hash computed at insertion. Bucket
//!   placement always uses the stored hash; the hasher is never invoked for
//!   a stored key again. A hasher that changes its answer for a live key
//!   strands that key, it does not corrupt the table.
//!
//! Reentrancy policy
//! - The table only calls user code (hasher, comparator) while probing. A
//!   debug-only guard at each entry point panics if such a callback
//!   re-enters the same table.
//!
//! Partition arithmetic
//! - Widths are computed on the unsigned span `high - low`, which fits in
//!   a `u64` even for `[i64::MIN, i64::MAX]`. The `+1` for the inclusive end
//!   is added to the division remainder, never to the span.
//!
//! Notes and non-goals
//! - No automatic growth: the caller picks the bucket count
//!   (`TableConfig::suggested_bucket_count`) and calls `resize`.
//! - No persistence and no wire format for either component.

mod chained_hash_table;
mod chained_hash_table_proptest;
mod config;
mod error;
mod hasher;
mod index_cache;
mod partition_range;
mod partitioned_service;
mod reentrancy;
mod search_stats;

pub use chained_hash_table::{ChainedHashTable, Iter, IterMut, PutOutcome};
pub use config::TableConfig;
pub use error::{PartitionError, PartitionResult, TableError, TableResult};
pub use hasher::{BuildKeyHasher, KeyEq, KeyHasher, NaturalEq};
pub use index_cache::IndexCache;
pub use partition_range::{find_partition_index, partition_range, Int64RangeScheme};
pub use partitioned_service::{
    Cuid, PartitionInfo, PartitionKey, PartitionKeyKind, PartitionScheme, PartitionedService,
};
pub use search_stats::SearchStats;
