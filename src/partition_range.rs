//! Lossless division of an inclusive `[low, high]` int64 key space into
//! contiguous partitions, and the inverse key -> partition lookup.
//!
//! Every key in `[low, high]` belongs to exactly one partition. When the
//! key count does not divide evenly, the first `remainder` partitions get
//! one extra key each.
//!
//! ```text
//! [0, 33] over 4 partitions     [i64::MIN, i64::MAX] over 2 partitions
//!   [0, 8]                        [-9223372036854775808, -1]
//!   [9, 17]                       [0, 9223372036854775807]
//!   [18, 25]
//!   [26, 33]
//! ```
//!
//! All width arithmetic is done on the unsigned span `high - low`, which
//! always fits in a `u64` even when the signed difference would overflow.

use crate::error::{PartitionError, PartitionResult};

/// Partition sizes derived from `(low, high, count)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Layout {
    low: i64,
    count: u32,
    // keys held by each partition at or past `remainder`
    per_partition: u64,
    // partitions `[0, remainder)` hold `per_partition + 1` keys
    remainder: u64,
}

impl Layout {
    fn new(low: i64, high: i64, count: u32) -> PartitionResult<Self> {
        if low > high {
            return Err(PartitionError::InvalidRange { low, high });
        }
        if count == 0 {
            return Err(PartitionError::ZeroPartitions);
        }

        // `high - low` without signed overflow; at most u64::MAX.
        let total = high.abs_diff(low);
        if count == 1 {
            // a single partition takes `total + 1` keys, which may be 2^64
            return Ok(Self {
                low,
                count,
                per_partition: total,
                remainder: 1,
            });
        }
        let n = u64::from(count);
        let mut per_partition = total / n;
        // +1 for the inclusive upper end, applied after the division so
        // that a full-domain span cannot overflow.
        let mut remainder = total % n + 1;
        if remainder == n {
            per_partition += 1;
            remainder = 0;
        }
        if per_partition < 1 {
            return Err(PartitionError::TooManyPartitions { low, high, count });
        }

        Ok(Self {
            low,
            count,
            per_partition,
            remainder,
        })
    }

    /// Bounds of partition `index`; `index < count`.
    fn range(&self, index: u32) -> (i64, i64) {
        let i = u64::from(index);
        // i * per_partition + min(i, remainder) <= high - low
        let (offset, width) = if i < self.remainder {
            (i * self.per_partition + i, self.per_partition)
        } else {
            (i * self.per_partition + self.remainder, self.per_partition - 1)
        };
        let low = self.low.wrapping_add_unsigned(offset);
        (low, low.wrapping_add_unsigned(width))
    }

    fn search(&self, key: i64) -> Option<u32> {
        let (mut start, mut end) = (0u32, self.count);
        while start < end {
            let probe = start + (end - start) / 2;
            let (low, high) = self.range(probe);
            if key > high {
                start = probe + 1;
            } else if key < low {
                end = probe;
            } else {
                return Some(probe);
            }
        }
        None
    }
}

/// Computes the inclusive bounds of partition `index` when `[low, high]`
/// is split into `count` partitions.
///
/// ```
/// use keyspace::partition_range;
///
/// assert_eq!(partition_range(0, 33, 4, 2), Ok((18, 25)));
/// assert_eq!(partition_range(-1, 1, 2, 0), Ok((-1, 0)));
/// ```
///
/// # Errors
///
/// Fails when `low > high`, `count == 0`, `index >= count`, or when the
/// range holds fewer keys than `count`.
pub fn partition_range(low: i64, high: i64, count: u32, index: u32) -> PartitionResult<(i64, i64)> {
    if low > high {
        return Err(PartitionError::InvalidRange { low, high });
    }
    if count == 0 {
        return Err(PartitionError::ZeroPartitions);
    }
    if index >= count {
        return Err(PartitionError::IndexOutOfRange { index, count });
    }
    if count == 1 {
        return Ok((low, high));
    }
    Ok(Layout::new(low, high, count)?.range(index))
}

/// Binary-searches the partition of `[low, high]` that owns `key`.
///
/// Returns `None` when `key` is outside `[low, high]` or the arguments do
/// not describe a valid partitioning.
pub fn find_partition_index(low: i64, high: i64, count: u32, key: i64) -> Option<u32> {
    if key < low || key > high || count == 0 {
        return None;
    }
    Layout::new(low, high, count).ok()?.search(key)
}

/// A validated uniform int64 range partitioning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Int64RangeScheme {
    high: i64,
    layout: Layout,
}

impl Int64RangeScheme {
    pub fn new(low: i64, high: i64, count: u32) -> PartitionResult<Self> {
        Ok(Self {
            high,
            layout: Layout::new(low, high, count)?,
        })
    }

    pub fn low(&self) -> i64 {
        self.layout.low
    }

    pub fn high(&self) -> i64 {
        self.high
    }

    pub fn partition_count(&self) -> u32 {
        self.layout.count
    }

    /// Number of keys in `[low, high]`; up to 2^64.
    pub fn key_count(&self) -> u128 {
        u128::from(self.high.abs_diff(self.layout.low)) + 1
    }

    pub fn contains(&self, key: i64) -> bool {
        (self.layout.low..=self.high).contains(&key)
    }

    pub fn range(&self, index: u32) -> PartitionResult<(i64, i64)> {
        if index >= self.layout.count {
            return Err(PartitionError::IndexOutOfRange {
                index,
                count: self.layout.count,
            });
        }
        Ok(self.layout.range(index))
    }

    pub fn index_of(&self, key: i64) -> Option<u32> {
        if !self.contains(key) {
            return None;
        }
        self.layout.search(key)
    }

    /// All partition bounds in index order.
    pub fn ranges(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        (0..self.layout.count).filter_map(move |i| self.range(i).ok())
    }
}
