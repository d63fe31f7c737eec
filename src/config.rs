//! Construction-time options for `ChainedHashTable`.

/// Options for a `ChainedHashTable`.
///
/// ```
/// use keyspace::TableConfig;
///
/// let config = TableConfig::new()
///     .bucket_count(TableConfig::suggested_bucket_count(1_000))
///     .max_entries(10_000)
///     .track_search_stats(true);
/// assert!(config.get_bucket_count() >= 1_667);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableConfig {
    pub(crate) bucket_count: u32,
    pub(crate) max_entries: u32,
    pub(crate) track_search_stats: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            bucket_count: 0,
            max_entries: u32::MAX,
            track_search_stats: false,
        }
    }
}

impl TableConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial number of buckets. Zero leaves the table uninitialized until
    /// an explicit `initialize`.
    #[must_use]
    pub fn bucket_count(mut self, n: u32) -> Self {
        self.bucket_count = n;
        self
    }

    /// Maximum number of live entries. Inserting a new key beyond this
    /// budget fails with `TableError::OutOfMemory`.
    #[must_use]
    pub fn max_entries(mut self, n: u32) -> Self {
        self.max_entries = n;
        self
    }

    /// Record the chain depth at which lookups are satisfied.
    #[must_use]
    pub fn track_search_stats(mut self, enabled: bool) -> Self {
        self.track_search_stats = enabled;
        self
    }

    pub fn get_bucket_count(&self) -> u32 {
        self.bucket_count
    }

    pub fn get_max_entries(&self) -> u32 {
        self.max_entries
    }

    /// Smallest prime bucket count that keeps `expected` entries at or
    /// below 60% saturation.
    pub fn suggested_bucket_count(expected: u32) -> u32 {
        let target = (u64::from(expected) * 5).div_ceil(3).max(2);
        let mut n = target;
        while n <= u64::from(u32::MAX) {
            if is_prime(n) {
                return n as u32;
            }
            n += 1;
        }
        u32::MAX
    }
}

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}
