//! Descriptor of a partitioned service: its partition scheme, one
//! consistency unit id per partition, and the lookups between keys,
//! partitions and ids.
//!
//! Int64 range schemes resolve keys with the binary search in
//! `partition_range`; named schemes and cuid lookups go through an
//! `IndexCache`. Clones share their caches. A structural change
//! (`update_cuids`, `add_named_partitions`, `remove_named_partitions`)
//! installs fresh caches instead of mutating the shared ones.

use crate::error::{PartitionError, PartitionResult};
use crate::index_cache::IndexCache;
use crate::partition_range::Int64RangeScheme;
use core::fmt;
use hashbrown::HashSet;
use std::sync::Arc;

/// Opaque identifier of one partition of a service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cuid(u128);

impl Cuid {
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for Cuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v >> 48) as u16,
            v & 0xffff_ffff_ffff
        )
    }
}

/// How a service's key space is divided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartitionScheme {
    Singleton,
    UniformInt64Range(Int64RangeScheme),
    Named(Vec<String>),
}

impl PartitionScheme {
    pub fn uniform_int64_range(low: i64, high: i64, count: u32) -> PartitionResult<Self> {
        Int64RangeScheme::new(low, high, count).map(Self::UniformInt64Range)
    }

    pub fn named<I, S>(names: I) -> PartitionResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        validate_names(&names)?;
        Ok(Self::Named(names))
    }

    pub fn partition_count(&self) -> usize {
        match self {
            Self::Singleton => 1,
            Self::UniformInt64Range(s) => s.partition_count() as usize,
            Self::Named(names) => names.len(),
        }
    }

    pub fn key_kind(&self) -> PartitionKeyKind {
        match self {
            Self::Singleton => PartitionKeyKind::None,
            Self::UniformInt64Range(_) => PartitionKeyKind::Int64,
            Self::Named(_) => PartitionKeyKind::Named,
        }
    }

    fn validate(&self) -> PartitionResult<()> {
        match self {
            Self::Named(names) => validate_names(names),
            _ => Ok(()),
        }
    }
}

fn validate_names(names: &[String]) -> PartitionResult<()> {
    if names.is_empty() {
        return Err(PartitionError::ZeroPartitions);
    }
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if name.is_empty() {
            return Err(PartitionError::EmptyName);
        }
        if !seen.insert(name.as_str()) {
            return Err(PartitionError::DuplicateName(name.clone()));
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionKeyKind {
    None,
    Int64,
    Named,
}

/// A key addressed to a service.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PartitionKey {
    None,
    Int64(i64),
    Named(String),
}

impl PartitionKey {
    pub fn kind(&self) -> PartitionKeyKind {
        match self {
            Self::None => PartitionKeyKind::None,
            Self::Int64(_) => PartitionKeyKind::Int64,
            Self::Named(_) => PartitionKeyKind::Named,
        }
    }
}

/// What one partition covers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PartitionInfo {
    Singleton,
    Int64Range { low: i64, high: i64 },
    Named(String),
}

#[derive(Clone, Debug)]
pub struct PartitionedService {
    scheme: PartitionScheme,
    cuids: Vec<Cuid>,
    cuid_index: Arc<IndexCache<Cuid>>,
    name_index: Arc<IndexCache<String>>,
}

impl PartitionedService {
    /// Validates `scheme` and pairs partition `i` with `cuids[i]`.
    pub fn new(scheme: PartitionScheme, cuids: Vec<Cuid>) -> PartitionResult<Self> {
        if let Err(e) = scheme.validate().and_then(|()| validate_cuids(&scheme, &cuids)) {
            log::warn!("Rejected partitioned service descriptor: {e}");
            return Err(e);
        }
        Ok(Self {
            scheme,
            cuids,
            cuid_index: Arc::new(IndexCache::new()),
            name_index: Arc::new(IndexCache::new()),
        })
    }

    pub fn scheme(&self) -> &PartitionScheme {
        &self.scheme
    }

    pub fn cuids(&self) -> &[Cuid] {
        &self.cuids
    }

    pub fn partition_count(&self) -> usize {
        self.scheme.partition_count()
    }

    pub fn key_kind(&self) -> PartitionKeyKind {
        self.scheme.key_kind()
    }

    /// Bounds of int64 partition `index`.
    pub fn partition_range(&self, index: u32) -> PartitionResult<(i64, i64)> {
        match &self.scheme {
            PartitionScheme::UniformInt64Range(s) => s.range(index),
            _ => Err(PartitionError::SchemeMismatch {
                expected: PartitionKeyKind::Int64,
                actual: self.key_kind(),
            }),
        }
    }

    /// Partition owning `key`, or `None` if the key kind does not match the
    /// scheme or the key is outside the service.
    pub fn partition_index(&self, key: &PartitionKey) -> Option<usize> {
        match (&self.scheme, key) {
            (PartitionScheme::Singleton, PartitionKey::None) => Some(0),
            (PartitionScheme::UniformInt64Range(s), PartitionKey::Int64(k)) => {
                s.index_of(*k).map(|i| i as usize)
            }
            (PartitionScheme::Named(names), PartitionKey::Named(name)) => {
                self.name_index.try_get_index(name.as_str(), names)
            }
            _ => None,
        }
    }

    pub fn cuid_for(&self, key: &PartitionKey) -> Option<Cuid> {
        self.partition_index(key)
            .and_then(|i| self.cuids.get(i).copied())
    }

    pub fn partition_info(&self, cuid: &Cuid) -> Option<PartitionInfo> {
        let Some(index) = self.cuid_index.try_get_index(cuid, &self.cuids) else {
            log::debug!("{cuid} not found among {} cuids", self.cuids.len());
            return None;
        };
        self.info_at(index)
    }

    fn info_at(&self, index: usize) -> Option<PartitionInfo> {
        match &self.scheme {
            PartitionScheme::Singleton => Some(PartitionInfo::Singleton),
            PartitionScheme::UniformInt64Range(s) => {
                let (low, high) = s.range(u32::try_from(index).ok()?).ok()?;
                Some(PartitionInfo::Int64Range { low, high })
            }
            PartitionScheme::Named(names) => names.get(index).cloned().map(PartitionInfo::Named),
        }
    }

    /// Whether `key` addresses some partition of this service.
    pub fn contains_key(&self, key: &PartitionKey) -> bool {
        match (&self.scheme, key) {
            (PartitionScheme::Singleton, PartitionKey::None) => true,
            (PartitionScheme::UniformInt64Range(s), PartitionKey::Int64(k)) => s.contains(*k),
            (PartitionScheme::Named(names), PartitionKey::Named(name)) => {
                self.name_index.contains_key(name.as_str(), names)
            }
            _ => false,
        }
    }

    /// Whether `info` lies within this service's key space.
    pub fn contains_info(&self, info: &PartitionInfo) -> bool {
        match (&self.scheme, info) {
            (PartitionScheme::Singleton, PartitionInfo::Singleton) => true,
            (PartitionScheme::UniformInt64Range(s), PartitionInfo::Int64Range { low, high }) => {
                s.low() <= *low && *high <= s.high()
            }
            (PartitionScheme::Named(names), PartitionInfo::Named(name)) => {
                self.name_index.contains_key(name.as_str(), names)
            }
            _ => false,
        }
    }

    pub fn contains_cuid(&self, cuid: &Cuid) -> bool {
        self.cuid_index.contains_key(cuid, &self.cuids)
    }

    /// Replaces the cuid list and installs a fresh cuid index.
    pub fn update_cuids(&mut self, cuids: Vec<Cuid>) -> PartitionResult<()> {
        validate_cuids(&self.scheme, &cuids)?;
        self.cuids = cuids;
        self.cuid_index = Arc::new(IndexCache::new());
        Ok(())
    }

    /// Appends named partitions, pairing each new name with the cuid at the
    /// same position. On error the descriptor is left unchanged.
    pub fn add_named_partitions<I, S>(&mut self, names: I, cuids: Vec<Cuid>) -> PartitionResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all_names = self.named_partitions()?.to_vec();
        let added: Vec<String> = names.into_iter().map(Into::into).collect();
        if added.len() != cuids.len() {
            return Err(PartitionError::CuidCountMismatch {
                expected: added.len(),
                actual: cuids.len(),
            });
        }
        let count = added.len();
        all_names.extend(added);
        validate_names(&all_names)?;

        let mut all_cuids = self.cuids.clone();
        all_cuids.extend(cuids);
        validate_unique_cuids(&all_cuids)?;

        log::debug!("Adding {count} named partitions ({} total)", all_names.len());
        self.scheme = PartitionScheme::Named(all_names);
        self.cuids = all_cuids;
        self.reset_indexes();
        Ok(())
    }

    /// Removes the named partitions and returns their `(cuid, name)` pairs in
    /// request order. Fails without changing the descriptor if a name is
    /// unknown or no partition would remain.
    pub fn remove_named_partitions<S: AsRef<str>>(
        &mut self,
        names: &[S],
    ) -> PartitionResult<Vec<(Cuid, String)>> {
        let mut remaining = self.named_partitions()?.to_vec();
        let mut cuids = self.cuids.clone();
        let mut removed = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let Some(ix) = remaining.iter().position(|n| n == name) else {
                return Err(PartitionError::UnknownName(name.to_owned()));
            };
            removed.push((cuids.remove(ix), remaining.remove(ix)));
        }
        if remaining.is_empty() {
            return Err(PartitionError::ZeroPartitions);
        }

        log::debug!("Removed {} named partitions ({} left)", removed.len(), remaining.len());
        self.scheme = PartitionScheme::Named(remaining);
        self.cuids = cuids;
        self.reset_indexes();
        Ok(removed)
    }

    fn named_partitions(&self) -> PartitionResult<&[String]> {
        match &self.scheme {
            PartitionScheme::Named(names) => Ok(names.as_slice()),
            _ => Err(PartitionError::SchemeMismatch {
                expected: PartitionKeyKind::Named,
                actual: self.key_kind(),
            }),
        }
    }

    // positions shift on any structural change; never reuse a populated cache
    fn reset_indexes(&mut self) {
        self.cuid_index = Arc::new(IndexCache::new());
        self.name_index = Arc::new(IndexCache::new());
    }

    /// `(cuid, info)` for every partition in index order.
    pub fn partitions(&self) -> impl Iterator<Item = (Cuid, PartitionInfo)> + '_ {
        self.cuids
            .iter()
            .enumerate()
            .filter_map(|(i, c)| self.info_at(i).map(|info| (*c, info)))
    }
}

fn validate_cuids(scheme: &PartitionScheme, cuids: &[Cuid]) -> PartitionResult<()> {
    let expected = scheme.partition_count();
    if cuids.len() != expected {
        return Err(PartitionError::CuidCountMismatch {
            expected,
            actual: cuids.len(),
        });
    }
    validate_unique_cuids(cuids)
}

fn validate_unique_cuids(cuids: &[Cuid]) -> PartitionResult<()> {
    let mut seen = HashSet::with_capacity(cuids.len());
    for c in cuids {
        if !seen.insert(*c) {
            return Err(PartitionError::DuplicateCuid(*c));
        }
    }
    Ok(())
}

impl fmt::Display for PartitionedService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scheme {
            PartitionScheme::Singleton => write!(f, "singleton")?,
            PartitionScheme::UniformInt64Range(s) => write!(
                f,
                "int64 [{}, {}] x{}",
                s.low(),
                s.high(),
                s.partition_count()
            )?,
            PartitionScheme::Named(names) => write!(f, "named {names:?}")?,
        }
        f.write_str(" : [")?;
        for (i, c) in self.cuids.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{c}")?;
        }
        f.write_str("]")
    }
}
