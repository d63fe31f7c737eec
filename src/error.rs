//! Error types for the hash table and the partitioning functions.
//!
//! Not-found outcomes are never errors; lookups return `Option`.

use thiserror::Error;

/// Failures of allocation-bound `ChainedHashTable` operations.
///
/// Whenever one of these is returned the table is left exactly as it was
/// before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
    /// The bucket array could not be reserved, or a new node would exceed
    /// the configured entry budget.
    #[error("out of memory")]
    OutOfMemory,

    /// The table has no bucket array yet; call `initialize` first.
    #[error("hash table is not initialized")]
    Uninitialized,

    /// A bucket array of zero length was requested.
    #[error("bucket count must be greater than zero")]
    ZeroSize,
}

/// Invalid arguments rejected by the partitioning functions and the
/// partitioned service descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionError {
    #[error("low key {low} is greater than high key {high}")]
    InvalidRange { low: i64, high: i64 },

    #[error("partition count must be greater than zero")]
    ZeroPartitions,

    #[error("partition index {index} is out of range for {count} partitions")]
    IndexOutOfRange { index: u32, count: u32 },

    #[error("{count} partitions requested but range [{low}, {high}] has fewer keys")]
    TooManyPartitions { low: i64, high: i64, count: u32 },

    #[error("expected {expected} consistency unit ids, got {actual}")]
    CuidCountMismatch { expected: usize, actual: usize },

    #[error("duplicate partition name {0:?}")]
    DuplicateName(String),

    #[error("duplicate consistency unit id {0}")]
    DuplicateCuid(crate::partitioned_service::Cuid),

    #[error("partition names must not be empty")]
    EmptyName,

    #[error("no partition named {0:?}")]
    UnknownName(String),

    #[error("operation needs a {expected:?} partition scheme, service uses {actual:?}")]
    SchemeMismatch {
        expected: crate::partitioned_service::PartitionKeyKind,
        actual: crate::partitioned_service::PartitionKeyKind,
    },
}

pub type TableResult<T> = std::result::Result<T, TableError>;

pub type PartitionResult<T> = std::result::Result<T, PartitionError>;
