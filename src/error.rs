// Copyright (c) 2026-present, merkle-partition-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{DecodeError, EncodeError};

/// Errors that can occur while building, updating, reading, or validating
/// partitions.
#[derive(Debug)]
pub enum Error {
    /// I/O error bubbled up from an [`crate::store::ObjectStore`] implementation.
    Io(std::io::Error),

    /// Serialization of a node or filter failed.
    Encode(EncodeError),

    /// Deserialization of a node or filter failed.
    Decode(DecodeError),

    /// `families` claims the same field in two different families.
    InvalidFamilies {
        /// The field claimed by more than one family.
        field: String,
    },

    /// A caller attempted to build a partition holding more records than
    /// `limit` allows. Indicates a chunking bug upstream of this crate;
    /// never retried.
    PartitionOverflow {
        /// Number of records the caller tried to pack into one partition.
        count: usize,
        /// The partition's configured limit.
        limit: usize,
    },

    /// A partition node failed to deserialize or violated its structural
    /// schema. Fatal for the current operation; nothing is written on
    /// corruption.
    CorruptNode {
        /// Human-readable detail about what was wrong.
        detail: String,
    },

    /// A tablet failed to deserialize or violated key ordering.
    CorruptTablet {
        /// Human-readable detail about what was wrong.
        detail: String,
    },

    /// The object store reported a transient failure. Not retried by this
    /// crate; the whole update is restartable because no partition becomes
    /// visible until an outer layer commits a new table root.
    StoreUnavailable {
        /// Human-readable detail from the store.
        detail: String,
    },

    /// Produced by the validator. Collected rather than propagated, so an
    /// audit can report every violation found in one pass.
    ValidationFailure {
        /// Name of the violated rule.
        rule: &'static str,
        /// Human-readable detail about the violation.
        detail: String,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PartitionEngineError: {self:?}")
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<EncodeError> for Error {
    fn from(value: EncodeError) -> Self {
        Self::Encode(value)
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
