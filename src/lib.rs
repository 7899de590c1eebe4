// Copyright (c) 2026-present, merkle-partition-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The partition engine for a content-addressed, immutable key/record
//! store: a key-ordered collection of disjoint, contiguous partitions,
//! each holding at most [`partition::Params::limit`] records and split
//! by column family into separately addressable tablets.
//!
//! A partition is never mutated in place — updating one always produces
//! a new value with a new content address. [`engine::update_partitions`]
//! is the core entry point: it consumes an ordered sequence of existing
//! partitions (or links to them) together with patches of pending
//! changes, and produces a fresh, size-balanced partition sequence,
//! merging, splitting, or borrowing across partition boundaries as
//! needed to keep every partition between half-full and full.
//!
//! ```
//! use merkle_partition_engine::key::Key;
//! use merkle_partition_engine::partition::Params;
//! use merkle_partition_engine::patch::PatchValue;
//! use merkle_partition_engine::record::record;
//! use merkle_partition_engine::store::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let params = Params::new(100);
//!
//! let records = vec![
//!     (Key::from("alice"), PatchValue::Put(record([("name", "Alice")]))),
//!     (Key::from("bob"), PatchValue::Put(record([("name", "Bob")]))),
//! ];
//!
//! let handle = merkle_partition_engine::partition::from_records(&store, &params, records)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(handle.node.count, 2);
//! ```

pub mod bloom;
pub mod coding;
pub mod engine;
pub mod error;
pub mod family;
pub mod key;
pub mod partition;
pub mod patch;
pub mod record;
pub mod slice;
pub mod store;
pub mod tablet;
pub mod validator;

pub use error::{Error, Result};
