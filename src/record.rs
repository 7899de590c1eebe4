// Copyright (c) 2026-present, merkle-partition-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Records and record fragments.
//!
//! A [`Record`] is a mapping from field name to opaque value. A tablet
//! fragment is just a [`Record`] restricted to the fields one family
//! claims, so both share the same Rust type.

use crate::slice::Slice;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A field name.
pub type FieldName = Arc<str>;

/// A record is a sorted mapping from field name to opaque value.
///
/// An empty record carries no fields; the engine treats an empty fragment
/// as "nothing to store for this family" and omits it (except `base`,
/// see [`crate::family`]).
pub type Record = BTreeMap<FieldName, Slice>;

/// Builds a field name from a `&str`, for test and call-site convenience.
#[must_use]
pub fn field(name: &str) -> FieldName {
    Arc::from(name)
}

/// Builds a one-field record, for test and call-site convenience.
#[must_use]
pub fn record(pairs: impl IntoIterator<Item = (&'static str, &'static str)>) -> Record {
    pairs
        .into_iter()
        .map(|(k, v)| (field(k), Slice::from(v)))
        .collect()
}
