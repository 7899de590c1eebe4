// Copyright (c) 2026-present, merkle-partition-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! C2 — the tablet: an immutable, sorted key -> record-fragment map.
//!
//! The same type backs both a persisted per-family tablet and the
//! engine's in-memory virtual tablet (spec.md §9's tagged-variant design
//! note distinguishes "persisted vs. virtual" at the `PartitionRef`
//! boundary, not in the tablet's own shape).

use crate::key::Key;
use crate::record::Record;
use std::collections::BTreeSet;

/// An immutable, sorted `key -> record-fragment` map.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Tablet {
    entries: Vec<(Key, Record)>,
}

impl Tablet {
    /// The empty tablet.
    #[must_use]
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Builds a tablet from an arbitrary (possibly unsorted, possibly
    /// duplicate-keyed) iterable of `(key, fragment)` pairs. Sorts by key
    /// and deduplicates, last write wins.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = (Key, Record)>) -> Self {
        let mut entries: Vec<(Key, Record)> = records.into_iter().collect();
        // Stable sort: for equal keys, later writers in the input order
        // stay later in the sorted run, so the final dedup pass keeps
        // the right one.
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out: Vec<(Key, Record)> = Vec::with_capacity(entries.len());
        for (key, fragment) in entries {
            if let Some(last) = out.last_mut() {
                if last.0 == key {
                    *last = (key, fragment);
                    continue;
                }
            }
            out.push((key, fragment));
        }

        Self { entries: out }
    }

    /// Accepts records that the caller guarantees are already sorted and
    /// de-duplicated by key, skipping the sort/dedup pass.
    ///
    /// Debug builds still assert the invariant so a caller's bug surfaces
    /// immediately rather than corrupting a persisted tablet.
    #[must_use]
    pub fn from_sorted_records(entries: Vec<(Key, Record)>) -> Self {
        debug_assert!(
            entries.windows(2).all(|w| w[0].0 < w[1].0),
            "from_sorted_records called with unsorted or duplicate keys"
        );
        Self { entries }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if this tablet holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The smallest key present, if any.
    #[must_use]
    pub fn first_key(&self) -> Option<&Key> {
        self.entries.first().map(|(k, _)| k)
    }

    /// The largest key present, if any.
    #[must_use]
    pub fn last_key(&self) -> Option<&Key> {
        self.entries.last().map(|(k, _)| k)
    }

    fn position(&self, key: &Key) -> Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.cmp(key))
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &Key) -> bool {
        self.position(key).is_ok()
    }

    /// Reads every record, in ascending key order.
    pub fn read_all(&self) -> impl Iterator<Item = (Key, Record)> + '_ {
        self.entries.iter().cloned()
    }

    /// Reads every record whose key falls within `[lo, hi]` (both
    /// inclusive; `None` means open on that side), in ascending order.
    pub fn read_range<'a>(
        &'a self,
        lo: Option<&'a Key>,
        hi: Option<&'a Key>,
    ) -> impl Iterator<Item = (Key, Record)> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| lo.is_none_or(|lo| k >= lo) && hi.is_none_or(|hi| k <= hi))
            .cloned()
    }

    /// Reads the records for exactly the given keys, in the tablet's
    /// ascending key order (not the order `keys` was given in).
    pub fn read_batch<'a>(&'a self, keys: &'a BTreeSet<Key>) -> impl Iterator<Item = (Key, Record)> + 'a {
        self.entries.iter().filter(move |(k, _)| keys.contains(k)).cloned()
    }

    /// Returns a tablet equal to applying `deleted` then unioning
    /// `additions` (additions win on key collision).
    #[must_use]
    pub fn update(
        &self,
        additions: impl IntoIterator<Item = (Key, Record)>,
        deleted: impl IntoIterator<Item = Key>,
    ) -> Self {
        let deleted: BTreeSet<Key> = deleted.into_iter().collect();

        let survivors = self
            .entries
            .iter()
            .filter(|(k, _)| !deleted.contains(k))
            .cloned();

        Self::join(&Self::from_sorted_records(survivors.collect()), &Self::from_records(additions))
    }

    /// Unions `a` and `b`; on key collision, `b`'s fragment wins.
    #[must_use]
    pub fn join(a: &Self, b: &Self) -> Self {
        let mut merged: Vec<(Key, Record)> = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);

        while i < a.entries.len() && j < b.entries.len() {
            let (ak, _) = &a.entries[i];
            let (bk, _) = &b.entries[j];
            match ak.cmp(bk) {
                std::cmp::Ordering::Less => {
                    merged.push(a.entries[i].clone());
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(b.entries[j].clone());
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    merged.push(b.entries[j].clone());
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&a.entries[i..]);
        merged.extend_from_slice(&b.entries[j..]);

        Self::from_sorted_records(merged)
    }

    /// Removes fragments that would serialize as an empty record map.
    ///
    /// Applied to every non-`base` family tablet before persistence, so
    /// the `base` tablet remains the sole authority on key existence.
    #[must_use]
    pub fn prune(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(_, fragment)| !fragment.is_empty())
                .cloned()
                .collect(),
        }
    }
}
