// Copyright (c) 2026-present, merkle-partition-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! C6 + C2 — the read path: field projection across column-family
//! tablets, merged by a k-way streaming merge on key.
//!
//! Grounded on the teacher's `merge::Merger`, which merges multiple
//! sorted iterators with an `interval_heap::IntervalHeap` keyed on the
//! current head of each iterator.

use super::PartitionNode;
use crate::error::Result;
use crate::family::{FamilyName, BASE};
use crate::key::Key;
use crate::record::{FieldName, Record};
use crate::store::ObjectStore;
use crate::tablet::Tablet;
use interval_heap::IntervalHeap;
use std::collections::BTreeSet;

/// Which family tablets a read needs to consult for the requested
/// `fields` (empty means "every field").
#[must_use]
pub fn choose_tablets(node: &PartitionNode, fields: &BTreeSet<FieldName>) -> BTreeSet<FamilyName> {
    if fields.is_empty() {
        return node.tablets.keys().cloned().collect();
    }

    let mut chosen = BTreeSet::new();

    for (family, family_fields) in node.families.iter() {
        if family_fields.iter().any(|f| fields.contains(f)) && node.tablets.contains_key(family) {
            chosen.insert(family.clone());
        }
    }

    let base = FamilyName::from(BASE);
    if !node.families.covers_all(fields) && node.tablets.contains_key(&base) {
        chosen.insert(base);
    }

    chosen
}

struct HeapItem(usize, Key, Record);

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.1 == other.1
    }
}
impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.1.cmp(&other.1)
    }
}

/// Merges already-sorted per-family sequences into one ordered sequence,
/// combining fragments at the same key into one record (a later
/// sequence's fields override an earlier one's on field-name collision,
/// though families partition fields so collisions are impossible in
/// practice).
fn merge_sequences(sequences: Vec<Vec<(Key, Record)>>) -> Vec<(Key, Record)> {
    let mut iters: Vec<std::vec::IntoIter<(Key, Record)>> =
        sequences.into_iter().map(std::iter::IntoIterator::into_iter).collect();
    let mut heap: IntervalHeap<HeapItem> = IntervalHeap::with_capacity(iters.len());

    for (idx, iter) in iters.iter_mut().enumerate() {
        if let Some((k, r)) = iter.next() {
            heap.push(HeapItem(idx, k, r));
        }
    }

    let mut out: Vec<(Key, Record)> = Vec::new();

    while let Some(HeapItem(idx, key, fragment)) = heap.pop_min() {
        match out.last_mut() {
            Some((last_key, last_record)) if *last_key == key => {
                last_record.extend(fragment);
            }
            _ => out.push((key.clone(), fragment)),
        }

        if let Some((next_key, next_record)) = iters[idx].next() {
            heap.push(HeapItem(idx, next_key, next_record));
        }
    }

    out
}

/// Loads and merges every family of `node`, keeping every field —
/// used when the engine folds a stored partition into a virtual tablet
/// for merging with a patch.
pub fn read_all_families(store: &dyn ObjectStore, node: &PartitionNode) -> Result<Tablet> {
    let mut sequences = Vec::with_capacity(node.tablets.len());
    for link in node.tablets.values() {
        let tablet = store.get_data(link)?.into_tablet()?;
        sequences.push(tablet.read_all().collect());
    }
    Ok(Tablet::from_sorted_records(merge_sequences(sequences)))
}

fn project(record: Record, fields: &BTreeSet<FieldName>) -> Option<Record> {
    if fields.is_empty() {
        return Some(record);
    }
    let projected: Record = record
        .into_iter()
        .filter(|(field, _)| fields.contains(field))
        .collect();
    if projected.is_empty() {
        None
    } else {
        Some(projected)
    }
}

enum ReadSpan<'a> {
    All,
    Range(Option<&'a Key>, Option<&'a Key>),
    Batch(&'a BTreeSet<Key>),
}

fn read_span(
    store: &dyn ObjectStore,
    node: &PartitionNode,
    family: &FamilyName,
    span: &ReadSpan<'_>,
) -> Result<Vec<(Key, Record)>> {
    let link = node.tablets.get(family).expect("family chosen from node.tablets");
    let tablet = store.get_data(link)?.into_tablet()?;

    Ok(match span {
        ReadSpan::All => tablet.read_all().collect(),
        ReadSpan::Range(lo, hi) => tablet.read_range(*lo, *hi).collect(),
        ReadSpan::Batch(keys) => tablet.read_batch(keys).collect(),
    })
}

fn read_with(
    store: &dyn ObjectStore,
    node: &PartitionNode,
    fields: &BTreeSet<FieldName>,
    span: ReadSpan<'_>,
) -> Result<Vec<(Key, Record)>> {
    let chosen = choose_tablets(node, fields);

    let mut sequences = Vec::with_capacity(chosen.len());
    for family in &chosen {
        sequences.push(read_span(store, node, family, &span)?);
    }

    let merged = merge_sequences(sequences);

    Ok(merged
        .into_iter()
        .filter_map(|(k, r)| project(r, fields).map(|r| (k, r)))
        .collect())
}

/// `read_all(store, part, fields)` — every record, projected to
/// `fields` (empty means every field).
pub fn read_all(
    store: &dyn ObjectStore,
    node: &PartitionNode,
    fields: &BTreeSet<FieldName>,
) -> Result<Vec<(Key, Record)>> {
    read_with(store, node, fields, ReadSpan::All)
}

/// `read_range(store, part, fields, lo, hi)` — records whose key falls
/// in `[lo, hi]` (inclusive; `None` is open), projected to `fields`.
pub fn read_range(
    store: &dyn ObjectStore,
    node: &PartitionNode,
    fields: &BTreeSet<FieldName>,
    lo: Option<&Key>,
    hi: Option<&Key>,
) -> Result<Vec<(Key, Record)>> {
    read_with(store, node, fields, ReadSpan::Range(lo, hi))
}

/// `read_batch(store, part, fields, keys)` — records for exactly the
/// given keys, projected to `fields`.
pub fn read_batch(
    store: &dyn ObjectStore,
    node: &PartitionNode,
    fields: &BTreeSet<FieldName>,
    keys: &BTreeSet<Key>,
) -> Result<Vec<(Key, Record)>> {
    read_with(store, node, fields, ReadSpan::Batch(keys))
}
