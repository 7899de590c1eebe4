// Copyright (c) 2026-present, merkle-partition-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! C7 — the partition update engine, the core of this crate.
//!
//! Consumes `(partition_ref, changes)` tuples in key-ascending order,
//! streaming serialized partitions into an output list while keeping at
//! most one "pending" virtual tablet of records not yet emitted.

use crate::key::Key;
use crate::partition::read::read_all_families;
use crate::partition::{from_records, partition_records, PartitionHandle, PartitionNode, PartitionRef, Params};
use crate::patch::{apply_patch, Patch, PatchValue};
use crate::record::Record;
use crate::store::{Link, ObjectStore};
use crate::tablet::Tablet;
use crate::error::Result;

/// The result of [`update_partitions`].
#[derive(Clone, Debug)]
pub enum UpdateOutcome {
    /// The updated, valid partition list (possibly empty if every record
    /// was deleted).
    Partitions(Vec<PartitionHandle>),

    /// Fewer than `half_full` records survived and there was no prior
    /// result partition to absorb them into. The caller must carry this
    /// tablet to a sibling subtree and borrow there.
    Pending(Tablet),
}

/// Runs the core partition update algorithm.
///
/// `carry` is an optional value handed down from a sibling subtree — a
/// partition node or a virtual tablet per spec.md §9's tagged-variant
/// design note; either is normalized to a virtual tablet up front.
/// `inputs` is the ordered `(partition_ref, changes)` sequence to merge.
///
/// # Errors
///
/// Propagates any [`crate::error::Error`] raised by the store or by
/// partition construction (including [`crate::error::Error::PartitionOverflow`],
/// which should never actually surface here since every chunk this
/// engine builds is pre-sized by [`crate::partition::partition_limited`]).
pub fn update_partitions(
    store: &dyn ObjectStore,
    params: &Params,
    carry: Option<PartitionRef>,
    inputs: Vec<(PartitionRef, Patch)>,
) -> Result<UpdateOutcome> {
    let mut result: Vec<PartitionHandle> = Vec::new();
    let mut pending: Option<Tablet> = match carry {
        None => None,
        Some(PartitionRef::Virtual(tablet)) => Some(tablet),
        Some(other) => Some(other.read_all(store)?),
    };

    for (part_ref, changes) in inputs {
        if pending.is_none() && changes.is_empty() {
            pass_through(store, params, &mut result, &mut pending, part_ref)?;
            continue;
        }

        let loaded = part_ref.read_all(store)?;
        let patched = apply_patch(&loaded, &changes).unwrap_or_else(|| loaded.clone());
        let carried = pending.take().unwrap_or_else(Tablet::empty);
        let joined = Tablet::join(&carried, &patched);

        if joined.is_empty() {
            log::trace!("all records deleted from partition, dropping");
            pending = None;
            continue;
        }

        if joined == loaded {
            // The merge was a no-op: re-run the pass-through branch so an
            // unchanged linked partition is re-emitted without rewriting.
            pass_through(store, params, &mut result, &mut pending, part_ref)?;
            continue;
        }

        if joined.len() >= params.emit_threshold() {
            let (emitted, remainder) = emit_parts(store, params, &joined)?;
            log::debug!("split overflowing merge into {} partitions", emitted.len());
            result.extend(emitted);
            pending = Some(remainder);
        } else {
            pending = Some(joined);
        }
    }

    finish_update(store, params, result, pending)
}

fn pass_through(
    store: &dyn ObjectStore,
    params: &Params,
    result: &mut Vec<PartitionHandle>,
    pending: &mut Option<Tablet>,
    part_ref: PartitionRef,
) -> Result<()> {
    match part_ref {
        PartitionRef::Link(link) => {
            let node = store.get_data(&link)?.into_partition()?;
            let (emitted, new_pending) = check_partition(store, params, link, &node)?;
            result.extend(emitted);
            *pending = new_pending;
        }
        PartitionRef::Node(link, node) => {
            let (emitted, new_pending) = check_partition(store, params, link, &node)?;
            result.extend(emitted);
            *pending = new_pending;
        }
        PartitionRef::Virtual(tablet) => {
            *pending = Some(tablet);
        }
    }
    Ok(())
}

/// Decides what to do with an unchanged linked or resident partition.
///
/// Returns the partitions to emit immediately and the new `pending`
/// value (`None` unless the partition underflowed).
fn check_partition(
    store: &dyn ObjectStore,
    params: &Params,
    link: Link,
    node: &PartitionNode,
) -> Result<(Vec<PartitionHandle>, Option<Tablet>)> {
    if node.count < params.half_full() {
        log::trace!("partition {link} underflowed ({} < {}), absorbing", node.count, params.half_full());
        let tablet = read_all_families(store, node)?;
        Ok((Vec::new(), Some(tablet)))
    } else if node.count > params.limit {
        log::debug!("partition {link} overflowed ({} > {}), splitting", node.count, params.limit);
        let records: Vec<(Key, Record)> = read_all_families(store, node)?.read_all().collect();
        let handles = partition_records(store, params, records)?;
        Ok((handles, None))
    } else {
        Ok((vec![PartitionHandle { link, node: node.clone() }], None))
    }
}

/// Iteratively takes the first `limit` records, builds a partition from
/// them, and repeats until fewer than `emit_threshold` records remain.
/// The remainder becomes the new `pending` virtual tablet.
fn emit_parts(store: &dyn ObjectStore, params: &Params, tablet: &Tablet) -> Result<(Vec<PartitionHandle>, Tablet)> {
    let emit_threshold = params.emit_threshold();
    let emit_size = params.limit;

    let mut remaining: Vec<(Key, Record)> = tablet.read_all().collect();
    let mut emitted = Vec::new();

    while remaining.len() >= emit_threshold {
        let chunk: Vec<(Key, Record)> = remaining.drain(0..emit_size).collect();
        let puts = chunk.into_iter().map(|(k, r)| (k, PatchValue::Put(r)));
        if let Some(handle) = from_records(store, params, puts)? {
            emitted.push(handle);
        }
    }

    Ok((emitted, Tablet::from_sorted_records(remaining)))
}

fn finish_update(
    store: &dyn ObjectStore,
    params: &Params,
    mut result: Vec<PartitionHandle>,
    pending: Option<Tablet>,
) -> Result<UpdateOutcome> {
    let Some(pending) = pending else {
        return Ok(UpdateOutcome::Partitions(result));
    };

    if pending.len() < params.half_full() {
        if let Some(last) = result.pop() {
            log::debug!("borrowing {} underflowing records into previous partition", pending.len());
            let mut records: Vec<(Key, Record)> = read_all_families(store, &last.node)?.read_all().collect();
            records.extend(pending.read_all());
            let handles = partition_records(store, params, records)?;
            result.extend(handles);
            Ok(UpdateOutcome::Partitions(result))
        } else {
            log::trace!("no prior partition to borrow into, yielding pending tablet upward");
            Ok(UpdateOutcome::Pending(pending))
        }
    } else {
        let handles = partition_records(store, params, pending.read_all())?;
        result.extend(handles);
        Ok(UpdateOutcome::Partitions(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record;
    use crate::store::MemoryStore;

    fn build(store: &MemoryStore, params: &Params, records: Vec<(&str, &str)>) -> PartitionHandle {
        let puts = records
            .into_iter()
            .map(|(k, v)| (Key::from(k), PatchValue::Put(record([("a", v)]))));
        from_records(store, params, puts).unwrap().unwrap()
    }

    fn patch(changes: Vec<(&str, Option<&str>)>) -> Patch {
        changes
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    Some(v) => PatchValue::Put(record([("a", v)])),
                    None => PatchValue::Tombstone,
                };
                (Key::from(k), value)
            })
            .collect()
    }

    #[test]
    fn identity_no_changes_is_pass_through() {
        let store = MemoryStore::new();
        let params = Params::new(10);
        let handle = build(&store, &params, vec![("k1", "1"), ("k2", "2"), ("k3", "3")]);
        let stored_count_before = store.len();

        let outcome = update_partitions(
            &store,
            &params,
            None,
            vec![(PartitionRef::Link(handle.link), Patch::empty())],
        )
        .unwrap();

        match outcome {
            UpdateOutcome::Partitions(parts) => {
                assert_eq!(parts.len(), 1);
                assert_eq!(parts[0].link, handle.link);
            }
            UpdateOutcome::Pending(_) => panic!("expected partitions"),
        }
        assert_eq!(store.len(), stored_count_before, "pass-through must not write");
    }

    #[test]
    fn split_from_virtual_carry() {
        let store = MemoryStore::new();
        let params = Params::new(4);

        let records: Vec<(Key, PatchValue)> = (1..=12)
            .map(|i| (Key::from(format!("k{i:02}")), PatchValue::Put(record([("a", "v")]))))
            .collect();
        let resolved: Vec<(Key, Record)> = records
            .into_iter()
            .map(|(k, v)| match v {
                PatchValue::Put(r) => (k, r),
                PatchValue::Tombstone => unreachable!(),
            })
            .collect();
        let carry_tablet = Tablet::from_sorted_records(resolved);

        let outcome = update_partitions(&store, &params, Some(PartitionRef::Virtual(carry_tablet)), vec![]).unwrap();

        let UpdateOutcome::Partitions(parts) = outcome else {
            panic!("expected partitions");
        };
        assert_eq!(parts.len(), 3);
        for p in &parts {
            assert_eq!(p.node.count, 4);
        }
        assert_eq!(parts[0].node.first_key, Key::from("k01"));
        assert_eq!(parts[0].node.last_key, Key::from("k04"));
        assert_eq!(parts[2].node.first_key, Key::from("k09"));
        assert_eq!(parts[2].node.last_key, Key::from("k12"));
    }

    #[test]
    fn merge_after_delete() {
        let store = MemoryStore::new();
        let params = Params::new(8);

        let a = build(&store, &params, vec![("k1", "1"), ("k2", "2"), ("k3", "3"), ("k4", "4"), ("k5", "5")]);
        let b = build(&store, &params, vec![("k6", "6"), ("k7", "7"), ("k8", "8"), ("k9", "9"), ("k10", "10")]);

        let changes_a = patch(vec![("k3", None), ("k4", None), ("k5", None)]);

        let outcome = update_partitions(
            &store,
            &params,
            None,
            vec![
                (PartitionRef::Link(a.link), changes_a),
                (PartitionRef::Link(b.link), Patch::empty()),
            ],
        )
        .unwrap();

        let UpdateOutcome::Partitions(parts) = outcome else {
            panic!("expected partitions");
        };
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].node.count, 7);
        assert_eq!(parts[0].node.first_key, Key::from("k1"));
        assert_eq!(parts[0].node.last_key, Key::from("k9"));
    }

    #[test]
    fn overflow_then_emit() {
        let store = MemoryStore::new();
        let params = Params::new(6);
        assert_eq!(params.half_full(), 3);
        assert_eq!(params.emit_threshold(), 9);

        let p = build(&store, &params, vec![("k1", "1"), ("k2", "2"), ("k3", "3"), ("k4", "4"), ("k5", "5")]);
        let adds = patch(vec![
            ("k6", Some("6")),
            ("k7", Some("7")),
            ("k8", Some("8")),
            ("k9", Some("9")),
            ("k10", Some("10")),
            ("k11", Some("11")),
            ("k12", Some("12")),
        ]);

        let outcome = update_partitions(&store, &params, None, vec![(PartitionRef::Link(p.link), adds)]).unwrap();

        let UpdateOutcome::Partitions(parts) = outcome else {
            panic!("expected partitions");
        };
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].node.count, 6);
        assert_eq!(parts[1].node.count, 6);
    }

    #[test]
    fn underflow_with_no_sibling_yields_pending() {
        let store = MemoryStore::new();
        let params = Params::new(10);
        assert_eq!(params.half_full(), 5);

        let p = build(&store, &params, vec![("k1", "1"), ("k2", "2")]);

        let outcome = update_partitions(&store, &params, None, vec![(PartitionRef::Link(p.link), Patch::empty())]).unwrap();

        match outcome {
            UpdateOutcome::Pending(tablet) => assert_eq!(tablet.len(), 2),
            UpdateOutcome::Partitions(_) => panic!("expected a pending carry"),
        }
    }
}
