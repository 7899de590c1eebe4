// Copyright (c) 2026-present, merkle-partition-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! C6 — the partition node: an immutable container of metadata plus
//! links to per-family tablets, and its construction routine.

mod params;
pub mod read;
mod wire;

pub use params::Params;

use crate::bloom::{self, MembershipFilter};
use crate::error::{Error, Result};
use crate::family::{split_data, FamilyName, Families, BASE};
use crate::key::Key;
use crate::patch::PatchValue;
use crate::record::Record;
use crate::store::{Link, NodeData, ObjectStore};
use crate::tablet::Tablet;
use std::collections::BTreeMap;

/// An immutable partition node: metadata plus links to per-family
/// tablets.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PartitionNode {
    /// Maximum records this partition may hold. Stored on the node
    /// itself (spec.md §9's open question resolved in favor of this),
    /// so a node can be re-validated without external params.
    pub limit: usize,

    /// Family name -> link to that family's serialized tablet. `base`
    /// is always present.
    pub tablets: BTreeMap<FamilyName, Link>,

    /// Membership filter over every contained key.
    pub membership: MembershipFilter,

    /// Number of records contained.
    pub count: usize,

    /// The family -> fields mapping used when this partition was built.
    pub families: Families,

    /// The smallest key present.
    pub first_key: Key,

    /// The largest key present.
    pub last_key: Key,
}

impl PartitionNode {
    /// The links this node references, in family-name order — what a
    /// caller passes as `store_node`'s `links` argument.
    #[must_use]
    pub fn outgoing_links(&self) -> Vec<Link> {
        self.tablets.values().copied().collect()
    }

    /// Returns `true` if `key` falls within `[first_key, last_key]`.
    #[must_use]
    pub fn covers_key(&self, key: &Key) -> bool {
        *key >= self.first_key && *key <= self.last_key
    }
}

/// A freshly built or freshly loaded partition paired with its link —
/// what `from_records`, `emit_parts`, and the update engine actually
/// hand back, since a bare node without its link can't be referenced by
/// a parent index.
#[derive(Clone, Debug)]
pub struct PartitionHandle {
    /// Content address of [`Self::node`].
    pub link: Link,
    /// The partition node itself.
    pub node: PartitionNode,
}

/// A tagged reference to "a partition, not yet committed to any
/// particular representation" — spec.md §9's design note.
///
/// The update engine's input and its `pending` carry state both use
/// this: an input may be a previously stored link or an upstream
/// sibling's virtual tablet; `pending` is always a virtual tablet.
#[derive(Clone, Debug)]
pub enum PartitionRef {
    /// A link to a previously stored, unread partition.
    Link(Link),
    /// An already-resident partition node (its link is still known).
    Node(Link, PartitionNode),
    /// An in-memory, unpersisted tablet of full records, not yet split
    /// into families or validated against `limit`.
    Virtual(Tablet),
}

impl PartitionRef {
    /// Reads every record out of this reference, across all families,
    /// regardless of whether it is a link, a resident node, or virtual.
    pub fn read_all(&self, store: &dyn ObjectStore) -> Result<Tablet> {
        match self {
            Self::Virtual(tablet) => Ok(tablet.clone()),
            Self::Link(link) => {
                let node = store.get_data(link)?.into_partition()?;
                read::read_all_families(store, &node)
            }
            Self::Node(_, node) => read::read_all_families(store, node),
        }
    }
}

/// Builds and persists a single partition from `records`.
///
/// `records` may contain tombstones (spec.md §4.6 step 1); they are
/// stripped after deduplication so that a put immediately followed by a
/// delete of the same key (in iteration order) correctly produces no
/// record, rather than the reverse.
///
/// Returns `Ok(None)` if, after deduplication and tombstone removal, no
/// records survive.
///
/// # Errors
///
/// Returns [`Error::PartitionOverflow`] if more than `params.limit`
/// records survive.
pub fn from_records(
    store: &dyn ObjectStore,
    params: &Params,
    records: impl IntoIterator<Item = (Key, PatchValue)>,
) -> Result<Option<PartitionHandle>> {
    let final_records = resolve_patch_values(records);

    if final_records.len() > params.limit {
        return Err(Error::PartitionOverflow {
            count: final_records.len(),
            limit: params.limit,
        });
    }

    if final_records.is_empty() {
        return Ok(None);
    }

    let first_key = final_records.first().expect("checked non-empty").0.clone();
    let last_key = final_records.last().expect("checked non-empty").0.clone();
    let count = final_records.len();

    let membership = bloom::build(final_records.iter().map(|(k, _)| k.as_bytes()), params.bloom_fpr);

    let mut tablets = BTreeMap::new();
    for (family, fragments) in split_data(&params.families, final_records) {
        let mut tablet = Tablet::from_sorted_records(fragments);
        if family.as_ref() != BASE {
            tablet = tablet.prune();
        }
        if family.as_ref() == BASE || !tablet.is_empty() {
            let link = store.store_node(Vec::new(), NodeData::Tablet(tablet))?;
            tablets.insert(family, link);
        }
    }

    let node = PartitionNode {
        limit: params.limit,
        tablets,
        membership,
        count,
        families: params.families.clone(),
        first_key,
        last_key,
    };

    log::trace!("built partition: count={count}, limit={}", params.limit);

    let link = store.store_node(node.outgoing_links(), NodeData::Partition(node.clone()))?;
    Ok(Some(PartitionHandle { link, node }))
}

fn resolve_patch_values(records: impl IntoIterator<Item = (Key, PatchValue)>) -> Vec<(Key, Record)> {
    let mut entries: Vec<(Key, PatchValue)> = records.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut deduped: Vec<(Key, PatchValue)> = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        if let Some(last) = deduped.last_mut() {
            if last.0 == key {
                *last = (key, value);
                continue;
            }
        }
        deduped.push((key, value));
    }

    deduped
        .into_iter()
        .filter_map(|(key, value)| match value {
            PatchValue::Put(record) => Some((key, record)),
            PatchValue::Tombstone => None,
        })
        .collect()
}

/// Returns the fewest approximately-equal groups of `items` such that no
/// group exceeds `limit`. With `n = ceil(count / limit)`, group
/// boundaries fall at `floor(i * count / n)` for `i` in `0..=n`, so group
/// sizes differ by at most one and order is preserved.
#[must_use]
pub fn partition_limited<T>(limit: usize, items: Vec<T>) -> Vec<Vec<T>> {
    let count = items.len();
    if count == 0 {
        return Vec::new();
    }

    let n = count.div_ceil(limit).max(1);
    let mut groups = Vec::with_capacity(n);
    let mut iter = items.into_iter();
    let mut prev_boundary = 0;

    for i in 1..=n {
        let boundary = i * count / n;
        let take_count = boundary - prev_boundary;
        groups.push((&mut iter).take(take_count).collect());
        prev_boundary = boundary;
    }

    groups
}

/// Splits `records` into `partition_limited` chunks and builds a
/// partition from each, in order.
///
/// # Errors
///
/// Propagates any [`Error`] from the underlying store or from
/// [`from_records`].
pub fn partition_records(
    store: &dyn ObjectStore,
    params: &Params,
    records: impl IntoIterator<Item = (Key, Record)>,
) -> Result<Vec<PartitionHandle>> {
    let records: Vec<(Key, Record)> = records.into_iter().collect();
    let groups = partition_limited(params.limit, records);

    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        let puts = group.into_iter().map(|(k, r)| (k, PatchValue::Put(r)));
        if let Some(handle) = from_records(store, params, puts)? {
            out.push(handle);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record;
    use crate::store::MemoryStore;

    fn put(key: &'static str, value: &'static str) -> (Key, PatchValue) {
        (Key::from(key), PatchValue::Put(record([("x", value)])))
    }

    #[test]
    fn from_records_empty_returns_none() {
        let store = MemoryStore::new();
        let params = Params::new(10);
        let handle = from_records(&store, &params, std::iter::empty()).unwrap();
        assert!(handle.is_none());
    }

    #[test]
    fn from_records_overflow_errors() {
        let store = MemoryStore::new();
        let params = Params::new(2);
        let records = vec![put("a", "1"), put("b", "2"), put("c", "3")];
        let err = from_records(&store, &params, records).unwrap_err();
        assert!(matches!(err, Error::PartitionOverflow { count: 3, limit: 2 }));
    }

    #[test]
    fn from_records_builds_metadata() {
        let store = MemoryStore::new();
        let params = Params::new(10);
        let records = vec![put("k1", "1"), put("k3", "3"), put("k2", "2")];
        let handle = from_records(&store, &params, records).unwrap().unwrap();

        assert_eq!(handle.node.count, 3);
        assert_eq!(handle.node.first_key, Key::from("k1"));
        assert_eq!(handle.node.last_key, Key::from("k3"));
        assert!(handle.node.tablets.contains_key(&FamilyName::from(BASE)));
        for key in ["k1", "k2", "k3"] {
            assert!(handle.node.membership.contains(key.as_bytes()));
        }
    }

    #[test]
    fn partition_limited_group_sizes() {
        let items: Vec<u32> = (0..12).collect();
        let groups = partition_limited(4, items);
        assert_eq!(groups.len(), 3);
        for g in &groups {
            assert_eq!(g.len(), 4);
        }
        assert_eq!(groups[0], vec![0, 1, 2, 3]);
        assert_eq!(groups[2], vec![8, 9, 10, 11]);
    }

    #[test]
    fn partition_limited_uneven_spread_is_at_most_one() {
        let items: Vec<u32> = (0..10).collect();
        let groups = partition_limited(4, items);
        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        assert_eq!(sizes.iter().sum::<usize>(), 10);
        assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);
    }

    #[test]
    fn partition_records_splits_into_size_balanced_partitions() {
        let store = MemoryStore::new();
        let params = Params::new(4);
        let records: Vec<(Key, Record)> = (1..=12)
            .map(|i| (Key::from(format!("k{i:02}")), record([("x", "v")])))
            .collect();

        let handles = partition_records(&store, &params, records).unwrap();
        assert_eq!(handles.len(), 3);
        for h in &handles {
            assert_eq!(h.node.count, 4);
        }
        assert_eq!(handles[0].node.first_key, Key::from("k01"));
        assert_eq!(handles[0].node.last_key, Key::from("k04"));
        assert_eq!(handles[2].node.first_key, Key::from("k09"));
        assert_eq!(handles[2].node.last_key, Key::from("k12"));
    }
}
