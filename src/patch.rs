// Copyright (c) 2026-present, merkle-partition-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! C5 — patch application: merging a key-ordered list of changes into a
//! tablet.

use crate::key::Key;
use crate::record::Record;
use crate::tablet::Tablet;

/// One pending write: either a new value for a key, or a tombstone
/// marking its deletion.
#[derive(Clone, Debug)]
pub enum PatchValue {
    /// Sets the record at this key.
    Put(Record),
    /// Deletes the record at this key.
    Tombstone,
}

impl PatchValue {
    /// Returns `true` if this change is a deletion.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Self::Tombstone)
    }
}

/// A key-ordered sequence of pending changes awaiting merge into a
/// tablet.
#[derive(Clone, Debug, Default)]
pub struct Patch(pub Vec<(Key, PatchValue)>);

impl Patch {
    /// The empty patch.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Returns `true` if this patch has no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Key, PatchValue)> for Patch {
    fn from_iter<T: IntoIterator<Item = (Key, PatchValue)>>(iter: T) -> Self {
        let mut changes: Vec<_> = iter.into_iter().collect();
        changes.sort_by(|a, b| a.0.cmp(&b.0));
        Self(changes)
    }
}

/// Applies `changes` to `tablet`, returning the updated tablet.
///
/// Returns `None` for an empty patch, signaling the caller to treat the
/// tablet as unchanged (and therefore re-emit it without reserializing).
#[must_use]
pub fn apply_patch(tablet: &Tablet, changes: &Patch) -> Option<Tablet> {
    if changes.is_empty() {
        return None;
    }

    let mut additions = Vec::new();
    let mut tombstoned = Vec::new();

    for (key, value) in &changes.0 {
        match value {
            PatchValue::Put(record) => additions.push((key.clone(), record.clone())),
            PatchValue::Tombstone => tombstoned.push(key.clone()),
        }
    }

    Some(tablet.update(additions, tombstoned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record;

    #[test]
    fn empty_patch_is_noop() {
        let t = Tablet::from_records(vec![(Key::from("a"), record([("x", "1")]))]);
        assert!(apply_patch(&t, &Patch::empty()).is_none());
    }

    #[test]
    fn separates_tombstones_from_additions() {
        let t = Tablet::from_records(vec![
            (Key::from("a"), record([("x", "1")])),
            (Key::from("b"), record([("x", "1")])),
        ]);
        let changes = Patch::from_iter(vec![
            (Key::from("a"), PatchValue::Tombstone),
            (Key::from("c"), PatchValue::Put(record([("x", "3")]))),
        ]);
        let updated = apply_patch(&t, &changes).unwrap();
        let keys: Vec<_> = updated.read_all().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![Key::from("b"), Key::from("c")]);
    }
}
