// Copyright (c) 2026-present, merkle-partition-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! C4 — record/family layout: splitting a record map into per-family
//! fragments given a family -> fields mapping.

use crate::error::{Error, Result};
use crate::key::Key;
use crate::record::{FieldName, Record};
use std::collections::{BTreeMap, BTreeSet};

/// Name of a field family.
pub type FamilyName = std::sync::Arc<str>;

/// The reserved family that holds any field not claimed by a named family.
pub const BASE: &str = "base";

/// A `family -> fields` mapping.
///
/// `base` is implicit: any field not claimed by a named family lands in
/// it. Constructing a [`Families`] from a mapping that claims the same
/// field in two families is rejected, since the split would silently
/// duplicate or lose data for that field.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Families(BTreeMap<FamilyName, BTreeSet<FieldName>>);

impl Families {
    /// Builds a family mapping, validating that no field is claimed
    /// twice.
    pub fn new(
        families: impl IntoIterator<Item = (FamilyName, BTreeSet<FieldName>)>,
    ) -> Result<Self> {
        let mut seen: BTreeSet<FieldName> = BTreeSet::new();
        let mut map = BTreeMap::new();

        for (name, fields) in families {
            for field in &fields {
                if !seen.insert(field.clone()) {
                    return Err(Error::InvalidFamilies {
                        field: field.to_string(),
                    });
                }
            }
            map.insert(name, fields);
        }

        Ok(Self(map))
    }

    /// The empty mapping: every field lands in `base`.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Iterates the named (non-`base`) families.
    pub fn iter(&self) -> impl Iterator<Item = (&FamilyName, &BTreeSet<FieldName>)> {
        self.0.iter()
    }

    /// Returns the named family owning `field`, if any.
    #[must_use]
    pub fn family_for(&self, field: &FieldName) -> Option<&FamilyName> {
        self.0
            .iter()
            .find(|(_, fields)| fields.contains(field))
            .map(|(name, _)| name)
    }

    /// Returns `true` if any field in `fields` is not covered by a named
    /// family (and therefore lives in `base`).
    #[must_use]
    pub fn covers_all(&self, fields: &BTreeSet<FieldName>) -> bool {
        fields.iter().all(|f| self.family_for(f).is_some())
    }
}

/// Splits `records` into one sorted fragment sequence per family.
///
/// For each record, each named family gets a fragment containing exactly
/// the fields it claims; `base` collects everything else. A fragment that
/// would be empty is omitted, except `base`, which is always present for
/// every surviving key (so a read that only wants `base` never has to
/// consult a named-family tablet to learn a key exists).
#[must_use]
pub fn split_data(
    families: &Families,
    records: impl IntoIterator<Item = (Key, Record)>,
) -> BTreeMap<FamilyName, Vec<(Key, Record)>> {
    let mut out: BTreeMap<FamilyName, Vec<(Key, Record)>> = BTreeMap::new();
    out.insert(FamilyName::from(BASE), Vec::new());

    for (key, record) in records {
        let mut per_family: BTreeMap<FamilyName, Record> = BTreeMap::new();

        for (field_name, value) in record {
            let target = families
                .family_for(&field_name)
                .cloned()
                .unwrap_or_else(|| FamilyName::from(BASE));
            per_family.entry(target).or_default().insert(field_name, value);
        }

        // `base` is always emitted, even if empty, for every surviving key.
        per_family.entry(FamilyName::from(BASE)).or_default();

        for (family, fragment) in per_family {
            if family.as_ref() == BASE || !fragment.is_empty() {
                out.entry(family).or_default().push((key.clone(), fragment));
            }
        }
    }

    out
}
