// Copyright (c) 2026-present, merkle-partition-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! C8 — the structural validator, used by tests and integrity audits.
//!
//! Grounded on the teacher's `verify.rs`, which walks a tree of segments
//! collecting a list of corruption findings instead of failing at the
//! first one.

use crate::error::Error;
use crate::family::{FamilyName, Families, BASE};
use crate::key::Key;
use crate::partition::{read::read_all_families, PartitionNode, Params};
use crate::store::ObjectStore;

/// Contextual information the validator needs beyond what a partition
/// node carries itself: the family mapping it was built against, and the
/// key bounds its enclosing subtree guarantees.
pub struct ValidationContext<'a> {
    /// The family -> fields mapping this partition is expected to use.
    pub expected_families: &'a Families,
    /// Inclusive lower bound on `first_key`, if this partition is not the
    /// leftmost in its tree.
    pub lower_bound: Option<&'a Key>,
    /// Inclusive upper bound on `last_key`, if this partition is not the
    /// rightmost in its tree.
    pub upper_bound: Option<&'a Key>,
    /// Whether the `count >= half_full` rule applies. Spec.md §4.9
    /// scopes this to "when tree total >= limit" — a lone small
    /// partition at the root of an otherwise-empty table is exempt.
    pub enforce_half_full: bool,
}

/// Validates `node` against `ctx`, recursively checking every referenced
/// tablet. Collects every violation rather than stopping at the first,
/// so an audit can report them all in one pass.
#[must_use]
pub fn validate_partition(store: &dyn ObjectStore, node: &PartitionNode, ctx: &ValidationContext<'_>) -> Vec<Error> {
    let mut failures = Vec::new();

    if node.families != *ctx.expected_families {
        failures.push(fail("schema.families", "partition's family mapping does not match the expected one"));
    }

    let base = FamilyName::from(BASE);
    if !node.tablets.contains_key(&base) {
        failures.push(fail("schema.base_tablet", "partition is missing its base tablet"));
    }

    if node.count > node.limit {
        failures.push(fail(
            "count.limit",
            format!("count {} exceeds limit {}", node.count, node.limit),
        ));
    }

    let half_full = Params::new(node.limit.max(2)).half_full();
    if ctx.enforce_half_full && node.count < half_full {
        failures.push(fail(
            "count.half_full",
            format!("count {} is below half_full {half_full}", node.count),
        ));
    }

    if node.first_key > node.last_key {
        failures.push(fail("bounds.ordered", "first_key is greater than last_key"));
    }

    if let Some(lower) = ctx.lower_bound {
        if node.first_key < *lower {
            failures.push(fail("bounds.lower", "first_key falls below the subtree's lower bound"));
        }
    }
    if let Some(upper) = ctx.upper_bound {
        if node.last_key > *upper {
            failures.push(fail("bounds.upper", "last_key exceeds the subtree's upper bound"));
        }
    }

    failures.extend(validate_tablets(store, node));

    failures
}

fn validate_tablets(store: &dyn ObjectStore, node: &PartitionNode) -> Vec<Error> {
    let mut failures = Vec::new();

    for (family, link) in &node.tablets {
        let tablet = match store.get_data(link).and_then(crate::store::NodeData::into_tablet) {
            Ok(tablet) => tablet,
            Err(_) => {
                failures.push(fail(
                    "tablet.unreadable",
                    format!("family {family:?}'s tablet at {link} could not be read"),
                ));
                continue;
            }
        };

        if let Some(first) = tablet.first_key() {
            if *first < node.first_key {
                failures.push(fail(
                    "tablet.bounds",
                    format!("family {family:?}'s first key is below the partition's first_key"),
                ));
            }
        }
        if let Some(last) = tablet.last_key() {
            if *last > node.last_key {
                failures.push(fail(
                    "tablet.bounds",
                    format!("family {family:?}'s last key exceeds the partition's last_key"),
                ));
            }
        }

        if family.as_ref() == BASE && tablet.len() != node.count {
            failures.push(fail(
                "tablet.count",
                format!("base tablet has {} records, partition count is {}", tablet.len(), node.count),
            ));
        }
    }

    if let Err(err) = read_all_families(store, node) {
        failures.push(fail("tablet.merge", format!("merging family tablets failed: {err}")));
    }

    failures
}

fn fail(rule: &'static str, detail: impl Into<String>) -> Error {
    Error::ValidationFailure {
        rule,
        detail: detail.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::patch::PatchValue;
    use crate::record::record;
    use crate::store::MemoryStore;

    fn build(store: &MemoryStore, params: &Params, keys: &[&'static str]) -> PartitionNode {
        let records = keys
            .iter()
            .map(|k| (Key::from(*k), PatchValue::Put(record([("x", "1")]))));
        crate::partition::from_records(store, params, records).unwrap().unwrap().node
    }

    #[test]
    fn valid_partition_has_no_failures() {
        let store = MemoryStore::new();
        let params = Params::new(10);
        let node = build(&store, &params, &["k1", "k2", "k3"]);

        let ctx = ValidationContext {
            expected_families: &params.families,
            lower_bound: None,
            upper_bound: None,
            enforce_half_full: false,
        };
        assert!(validate_partition(&store, &node, &ctx).is_empty());
    }

    #[test]
    fn underfull_partition_flagged_when_enforced() {
        let store = MemoryStore::new();
        let params = Params::new(10);
        let node = build(&store, &params, &["k1"]);

        let ctx = ValidationContext {
            expected_families: &params.families,
            lower_bound: None,
            upper_bound: None,
            enforce_half_full: true,
        };
        let failures = validate_partition(&store, &node, &ctx);
        assert!(failures.iter().any(|e| matches!(e, Error::ValidationFailure { rule, .. } if *rule == "count.half_full")));
    }

    #[test]
    fn out_of_bounds_keys_flagged() {
        let store = MemoryStore::new();
        let params = Params::new(10);
        let node = build(&store, &params, &["k5", "k6"]);

        let lower = Key::from("k7");
        let ctx = ValidationContext {
            expected_families: &params.families,
            lower_bound: Some(&lower),
            upper_bound: None,
            enforce_half_full: false,
        };
        let failures = validate_partition(&store, &node, &ctx);
        assert!(failures.iter().any(|e| matches!(e, Error::ValidationFailure { rule, .. } if *rule == "bounds.lower")));
    }

    #[test]
    fn mismatched_family_mapping_flagged() {
        let store = MemoryStore::new();
        let params = Params::new(10);
        let node = build(&store, &params, &["k1"]);

        let other = Families::new([(
            crate::family::FamilyName::from("ab"),
            [crate::record::field("a")].into_iter().collect(),
        )])
        .unwrap();
        let ctx = ValidationContext {
            expected_families: &other,
            lower_bound: None,
            upper_bound: None,
            enforce_half_full: false,
        };
        let failures = validate_partition(&store, &node, &ctx);
        assert!(failures.iter().any(|e| matches!(e, Error::ValidationFailure { rule, .. } if *rule == "schema.families")));
    }
}
