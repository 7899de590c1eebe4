// Copyright (c) 2026-present, merkle-partition-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::family::Families;

/// Default maximum number of records per partition.
pub const DEFAULT_LIMIT: usize = 10_000;

/// Default target false-positive rate for the membership filter.
pub const DEFAULT_BLOOM_FPR: f32 = 0.01;

/// Partition construction and update parameters.
#[derive(Clone, Debug)]
pub struct Params {
    /// Maximum records per partition. Must be at least 2.
    pub limit: usize,
    /// Field-family partitioning.
    pub families: Families,
    /// False-positive target for the membership filter.
    pub bloom_fpr: f32,
}

impl Params {
    /// Builds params with the given limit and all other fields defaulted.
    ///
    /// # Panics
    ///
    /// Panics if `limit < 2`.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        assert!(limit >= 2, "limit must be at least 2, got {limit}");
        Self {
            limit,
            families: Families::empty(),
            bloom_fpr: DEFAULT_BLOOM_FPR,
        }
    }

    /// Sets the field-family mapping.
    #[must_use]
    pub fn with_families(mut self, families: Families) -> Self {
        self.families = families;
        self
    }

    /// Sets the membership filter's target false-positive rate.
    #[must_use]
    pub fn with_bloom_fpr(mut self, fpr: f32) -> Self {
        self.bloom_fpr = fpr;
        self
    }

    /// `ceil(limit / 2)` — the minimum size of a valid non-boundary
    /// partition once the tree holds at least `limit` records.
    #[must_use]
    pub fn half_full(&self) -> usize {
        self.limit.div_ceil(2)
    }

    /// `limit + half_full` — the record count at which the update engine
    /// splits off a full partition and keeps a safe remainder.
    #[must_use]
    pub fn emit_threshold(&self) -> usize {
        self.limit + self.half_full()
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds() {
        let params = Params::new(6);
        assert_eq!(params.half_full(), 3);
        assert_eq!(params.emit_threshold(), 9);

        let odd = Params::new(7);
        assert_eq!(odd.half_full(), 4);
    }

    #[test]
    #[should_panic(expected = "limit must be at least 2")]
    fn rejects_tiny_limit() {
        Params::new(1);
    }
}
