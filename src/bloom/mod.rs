// Copyright (c) 2026-present, merkle-partition-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)
//
// Grounded on fjall-rs/lsm-tree's bloom::BloomFilter: double hashing with
// xxh3_128, sized to a target false-positive rate.

mod bit_array;

use crate::coding::{Decode, DecodeError, Encode, EncodeError, MAGIC_BYTES};
use bit_array::BitArray;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Two hashes combined via double hashing, avoiding `k` independent hash
/// functions.
pub type CompositeHash = (u64, u64);

/// C3 — a probabilistic membership filter over record keys.
///
/// May return `true` for an absent key (false positive); must never
/// return `false` for a present key (no false negatives).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MembershipFilter {
    inner: BitArray,
    m: usize,
    k: usize,
}

impl Encode for MembershipFilter {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_all(&MAGIC_BYTES)?;
        writer.write_u64::<BigEndian>(self.m as u64)?;
        writer.write_u64::<BigEndian>(self.k as u64)?;
        writer.write_all(self.inner.bytes())?;
        Ok(())
    }
}

impl Decode for MembershipFilter {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let mut magic = [0u8; MAGIC_BYTES.len()];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC_BYTES {
            return Err(DecodeError::InvalidHeader("MembershipFilter"));
        }

        let m = reader.read_u64::<BigEndian>()? as usize;
        let k = reader.read_u64::<BigEndian>()? as usize;

        let mut bytes = vec![0; m / 8];
        reader.read_exact(&mut bytes)?;

        Ok(Self {
            inner: BitArray::from_bytes(bytes.into_boxed_slice()),
            m,
            k,
        })
    }
}

#[allow(clippy::len_without_is_empty)]
impl MembershipFilter {
    /// Constructs a filter sized for `capacity` items at the given target
    /// false-positive rate.
    #[must_use]
    pub fn with_fp_rate(capacity: usize, fpr: f32) -> Self {
        use std::f32::consts::LN_2;

        let capacity = capacity.max(1);
        let fpr = fpr.max(0.000_001);

        let m = Self::calculate_m(capacity, fpr);
        let bpk = (m / capacity).max(1);
        let k = (((bpk as f32) * LN_2) as usize).max(1);

        Self {
            inner: BitArray::with_capacity(m / 8),
            m,
            k,
        }
    }

    fn calculate_m(n: usize, fp_rate: f32) -> usize {
        use std::f32::consts::LN_2;

        let n = n as f32;
        let ln2_squared = LN_2.powi(2);
        let numerator = n * fp_rate.ln();
        let m = -(numerator / ln2_squared);

        (((m / 8.0).ceil() * 8.0) as usize).max(8)
    }

    /// Size of the filter in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.bytes().len()
    }

    /// Inserts a key into the filter.
    pub fn insert(&mut self, key: &[u8]) {
        self.set_with_hash(Self::get_hash(key));
    }

    /// Returns `true` if the key may be contained. Never a false negative.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.contains_hash(Self::get_hash(key))
    }

    fn set_with_hash(&mut self, (mut h1, mut h2): CompositeHash) {
        for i in 0..(self.k as u64) {
            let idx = h1 % (self.m as u64);
            self.inner.set(idx as usize, true);
            h1 = h1.wrapping_add(h2);
            h2 = h2.wrapping_add(i);
        }
    }

    fn contains_hash(&self, (mut h1, mut h2): CompositeHash) -> bool {
        for i in 0..(self.k as u64) {
            let idx = h1 % (self.m as u64);
            if !self.inner.get(idx as usize) {
                return false;
            }
            h1 = h1.wrapping_add(h2);
            h2 = h2.wrapping_add(i);
        }
        true
    }

    fn get_hash(key: &[u8]) -> CompositeHash {
        let h0 = xxhash_rust::xxh3::xxh3_128(key);
        let h1 = (h0 >> 64) as u64;
        let h2 = h0 as u64;
        (h1, h2)
    }
}

/// Builds a membership filter containing every key in `keys`, sized for
/// `keys.len()` items at the given false-positive rate.
pub fn build(keys: impl ExactSizeIterator<Item = impl AsRef<[u8]>>, fpr: f32) -> MembershipFilter {
    let mut filter = MembershipFilter::with_fp_rate(keys.len().max(1), fpr);
    for key in keys {
        filter.insert(key.as_ref());
    }
    filter
}
