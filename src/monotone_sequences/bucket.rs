//! Shared per-bucket Elias-Fano encoder and decoder.
#![cfg(target_pointer_width = "64")]

use crate::bit_vectors::{BitVector, Select, SelectIndex};
use crate::broadword;
use crate::int_vectors::CompactVector;

/// Number of low bits of an info word holding the lower-bit width.
pub(crate) const INFO_WIDTH_BITS: u64 = 6;

/// Mask extracting the lower-bit width from an info word.
pub(crate) const INFO_WIDTH_MASK: u64 = (1 << INFO_WIDTH_BITS) - 1;

/// Packs the base value and the lower-bit width of a bucket into one info word.
#[inline(always)]
pub(crate) const fn pack_info(prev_upper: u64, low_len: usize) -> u64 {
    (prev_upper << INFO_WIDTH_BITS) | low_len as u64
}

/// Extracts the base value from an info word.
#[inline(always)]
pub(crate) const fn info_upper(info: u64) -> u64 {
    info >> INFO_WIDTH_BITS
}

/// Extracts the lower-bit width from an info word.
#[inline(always)]
pub(crate) const fn info_width(info: u64) -> usize {
    (info & INFO_WIDTH_MASK) as usize
}

/// One Elias-Fano encoded bucket: the packed lower parts of its values and
/// the unary upper-part bitmap frozen under a select index.
///
/// Values are stored relative to the bucket's base value (the last value of
/// the preceding bucket), which is kept in the owner's info word together
/// with the lower-bit width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EncodedBucket {
    low_bits: CompactVector,
    high_bits: SelectIndex,
}

impl EncodedBucket {
    /// Gets the number of encoded values.
    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.high_bits.num_ones()
    }

    /// Decodes the `pos`-th value relative to the bucket's base, or
    /// [`None`] if out of bounds.
    #[inline(always)]
    pub(crate) fn access(&self, pos: usize) -> Option<u64> {
        let high = (self.high_bits.select1(pos)? - pos) as u64;
        let low = self.low_bits.get_int(pos)?;
        Some((high << self.low_bits.width()) | low)
    }

    /// Gets the select-indexed upper-part bitmap.
    #[inline(always)]
    pub(crate) const fn high_bits(&self) -> &SelectIndex {
        &self.high_bits
    }

    /// Gets the packed lower parts.
    #[inline(always)]
    pub(crate) const fn low_bits(&self) -> &CompactVector {
        &self.low_bits
    }

    /// Returns the number of bits of allocated backing storage.
    pub(crate) fn bits_used(&self) -> u64 {
        self.low_bits.bits_used() + self.high_bits.bits_used()
    }
}

/// Encodes `values` against the base `prev_upper`, returning the encoded
/// bucket and its lower-bit width.
///
/// All values must be no less than `prev_upper` and sorted in non-decreasing
/// order; `values` must not be empty.
pub(crate) fn encode(values: &[u64], prev_upper: u64) -> (EncodedBucket, usize) {
    debug_assert!(!values.is_empty());
    debug_assert!(values.windows(2).all(|w| w[0] <= w[1]));
    debug_assert!(prev_upper <= values[0]);

    let universe = values[values.len() - 1] - prev_upper;
    let low_len = broadword::msb(universe / values.len() as u64).unwrap_or(0);
    let low_mask = (1u64 << low_len) - 1;

    // NOTE: low_len <= 63 and the bitmap positions are within the length
    // computed below, so the internal updates cannot fail.
    let mut low_bits = CompactVector::from_int(0, values.len(), low_len).unwrap();
    let mut high = BitVector::from_bit(
        false,
        values.len() + (universe >> low_len) as usize + 1,
    );
    for (i, &v) in values.iter().enumerate() {
        let rel = v - prev_upper;
        if low_len != 0 {
            low_bits.set_int(i, rel & low_mask).unwrap();
        }
        high.set_bit((rel >> low_len) as usize + i, true).unwrap();
    }

    let bucket = EncodedBucket {
        low_bits,
        high_bits: SelectIndex::build(high),
    };
    (bucket, low_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    #[test]
    fn test_roundtrip_small() {
        let values = [3, 4, 7, 13, 14, 15, 21, 43];
        let (eb, low_len) = encode(&values, 2);
        assert_eq!(eb.len(), values.len());
        assert_eq!(eb.low_bits().width(), low_len);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(eb.access(i), Some(v - 2));
        }
        assert_eq!(eb.access(values.len()), None);
    }

    #[test]
    fn test_all_equal_to_base() {
        let values = [9, 9, 9, 9];
        let (eb, low_len) = encode(&values, 9);
        assert_eq!(low_len, 0);
        for i in 0..values.len() {
            assert_eq!(eb.access(i), Some(0));
        }
    }

    #[test]
    fn test_popcount_and_width_bound() {
        let mut rng = ChaChaRng::seed_from_u64(5);
        for _ in 0..20 {
            let prev_upper = rng.gen_range(0..1000u64);
            let mut values = vec![];
            let mut cur = prev_upper;
            for _ in 0..64 {
                cur += rng.gen_range(0..2000);
                values.push(cur);
            }
            let (eb, low_len) = encode(&values, prev_upper);
            let universe = values[values.len() - 1] - prev_upper;
            assert_eq!(eb.high_bits().num_ones(), values.len());
            assert!(low_len as u64 <= broadword::msb(universe).map_or(0, |m| m as u64));
            for (i, &v) in values.iter().enumerate() {
                assert_eq!(eb.access(i), Some(v - prev_upper));
            }
        }
    }
}
