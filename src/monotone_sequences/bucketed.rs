//! Bucketed Elias-Fano sequence with append-only updates and a fixed bucket size.
#![cfg(target_pointer_width = "64")]

pub mod iter;

use std::ops::Range;

use anyhow::{anyhow, Result};

use crate::collections::ResizingVec;
use crate::monotone_sequences::bucket::{self, EncodedBucket};
use crate::monotone_sequences::MonotoneSequence;
use iter::{BucketIter, Iter};

/// Bucketed Elias-Fano sequence with append-only updates and a fixed bucket size.
///
/// The sequence keeps a collection of buckets of `bucket_size` integers, each
/// statically compressed with the Elias-Fano strategy against the last value
/// of the preceding bucket. Appended values accumulate in a tail buffer that
/// is compressed into a new bucket whenever it fills. Choosing the bucket
/// size is up to the caller; `ceil(sqrt(8 * n))` is a good default when the
/// expected number of elements `n` is known.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use efseq::monotone_sequences::BucketedEliasFano;
///
/// let mut seq = BucketedEliasFano::new(4)?;
/// seq.extend([0, 1, 2, 3, 4, 5, 6, 7, 8, 9])?;
///
/// assert_eq!(seq.len(), 10);
/// assert_eq!(seq.get(4), Some(4));
///
/// assert_eq!(seq.next_geq(3), Some(3));
/// assert_eq!(seq.next_geq(10), None);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketedEliasFano {
    buckets: ResizingVec<EncodedBucket>,
    // One info word per bucket holding its base value and lower-bit width,
    // plus a trailing slot holding the last compressed value.
    info: ResizingVec<u64>,
    buffer: Vec<u64>,
    bucket_size: usize,
    len: usize,
    last: u64,
}

impl BucketedEliasFano {
    /// Creates a new empty sequence.
    ///
    /// # Arguments
    ///
    ///  - `bucket_size`: Number of integers per compressed bucket.
    ///
    /// # Errors
    ///
    /// An error is returned if `bucket_size` is zero.
    pub fn new(bucket_size: usize) -> Result<Self> {
        if bucket_size == 0 {
            return Err(anyhow!("bucket_size must be greater than 0."));
        }
        let mut info = ResizingVec::new();
        info.push(0).unwrap();
        Ok(Self {
            buckets: ResizingVec::new(),
            info,
            buffer: Vec::with_capacity(bucket_size),
            bucket_size,
            len: 0,
            last: 0,
        })
    }

    /// Creates a new empty sequence with space reserved for `capacity` integers.
    ///
    /// # Arguments
    ///
    ///  - `bucket_size`: Number of integers per compressed bucket.
    ///  - `capacity`: Number of integers reserved at least.
    ///
    /// # Errors
    ///
    /// An error is returned if
    ///
    ///  - `bucket_size` is zero, or
    ///  - `capacity` is less than `bucket_size`.
    pub fn with_capacity(bucket_size: usize, capacity: usize) -> Result<Self> {
        if bucket_size == 0 {
            return Err(anyhow!("bucket_size must be greater than 0."));
        }
        if capacity < bucket_size {
            return Err(anyhow!(
                "capacity must be no less than bucket_size={bucket_size}, but got {capacity}."
            ));
        }
        let num_buckets = capacity / bucket_size;
        let mut info = ResizingVec::with_capacity(num_buckets + 1);
        info.push(0).unwrap();
        Ok(Self {
            buckets: ResizingVec::with_capacity(num_buckets),
            info,
            buffer: Vec::with_capacity(bucket_size),
            bucket_size,
            len: 0,
            last: 0,
        })
    }

    /// Appends `val` at the end.
    ///
    /// # Arguments
    ///
    ///  - `val`: Integer pushed that must be no less than the last one.
    ///
    /// # Errors
    ///
    /// An error is returned if `val` is less than the last pushed integer.
    ///
    /// # Complexity
    ///
    /// Constant (amortized)
    pub fn push(&mut self, val: u64) -> Result<()> {
        if 0 < self.len && val < self.last {
            return Err(anyhow!(
                "val must be no less than the last one {}, but got {val}.",
                self.last
            ));
        }
        self.buffer.push(val);
        self.last = val;
        self.len += 1;
        if self.buffer.len() == self.bucket_size {
            self.compress_tail();
        }
        Ok(())
    }

    /// Appends integers at the end.
    ///
    /// # Arguments
    ///
    ///  - `vals`: Integer stream that must be non-decreasing, also compared
    ///    to the current last value.
    ///
    /// # Errors
    ///
    /// An error is returned if `vals` breaks the monotone order.
    pub fn extend<I>(&mut self, vals: I) -> Result<()>
    where
        I: IntoIterator<Item = u64>,
    {
        for x in vals {
            self.push(x)?;
        }
        Ok(())
    }

    /// Returns the `pos`-th smallest integer, or [`None`] if out of bounds.
    ///
    /// # Complexity
    ///
    /// Constant
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use efseq::monotone_sequences::BucketedEliasFano;
    ///
    /// let mut seq = BucketedEliasFano::new(2)?;
    /// seq.extend([1, 3, 3, 7])?;
    ///
    /// assert_eq!(seq.get(0), Some(1));
    /// assert_eq!(seq.get(2), Some(3));
    /// assert_eq!(seq.get(4), None);
    /// # Ok(())
    /// # }
    /// ```
    pub fn get(&self, pos: usize) -> Option<u64> {
        if self.len <= pos {
            return None;
        }
        let bucket = pos / self.bucket_size;
        let offset = pos % self.bucket_size;
        if bucket == self.buckets.len() {
            return self.buffer.get(offset).copied();
        }
        self.get_in_bucket(bucket, offset)
    }

    /// Returns the smallest stored value that is no less than `val`, or
    /// [`None`] if no such value exists.
    ///
    /// # Complexity
    ///
    /// $`O(\lg \frac{n}{B})`$ to locate the bucket plus a scan of one bucket.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use efseq::monotone_sequences::BucketedEliasFano;
    ///
    /// let mut seq = BucketedEliasFano::new(2)?;
    /// seq.extend([1, 3, 3, 7])?;
    ///
    /// assert_eq!(seq.next_geq(0), Some(1));
    /// assert_eq!(seq.next_geq(2), Some(3));
    /// assert_eq!(seq.next_geq(7), Some(7));
    /// assert_eq!(seq.next_geq(8), None);
    /// # Ok(())
    /// # }
    /// ```
    pub fn next_geq(&self, val: u64) -> Option<u64> {
        if self.is_empty() || self.last < val {
            return None;
        }
        let bucket = self.bucket_of(val);
        self.iter(bucket * self.bucket_size).find(|&v| val <= v)
    }

    /// Creates an iterator enumerating integers from the `pos`-th one.
    ///
    /// # Arguments
    ///
    ///  - `pos`: Starting position.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use efseq::monotone_sequences::BucketedEliasFano;
    ///
    /// let mut seq = BucketedEliasFano::new(2)?;
    /// seq.extend([1, 3, 3, 7])?;
    ///
    /// let mut it = seq.iter(1);
    /// assert_eq!(it.next(), Some(3));
    /// assert_eq!(it.next(), Some(3));
    /// assert_eq!(it.next(), Some(7));
    /// assert_eq!(it.next(), None);
    /// # Ok(())
    /// # }
    /// ```
    pub fn iter(&self, pos: usize) -> Iter {
        Iter::new(self, pos)
    }

    /// Returns the integers as a vector.
    pub fn to_vec(&self) -> Vec<u64> {
        self.iter(0).collect()
    }

    /// Builds a new sequence holding the integers of the given range.
    ///
    /// The bucket size of the result is tuned to the length of this
    /// sequence, i.e., `ceil(sqrt(8 * self.len()))`.
    ///
    /// # Arguments
    ///
    ///  - `range`: Position range to be copied.
    ///
    /// # Errors
    ///
    /// An error is returned if
    ///
    ///  - `range.start` is greater than `range.end`, or
    ///  - `range.end` is greater than `self.len()`.
    pub fn sub_list(&self, range: Range<usize>) -> Result<Self> {
        if range.end < range.start {
            return Err(anyhow!(
                "range.start must be no greater than range.end={}, but got {}.",
                range.end,
                range.start
            ));
        }
        if self.len() < range.end {
            return Err(anyhow!(
                "range.end must be no greater than self.len()={}, but got {}.",
                self.len(),
                range.end
            ));
        }
        let bucket_size = (((self.len() * 8) as f64).sqrt().ceil() as usize).max(1);
        let mut sub = Self::with_capacity(bucket_size, range.len().max(bucket_size))?;
        for v in self.iter(range.start).take(range.len()) {
            sub.push(v)?;
        }
        Ok(sub)
    }

    /// Gets the number of stored integers.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the sequence is empty.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets the bucket size.
    #[inline(always)]
    pub const fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Returns the total number of bits of allocated internal storage.
    pub fn bits(&self) -> u64 {
        let mut bits = 0;
        for eb in self.buckets.iter() {
            bits += eb.bits_used();
        }
        bits + (self.info.capacity() * 64) as u64 + (self.buffer.capacity() * 64) as u64
    }

    /// Removes all integers, returning the storage to its minimum footprint.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.info.clear();
        self.info.push(0).unwrap();
        self.buffer.clear();
        self.buffer.shrink_to(self.bucket_size);
        self.len = 0;
        self.last = 0;
    }

    /// Reduces the backing capacities to the current number of elements.
    pub fn trim_to_size(&mut self) {
        self.buckets.trim_to_size();
        self.info.trim_to_size();
        self.buffer.shrink_to_fit();
    }

    /// Gets the number of compressed buckets.
    #[inline(always)]
    pub(crate) fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Gets the last pushed value, or 0 if the sequence is empty.
    #[inline(always)]
    pub(crate) const fn last_value(&self) -> u64 {
        self.last
    }

    /// Decodes the `offset`-th value of the compressed bucket `bucket`,
    /// or [`None`] if out of bounds.
    #[inline(always)]
    pub(crate) fn get_in_bucket(&self, bucket: usize, offset: usize) -> Option<u64> {
        let eb = self.buckets.get(bucket)?;
        let info = *self.info.get(bucket).unwrap();
        eb.access(offset).map(|rel| rel + bucket::info_upper(info))
    }

    /// Gets the base value (the recorded upper bound of the predecessor) of
    /// the compressed bucket `bucket`.
    #[inline(always)]
    pub(crate) fn bucket_base(&self, bucket: usize) -> u64 {
        bucket::info_upper(*self.info.get(bucket).unwrap())
    }

    /// Gets the base value of the tail region, i.e., the last recorded
    /// upper bound.
    #[inline(always)]
    pub(crate) fn tail_base(&self) -> u64 {
        bucket::info_upper(*self.info.last().unwrap())
    }

    /// Gets the number of values physically stored in bucket `bucket`,
    /// where the tail buffer counts as the bucket past the compressed ones.
    #[inline(always)]
    pub(crate) fn bucket_len(&self, bucket: usize) -> usize {
        self.buckets
            .get(bucket)
            .map_or(self.buffer.len(), EncodedBucket::len)
    }

    /// Searches the bucket whose value range covers `val`.
    ///
    /// Returns the index `b` such that the base of bucket `b` is less than
    /// `val` and `val` is no greater than the upper bound recorded for `b`;
    /// when `val` equals the base of a bucket, the preceding bucket is
    /// returned so that a scan sees the boundary value. Values beyond the
    /// last recorded upper bound map to the tail bucket.
    pub(crate) fn bucket_of(&self, val: u64) -> usize {
        let (mut lo, mut hi) = (0, self.buckets.len());
        while lo < hi {
            let mid = (lo + hi) / 2;
            // The upper bound of bucket mid is the base recorded for mid + 1.
            let bound = bucket::info_upper(*self.info.get(mid + 1).unwrap());
            if bound < val {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Creates an iterator decoding positions `offsets` of bucket `bucket`,
    /// where the tail buffer counts as the bucket past the compressed ones.
    pub(crate) fn bucket_iter(&self, bucket: usize, offsets: Range<usize>) -> BucketIter {
        BucketIter::new(self, bucket, offsets)
    }

    /// Gets the number of values in the tail buffer.
    #[inline(always)]
    pub(crate) fn tail_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the `offset`-th value of the tail buffer, or [`None`] if out
    /// of bounds.
    #[inline(always)]
    pub(crate) fn tail_get(&self, offset: usize) -> Option<u64> {
        self.buffer.get(offset).copied()
    }

    /// Appends `val` to the tail buffer without triggering compression.
    /// The caller must uphold the monotone order.
    pub(crate) fn tail_push(&mut self, val: u64) {
        debug_assert!(self.is_empty() || self.last <= val);
        self.buffer.push(val);
        self.last = val;
        self.len += 1;
    }

    /// Removes and returns the last value of the tail buffer.
    pub(crate) fn tail_pop(&mut self) -> Option<u64> {
        let val = self.buffer.pop()?;
        self.len -= 1;
        self.last = self
            .buffer
            .last()
            .copied()
            .unwrap_or_else(|| bucket::info_upper(*self.info.last().unwrap()));
        Some(val)
    }

    /// Replaces the tail buffer with `vals`, which must be sorted and no
    /// less than the last recorded upper bound.
    pub(crate) fn set_tail(&mut self, vals: Vec<u64>) {
        self.len = self.len - self.buffer.len() + vals.len();
        self.buffer = vals;
        if let Some(&v) = self.buffer.last() {
            self.last = v;
        }
    }

    /// Empties the tail buffer.
    pub(crate) fn clear_tail(&mut self) {
        self.len -= self.buffer.len();
        self.buffer.clear();
    }

    /// Compresses the tail buffer into a new bucket and resets it.
    /// The buffer must not be empty.
    pub(crate) fn compress_tail(&mut self) {
        debug_assert!(!self.buffer.is_empty());
        let slot = self.buckets.len();
        let prev_upper = bucket::info_upper(*self.info.get(slot).unwrap());
        let (eb, low_len) = bucket::encode(&self.buffer, prev_upper);
        let bucket_last = *self.buffer.last().unwrap();
        // NOTE: neither vector is capacity-bounded.
        self.info.set(slot, bucket::pack_info(prev_upper, low_len)).unwrap();
        self.info.push(bucket_last << bucket::INFO_WIDTH_BITS).unwrap();
        self.buckets.push(eb).unwrap();
        self.buffer.clear();
    }

    /// Re-encodes bucket `bucket` with `vals` against its recorded base.
    pub(crate) fn replace_bucket(&mut self, bucket: usize, vals: &[u64]) {
        let prev_upper = bucket::info_upper(*self.info.get(bucket).unwrap());
        let (eb, low_len) = bucket::encode(vals, prev_upper);
        self.info
            .set(bucket, bucket::pack_info(prev_upper, low_len))
            .unwrap();
        self.buckets.set(bucket, eb).unwrap();
    }

    /// Splits the sorted values `fused` across bucket `bucket` and a newly
    /// inserted successor: the first `left` values are re-encoded in place
    /// and the rest form the new bucket.
    pub(crate) fn split_bucket(&mut self, bucket: usize, fused: &[u64], left: usize) {
        debug_assert!(0 < left && left < fused.len());
        self.replace_bucket(bucket, &fused[..left]);
        let mid_upper = fused[left - 1];
        let (eb, low_len) = bucket::encode(&fused[left..], mid_upper);
        // NOTE: neither vector is capacity-bounded.
        self.info
            .insert(bucket + 1, bucket::pack_info(mid_upper, low_len))
            .unwrap();
        self.buckets.insert(bucket + 1, eb).unwrap();
    }

    /// Removes bucket `bucket` together with its info slot.
    pub(crate) fn remove_bucket(&mut self, bucket: usize) {
        self.buckets.remove(bucket).unwrap();
        self.info.remove(bucket).unwrap();
    }

    /// Raises the trailing upper bound to `val` if it is larger, keeping the
    /// slot valid after the last bucket absorbs values beyond it.
    pub(crate) fn raise_trailing_upper(&mut self, val: u64) {
        let slot = self.buckets.len();
        if bucket::info_upper(*self.info.get(slot).unwrap()) < val {
            self.info
                .set(slot, val << bucket::INFO_WIDTH_BITS)
                .unwrap();
        }
    }
}

impl MonotoneSequence for BucketedEliasFano {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, pos: usize) -> Option<u64> {
        BucketedEliasFano::get(self, pos)
    }

    fn next_geq(&self, val: u64) -> Option<u64> {
        BucketedEliasFano::next_geq(self, val)
    }

    fn bits(&self) -> u64 {
        BucketedEliasFano::bits(self)
    }

    fn clear(&mut self) {
        BucketedEliasFano::clear(self)
    }

    fn trim_to_size(&mut self) {
        BucketedEliasFano::trim_to_size(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn gen_monotone(len: usize, max_gap: u64, seed: u64) -> Vec<u64> {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let mut cur = 0;
        (0..len)
            .map(|_| {
                cur += rng.gen_range(1..=max_gap);
                cur
            })
            .collect()
    }

    #[test]
    fn test_new_zero_bucket_size() {
        let e = BucketedEliasFano::new(0);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("bucket_size must be greater than 0.".to_string())
        );
    }

    #[test]
    fn test_with_capacity_too_small() {
        let e = BucketedEliasFano::with_capacity(8, 4);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("capacity must be no less than bucket_size=8, but got 4.".to_string())
        );
    }

    #[test]
    fn test_push_decrease() {
        let mut seq = BucketedEliasFano::new(4).unwrap();
        seq.push(2).unwrap();
        let e = seq.push(1);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("val must be no less than the last one 2, but got 1.".to_string())
        );
    }

    #[test]
    fn test_walkthrough() {
        let mut seq = BucketedEliasFano::new(4).unwrap();
        seq.extend(0..10).unwrap();

        assert_eq!(seq.len(), 10);
        for i in 0..10 {
            assert_eq!(seq.get(i), Some(i as u64));
        }
        assert_eq!(seq.get(10), None);

        let sub = seq.sub_list(2..7).unwrap();
        assert_eq!(sub.to_vec(), vec![2, 3, 4, 5, 6]);

        assert_eq!(seq.next_geq(3), Some(3));
        assert_eq!(seq.next_geq(4), Some(4));
        assert_eq!(seq.next_geq(10), None);

        seq.extend([23, 34, 34, 36, 39]).unwrap();
        assert_eq!(seq.next_geq(36), Some(36));
        assert_eq!(seq.next_geq(24), Some(34));
        assert_eq!(seq.next_geq(40), None);
    }

    #[test]
    fn test_clone_independence() {
        let mut seq = BucketedEliasFano::new(4).unwrap();
        seq.extend(0..10).unwrap();

        let copy = seq.clone();
        let last = seq.get(9).unwrap();
        seq.push(last + 1).unwrap();

        assert_eq!(copy.len(), 10);
        assert_eq!(seq.len(), 11);
        assert_eq!(copy.get(9), Some(9));
        assert_eq!(copy.get(10), None);
        assert_eq!(seq.get(10), Some(10));
    }

    #[test]
    fn test_duplicates() {
        let mut seq = BucketedEliasFano::new(3).unwrap();
        seq.extend([5, 5, 5, 5, 5, 8, 8, 9]).unwrap();
        assert_eq!(seq.to_vec(), vec![5, 5, 5, 5, 5, 8, 8, 9]);
        assert_eq!(seq.next_geq(0), Some(5));
        assert_eq!(seq.next_geq(5), Some(5));
        assert_eq!(seq.next_geq(6), Some(8));
        assert_eq!(seq.index_of(5), Some(0));
        assert_eq!(seq.last_index_of(5), Some(4));
        assert_eq!(seq.last_index_of(8), Some(6));
        assert_eq!(seq.index_of(6), None);
    }

    #[test]
    fn test_random_roundtrip() {
        for seed in 0..3 {
            let vals = gen_monotone(10000, 2000, seed);
            let bucket_size = ((vals.len() * 8) as f64).sqrt() as usize;
            let mut seq = BucketedEliasFano::with_capacity(bucket_size, vals.len()).unwrap();
            seq.extend(vals.iter().copied()).unwrap();

            assert_eq!(seq.len(), vals.len());
            for (i, &v) in vals.iter().enumerate() {
                assert_eq!(seq.get(i), Some(v));
            }
            assert_eq!(seq.to_vec(), vals);
        }
    }

    #[test]
    fn test_random_next_geq() {
        let vals = gen_monotone(3000, 100, 11);
        let mut seq = BucketedEliasFano::new(55).unwrap();
        seq.extend(vals.iter().copied()).unwrap();

        let mut rng = ChaChaRng::seed_from_u64(12);
        let last = *vals.last().unwrap();
        for _ in 0..500 {
            let x = rng.gen_range(0..=last + 10);
            let expected = vals.iter().copied().find(|&v| x <= v);
            assert_eq!(seq.next_geq(x), expected, "x={x}");
        }
    }

    #[test]
    fn test_append_then_query_idempotence() {
        // Two different bucket sizes encode the same logical sequence.
        let vals = gen_monotone(2000, 500, 3);
        let mut a = BucketedEliasFano::new(16).unwrap();
        let mut b = BucketedEliasFano::new(127).unwrap();
        a.extend(vals.iter().copied()).unwrap();
        b.extend(vals.iter().copied()).unwrap();

        let mut rng = ChaChaRng::seed_from_u64(4);
        let last = *vals.last().unwrap();
        for _ in 0..300 {
            let x = rng.gen_range(0..=last + 1);
            assert_eq!(a.next_geq(x), b.next_geq(x), "x={x}");
        }
    }

    #[test]
    fn test_bits_after_trim() {
        let vals = gen_monotone(5000, 64, 9);
        let mut seq = BucketedEliasFano::new(64).unwrap();
        seq.extend(vals.iter().copied()).unwrap();

        let before = seq.bits();
        seq.trim_to_size();
        assert!(seq.bits() <= before);
        assert_eq!(seq.to_vec(), vals);
    }

    #[test]
    fn test_clear() {
        let mut seq = BucketedEliasFano::new(8).unwrap();
        seq.extend(0..100).unwrap();
        seq.clear();
        assert!(seq.is_empty());
        assert_eq!(seq.get(0), None);
        assert_eq!(seq.next_geq(0), None);
        seq.extend([7, 8, 9]).unwrap();
        assert_eq!(seq.to_vec(), vec![7, 8, 9]);
    }
}
