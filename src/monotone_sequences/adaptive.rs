//! Bucketed Elias-Fano sequence with a geometric schedule of bucket sizes.
#![cfg(target_pointer_width = "64")]

use std::ops::Range;

use anyhow::{anyhow, Result};

use crate::broadword;
use crate::collections::ResizingVec;
use crate::monotone_sequences::bucketed::{self, BucketedEliasFano};
use crate::monotone_sequences::MonotoneSequence;

/// Bucketed Elias-Fano sequence with a geometric schedule of bucket sizes.
///
/// The sequence spreads its values over a list of [`BucketedEliasFano`]
/// chunks, each storing values relative to the last value of the previous
/// chunk. While the sequence is small, the single chunk is rebuilt with a
/// doubled bucket size every time a growth threshold is crossed; after seven
/// doublings, further growth closes the current chunk and opens a new one
/// with a bucket size of about `sqrt(8 * n)` for the elements `n` it is
/// scheduled to hold. This removes the need to pre-tune the bucket size when
/// the final length is unknown.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use efseq::monotone_sequences::AdaptiveEliasFano;
///
/// let mut seq = AdaptiveEliasFano::new();
/// seq.extend([2, 3, 10, 10, 27])?;
///
/// assert_eq!(seq.len(), 5);
/// assert_eq!(seq.get(2), Some(10));
/// assert_eq!(seq.next_geq(11), Some(27));
/// assert_eq!(seq.next_geq(28), None);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptiveEliasFano {
    chunks: ResizingVec<Chunk>,
    init_bucket_size: usize,
    bucket_size: usize,
    // Number of integers to be stored before the schedule advances.
    threshold: usize,
    // Length at which chunk 0 is full and spilling starts.
    milestone: usize,
    msb_milestone: usize,
    // Completed in-place doublings of the bucket size, 7 at most.
    grow_steps: usize,
    len: usize,
    last: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Chunk {
    seq: BucketedEliasFano,
    prev_upper: u64,
}

/// Default initial bucket size.
const DEFAULT_BUCKET_SIZE: usize = 32;

/// Number of in-place doublings before spilling to a new chunk.
const MAX_GROW_STEPS: usize = 7;

impl AdaptiveEliasFano {
    /// Creates a new empty sequence with the default initial bucket size of 32.
    pub fn new() -> Self {
        // NOTE: the default initial bucket size satisfies the minimum.
        Self::with_bucket_size(DEFAULT_BUCKET_SIZE).unwrap()
    }

    /// Creates a new empty sequence with the given initial bucket size.
    ///
    /// # Arguments
    ///
    ///  - `bucket_size`: Initial bucket size.
    ///
    /// # Errors
    ///
    /// An error is returned if `bucket_size` is less than 16.
    pub fn with_bucket_size(bucket_size: usize) -> Result<Self> {
        if bucket_size < 16 {
            return Err(anyhow!(
                "bucket_size must be no less than 16, but got {bucket_size}."
            ));
        }
        let mut chunks = ResizingVec::new();
        chunks
            .push(Chunk {
                seq: BucketedEliasFano::new(bucket_size)?,
                prev_upper: 0,
            })
            .unwrap();
        let spill = bucket_size << MAX_GROW_STEPS;
        let milestone = spill * spill / 8;
        Ok(Self {
            chunks,
            init_bucket_size: bucket_size,
            bucket_size,
            threshold: bucket_size * bucket_size / 8,
            milestone,
            msb_milestone: broadword::msb(milestone as u64).unwrap(),
            grow_steps: 0,
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
    pub fn push(&mut self, val: u64) -> Result<()> {
        if 0 < self.len && val < self.last {
            return Err(anyhow!(
                "val must be no less than the last one {}, but got {val}.",
                self.last
            ));
        }
        if self.threshold < self.len {
            self.advance_schedule()?;
        }
        let chunk = self.chunks.last_mut().unwrap();
        chunk.seq.push(val - chunk.prev_upper)?;
        self.last = val;
        self.len += 1;
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

    // Grows the bucket size in place, or closes the current chunk once the
    // doublings are exhausted.
    fn advance_schedule(&mut self) -> Result<()> {
        if self.grow_steps < MAX_GROW_STEPS {
            self.bucket_size <<= 1;
            self.threshold = self.bucket_size * self.bucket_size / 8;
            self.grow_steps += 1;
            let rebuilt = {
                let chunk = self.chunks.last().unwrap();
                let capacity = (chunk.seq.len() * 2).max(self.bucket_size);
                let mut rebuilt = BucketedEliasFano::with_capacity(self.bucket_size, capacity)?;
                for v in chunk.seq.iter(0) {
                    rebuilt.push(v)?;
                }
                rebuilt
            };
            self.chunks.last_mut().unwrap().seq = rebuilt;
        } else {
            self.threshold <<= 1;
            self.bucket_size = ((self.threshold * 4) as f64).sqrt() as usize;
            self.chunks.push(Chunk {
                seq: BucketedEliasFano::new(self.bucket_size)?,
                prev_upper: self.last,
            })?;
        }
        Ok(())
    }

    /// Returns the `pos`-th smallest integer, or [`None`] if out of bounds.
    ///
    /// # Complexity
    ///
    /// Constant
    pub fn get(&self, pos: usize) -> Option<u64> {
        if self.len <= pos {
            return None;
        }
        let id = self.chunk_of(pos);
        let chunk = self.chunks.get(id).unwrap();
        chunk
            .seq
            .get(pos - self.chunk_offset(id))
            .map(|v| v + chunk.prev_upper)
    }

    /// Returns the smallest stored value that is no less than `val`, or
    /// [`None`] if no such value exists.
    pub fn next_geq(&self, val: u64) -> Option<u64> {
        if self.is_empty() || self.last < val {
            return None;
        }
        let id = self.chunk_for_value(val);
        let chunk = self.chunks.get(id).unwrap();
        chunk
            .seq
            .next_geq(val.saturating_sub(chunk.prev_upper))
            .map(|v| v + chunk.prev_upper)
    }

    // Identifies the chunk holding global position `pos`, branch-free.
    //
    // Chunk 0 holds positions up to the milestone; chunk k > 0 begins at
    // milestone * 2^(k-1) + 1.
    fn chunk_of(&self, pos: usize) -> usize {
        let d = broadword::msb(pos as u64).map_or(-1, |m| m as i64) - self.msb_milestone as i64;
        let x = d.max(0) as usize;
        x + usize::from((self.milestone << x) < pos)
    }

    // Global position at which chunk `id` begins.
    fn chunk_offset(&self, id: usize) -> usize {
        if id == 0 {
            0
        } else {
            (self.milestone << (id - 1)) + 1
        }
    }

    // Binary search over the chunk base values. When `val` equals a chunk
    // base, the preceding chunk is returned so that a scan sees the boundary
    // value; values at or beyond the last base map to the last chunk.
    fn chunk_for_value(&self, val: u64) -> usize {
        let n = self.chunks.len();
        if self.chunks.last().unwrap().prev_upper <= val {
            return n - 1;
        }
        let (mut lo, mut hi) = (0, n - 1);
        while lo < hi {
            let mid = (lo + hi) / 2;
            let bound = self.chunks.get(mid + 1).unwrap().prev_upper;
            if bound < val {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Creates an iterator enumerating integers from position `pos`.
    pub fn iter(&self, pos: usize) -> Iter {
        Iter::new(self, pos)
    }

    /// Returns the integers as a vector.
    pub fn to_vec(&self) -> Vec<u64> {
        self.iter(0).collect()
    }

    /// Builds a new adaptive sequence holding the integers of the given
    /// range, copied through an iterator.
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
        let mut sub = Self::new();
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

    /// Gets the current bucket size of the schedule.
    #[inline(always)]
    pub const fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Returns the total number of bits of allocated internal storage.
    pub fn bits(&self) -> u64 {
        self.chunks.iter().map(|c| c.seq.bits()).sum()
    }

    /// Removes all integers, returning the storage to its minimum footprint.
    pub fn clear(&mut self) {
        // NOTE: the initial bucket size was validated at construction.
        *self = Self::with_bucket_size(self.init_bucket_size).unwrap();
    }

    /// Reduces the backing capacities to the current number of elements.
    pub fn trim_to_size(&mut self) {
        for i in 0..self.chunks.len() {
            self.chunks.get_mut(i).unwrap().seq.trim_to_size();
        }
        self.chunks.trim_to_size();
    }
}

impl Default for AdaptiveEliasFano {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotoneSequence for AdaptiveEliasFano {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, pos: usize) -> Option<u64> {
        AdaptiveEliasFano::get(self, pos)
    }

    fn next_geq(&self, val: u64) -> Option<u64> {
        AdaptiveEliasFano::next_geq(self, val)
    }

    fn bits(&self) -> u64 {
        AdaptiveEliasFano::bits(self)
    }

    fn clear(&mut self) {
        AdaptiveEliasFano::clear(self)
    }

    fn trim_to_size(&mut self) {
        AdaptiveEliasFano::trim_to_size(self)
    }
}

/// Iterator enumerating integers of an [`AdaptiveEliasFano`] in order,
/// created by [`AdaptiveEliasFano::iter()`].
pub struct Iter<'a> {
    seq: &'a AdaptiveEliasFano,
    inner: Option<bucketed::iter::Iter<'a>>,
    chunk: usize,
    prev_upper: u64,
    pos: usize,
}

impl<'a> Iter<'a> {
    fn new(seq: &'a AdaptiveEliasFano, pos: usize) -> Self {
        Self {
            seq,
            inner: None,
            chunk: 0,
            prev_upper: 0,
            pos,
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.seq.len() <= self.pos {
            return None;
        }
        if self.inner.is_none() {
            self.chunk = self.seq.chunk_of(self.pos);
            let chunk = self.seq.chunks.get(self.chunk).unwrap();
            self.prev_upper = chunk.prev_upper;
            self.inner = Some(chunk.seq.iter(self.pos - self.seq.chunk_offset(self.chunk)));
        }
        loop {
            if let Some(val) = self.inner.as_mut().unwrap().next() {
                self.pos += 1;
                return Some(val + self.prev_upper);
            }
            self.chunk += 1;
            let chunk = self.seq.chunks.get(self.chunk).unwrap();
            self.prev_upper = chunk.prev_upper;
            self.inner = Some(chunk.seq.iter(0));
        }
    }

    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.seq.len().saturating_sub(self.pos);
        (remaining, Some(remaining))
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
    fn test_bucket_size_too_small() {
        let e = AdaptiveEliasFano::with_bucket_size(15);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("bucket_size must be no less than 16, but got 15.".to_string())
        );
    }

    #[test]
    fn test_initial_schedule() {
        let seq = AdaptiveEliasFano::new();
        assert_eq!(seq.bucket_size(), 32);
        assert_eq!(seq.threshold, 128);
        assert_eq!(seq.milestone, 2097152);
        assert_eq!(seq.msb_milestone, 21);
    }

    #[test]
    fn test_chunk_of_boundaries() {
        let seq = AdaptiveEliasFano::new();
        let n0 = seq.milestone;
        assert_eq!(seq.chunk_of(0), 0);
        assert_eq!(seq.chunk_of(n0 - 1), 0);
        assert_eq!(seq.chunk_of(n0), 0);
        assert_eq!(seq.chunk_of(n0 + 1), 1);
        assert_eq!(seq.chunk_of(2 * n0), 1);
        assert_eq!(seq.chunk_of(2 * n0 + 1), 2);
        assert_eq!(seq.chunk_of(3 * n0), 2);
        assert_eq!(seq.chunk_of(4 * n0), 2);
        assert_eq!(seq.chunk_of(4 * n0 + 1), 3);

        assert_eq!(seq.chunk_offset(0), 0);
        assert_eq!(seq.chunk_offset(1), n0 + 1);
        assert_eq!(seq.chunk_offset(2), 2 * n0 + 1);
        assert_eq!(seq.chunk_offset(3), 4 * n0 + 1);
    }

    #[test]
    fn test_grows_through_doublings() {
        // Push enough to force several in-place doublings of the bucket size.
        let vals = gen_monotone(40000, 100, 21);
        let mut seq = AdaptiveEliasFano::new();
        seq.extend(vals.iter().copied()).unwrap();

        assert_eq!(seq.len(), vals.len());
        assert!(seq.grow_steps > 0);
        for (i, &v) in vals.iter().enumerate() {
            assert_eq!(seq.get(i), Some(v), "i={i}");
        }
        assert_eq!(seq.to_vec(), vals);
    }

    #[test]
    fn test_multi_chunk() {
        // A small initial bucket size keeps the milestone low enough to
        // spill into several chunks with a modest number of values.
        let mut seq = AdaptiveEliasFano::with_bucket_size(16).unwrap();
        assert_eq!(seq.milestone, 524288);
        let vals = gen_monotone(1200000, 8, 22);
        seq.extend(vals.iter().copied()).unwrap();

        assert!(seq.chunks.len() > 1);
        assert_eq!(seq.len(), vals.len());

        let mut rng = ChaChaRng::seed_from_u64(23);
        for _ in 0..2000 {
            let i = rng.gen_range(0..vals.len());
            assert_eq!(seq.get(i), Some(vals[i]), "i={i}");
        }

        // Scans across the chunk boundary agree with the source data.
        let b = seq.milestone;
        for i in b.saturating_sub(3)..(b + 3).min(vals.len()) {
            assert_eq!(seq.get(i), Some(vals[i]), "i={i}");
        }
    }

    #[test]
    fn test_random_next_geq() {
        let vals = gen_monotone(1000000, 16, 31);
        let mut seq = AdaptiveEliasFano::with_bucket_size(16).unwrap();
        seq.extend(vals.iter().copied()).unwrap();

        let mut rng = ChaChaRng::seed_from_u64(32);
        let last = *vals.last().unwrap();
        for _ in 0..1000 {
            let x = rng.gen_range(0..=last);
            let got = seq.next_geq(x).unwrap();
            assert!(x <= got);
            let idx = seq.index_of(got).unwrap();
            assert_eq!(seq.get(idx), Some(got));
            if 0 < idx {
                assert!(seq.get(idx - 1).unwrap() < got);
            }
        }
        assert_eq!(seq.next_geq(last + 1), None);
    }

    #[test]
    fn test_sub_list() {
        let vals = gen_monotone(5000, 50, 41);
        let mut seq = AdaptiveEliasFano::new();
        seq.extend(vals.iter().copied()).unwrap();

        let sub = seq.sub_list(100..4200).unwrap();
        assert_eq!(sub.to_vec(), vals[100..4200]);

        assert!(seq.sub_list(10..5001).is_err());
        assert!(seq.sub_list(7..3).is_err());
    }

    #[test]
    fn test_clear_and_trim() {
        let vals = gen_monotone(3000, 100, 51);
        let mut seq = AdaptiveEliasFano::new();
        seq.extend(vals.iter().copied()).unwrap();

        let before = seq.bits();
        seq.trim_to_size();
        assert!(seq.bits() <= before);
        assert_eq!(seq.to_vec(), vals);

        seq.clear();
        assert!(seq.is_empty());
        assert_eq!(seq.bucket_size(), 32);
        seq.extend([1, 2, 3]).unwrap();
        assert_eq!(seq.to_vec(), vec![1, 2, 3]);
    }
}
