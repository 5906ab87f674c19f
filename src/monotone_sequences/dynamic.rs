//! Bucketed Elias-Fano sequence supporting additions and removals through lazy per-bucket edit logs.
#![cfg(target_pointer_width = "64")]

pub mod iter;

use std::ops::Range;

use anyhow::{anyhow, Result};

use crate::broadword;
use crate::collections::ResizingVec;
use crate::int_vectors::PrefixSumVector;
use crate::monotone_sequences::bucketed::BucketedEliasFano;
use crate::monotone_sequences::MonotoneSequence;
use iter::{Iter, MergeIter};

/// Initial capacity of each edit log.
const INITIAL_LOG_CAPACITY: usize = 2;

/// Minimum bucket size for which edit logs are meaningful.
const MIN_DYNAMIC_BUCKET_SIZE: usize = 4;

/// Bucketed Elias-Fano sequence supporting additions and removals through lazy per-bucket edit logs.
///
/// The sequence starts in append-only mode, behaving like
/// [`BucketedEliasFano`]. Calling [`Self::dynamize()`] attaches a pair of
/// bounded sorted edit logs to every bucket; from then on, [`Self::add()`]
/// accepts values anywhere in the stored range and [`Self::remove()`] deletes
/// stored values. Edits accumulate in the logs and are folded into the
/// compressed representation when a log fills: the affected bucket is
/// re-encoded in place, split in two when it has grown to twice the bucket
/// size, or merged with its successor when it has shrunk to half.
///
/// Reads reconcile a bucket with its pending edits on the fly through a
/// three-way merge, with a direct offset-adjusted fast path when the edits
/// allow certifying the decoded value.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use efseq::monotone_sequences::DynamicEliasFano;
///
/// let mut seq = DynamicEliasFano::new(4)?;
/// seq.extend(0..10)?;
/// seq.dynamize()?;
///
/// seq.add(3)?;
/// assert_eq!(seq.to_vec(), vec![0, 1, 2, 3, 3, 4, 5, 6, 7, 8, 9]);
///
/// seq.remove(3)?;
/// seq.remove(0)?;
/// assert_eq!(seq.to_vec(), vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicEliasFano {
    seq: BucketedEliasFano,
    index: Option<DynamicIndex>,
    len: usize,
}

/// Edit logs and bucket-size bookkeeping attached by `dynamize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DynamicIndex {
    // One log per compressed bucket, plus one for the tail buffer.
    pub(crate) logs: Vec<EditLog>,
    // Logical (post-edit) sizes of the compressed buckets, as prefix sums.
    pub(crate) sizes: PrefixSumVector,
    max_log_len: usize,
    half_bucket: usize,
    double_bucket: usize,
}

/// Sorted bounded logs of the pending additions and deletions of one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EditLog {
    pub(crate) additions: ResizingVec<u64>,
    pub(crate) deletions: ResizingVec<u64>,
}

impl EditLog {
    fn new(max_len: usize) -> Self {
        // NOTE: max_len >= INITIAL_LOG_CAPACITY is enforced by dynamize.
        Self {
            additions: ResizingVec::with_max_capacity(INITIAL_LOG_CAPACITY, max_len).unwrap(),
            deletions: ResizingVec::with_max_capacity(INITIAL_LOG_CAPACITY, max_len).unwrap(),
        }
    }

    fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }

    // Net length change contributed by the pending edits.
    fn size_delta(&self) -> isize {
        self.additions.len() as isize - self.deletions.len() as isize
    }

    fn clear(&mut self) {
        self.additions.clear_with_capacity(INITIAL_LOG_CAPACITY);
        self.deletions.clear_with_capacity(INITIAL_LOG_CAPACITY);
    }
}

// Inserts `val` into the sorted log, after any stored duplicates.
fn insert_sorted(log: &mut ResizingVec<u64>, val: u64) -> Result<()> {
    let pos = log.as_slice().partition_point(|&x| x <= val);
    log.insert(pos, val)
}

// Number of occurrences of `val` in a sorted slice.
fn count_equal(sorted: &[u64], val: u64) -> usize {
    sorted.partition_point(|&x| x <= val) - sorted.partition_point(|&x| x < val)
}

impl DynamicEliasFano {
    /// Creates a new empty sequence in append-only mode.
    ///
    /// # Arguments
    ///
    ///  - `bucket_size`: Number of integers per compressed bucket.
    ///
    /// # Errors
    ///
    /// An error is returned if `bucket_size` is zero.
    pub fn new(bucket_size: usize) -> Result<Self> {
        Ok(Self {
            seq: BucketedEliasFano::new(bucket_size)?,
            index: None,
            len: 0,
        })
    }

    /// Creates a new empty sequence in append-only mode with space reserved
    /// for `capacity` integers.
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
        Ok(Self {
            seq: BucketedEliasFano::with_capacity(bucket_size, capacity)?,
            index: None,
            len: 0,
        })
    }

    /// Switches the sequence from append-only to edit-capable mode by
    /// attaching per-bucket edit logs. Does nothing if already dynamic.
    ///
    /// Each log holds at most about `B / (4 * log2(n))` pending edits (at
    /// least two), keeping the total log footprint within `O(B / log n)`
    /// integers per bucket.
    ///
    /// # Errors
    ///
    /// An error is returned if
    ///
    ///  - the sequence holds fewer than two integers, or
    ///  - the bucket size is too small to support edit logs.
    pub fn dynamize(&mut self) -> Result<()> {
        if self.index.is_some() {
            return Ok(());
        }
        let bucket_size = self.seq.bucket_size();
        let msb = broadword::msb(self.len as u64).unwrap_or(0);
        if msb == 0 {
            return Err(anyhow!(
                "the sequence must hold at least two integers, but got {}.",
                self.len
            ));
        }
        if bucket_size < MIN_DYNAMIC_BUCKET_SIZE {
            return Err(anyhow!(
                "bucket_size must be no less than {MIN_DYNAMIC_BUCKET_SIZE} to attach edit logs, but got {bucket_size}."
            ));
        }
        let mut cap = bucket_size / (msb * 2);
        if cap % 2 != 0 {
            cap += 1;
        }
        let max_log_len = (cap / 2).max(INITIAL_LOG_CAPACITY);
        let num_buckets = self.seq.num_buckets();
        self.index = Some(DynamicIndex {
            logs: (0..=num_buckets).map(|_| EditLog::new(max_log_len)).collect(),
            sizes: PrefixSumVector::new(bucket_size, num_buckets),
            max_log_len,
            half_bucket: bucket_size / 2,
            double_bucket: bucket_size * 2,
        });
        Ok(())
    }

    /// Checks if the sequence is in edit-capable mode.
    #[inline(always)]
    pub const fn is_dynamic(&self) -> bool {
        self.index.is_some()
    }

    /// Adds `val` to the sequence.
    ///
    /// In append-only mode this behaves like [`BucketedEliasFano::push()`].
    /// In dynamic mode `val` may fall anywhere in the stored range: it is
    /// routed to the covering bucket's addition log, and the bucket is
    /// flushed when its log fills or the tail buffer fills.
    ///
    /// # Errors
    ///
    /// An error is returned if the sequence is in append-only mode and `val`
    /// is less than the last pushed integer.
    pub fn add(&mut self, val: u64) -> Result<()> {
        if self.index.is_none() {
            self.seq.push(val)?;
            self.len += 1;
            return Ok(());
        }

        let num_buckets = self.seq.num_buckets();
        let bucket = if self.seq.last_value() <= val {
            self.seq.tail_push(val);
            num_buckets
        } else {
            let bucket = self.seq.bucket_of(val);
            let index = self.index.as_mut().unwrap();
            insert_sorted(&mut index.logs[bucket].additions, val)?;
            if bucket != num_buckets {
                index.sizes.incr(bucket)?;
            }
            bucket
        };
        self.len += 1;

        let index = self.index.as_ref().unwrap();
        let log_full = index.logs[bucket].additions.len() == index.max_log_len;
        let tail_full = self.seq.tail_len() as isize + index.logs[num_buckets].size_delta()
            == self.seq.bucket_size() as isize;
        if log_full || tail_full {
            if bucket != num_buckets {
                self.flush_bucket(bucket)?;
            } else {
                self.flush_tail()?;
            }
        }
        Ok(())
    }

    /// Appends integers at the end.
    ///
    /// # Arguments
    ///
    ///  - `vals`: Integer stream pushed through [`Self::add()`].
    ///
    /// # Errors
    ///
    /// An error is returned if the sequence is in append-only mode and
    /// `vals` breaks the monotone order.
    pub fn extend<I>(&mut self, vals: I) -> Result<()>
    where
        I: IntoIterator<Item = u64>,
    {
        for x in vals {
            self.add(x)?;
        }
        Ok(())
    }

    /// Removes one occurrence of `val` from the sequence.
    ///
    /// The value is expected to be stored (or pending in an addition log);
    /// the removal is recorded in the covering bucket's deletion log and
    /// folded in when the log fills.
    ///
    /// # Errors
    ///
    /// An error is returned if
    ///
    ///  - the sequence is still in append-only mode, or
    ///  - the sequence is empty.
    pub fn remove(&mut self, val: u64) -> Result<()> {
        if self.index.is_none() {
            return Err(anyhow!("remove is supported only after dynamize()."));
        }
        if self.len == 0 {
            return Err(anyhow!("the sequence must not be empty."));
        }

        if val == self.seq.last_value() && 0 < self.seq.tail_len() {
            self.seq.tail_pop();
            self.len -= 1;
            return Ok(());
        }

        let num_buckets = self.seq.num_buckets();
        let mut bucket = self.seq.bucket_of(val);
        // A stale upper bound can route a boundary duplicate one bucket
        // early; advance to the bucket logically holding the value.
        while bucket < num_buckets && !self.bucket_contains(bucket, val) {
            let next_base = if bucket + 1 < num_buckets {
                self.seq.bucket_base(bucket + 1)
            } else {
                self.seq.tail_base()
            };
            if val < next_base {
                break;
            }
            bucket += 1;
        }
        let index = self.index.as_mut().unwrap();
        insert_sorted(&mut index.logs[bucket].deletions, val)?;
        if bucket != num_buckets {
            index.sizes.decr(bucket)?;
        }
        self.len -= 1;

        if index.logs[bucket].deletions.len() == index.max_log_len {
            if bucket != num_buckets {
                self.flush_bucket(bucket)?;
            } else {
                self.flush_tail()?;
            }
        }
        Ok(())
    }

    /// Returns the `pos`-th smallest integer, or [`None`] if out of bounds.
    ///
    /// # Complexity
    ///
    /// Constant when the covering bucket has no pending edits or the fast
    /// path can certify the decoded value; otherwise one bucket is scanned
    /// through the merge iterator.
    pub fn get(&self, pos: usize) -> Option<u64> {
        if self.len <= pos {
            return None;
        }
        let Some(index) = self.index.as_ref() else {
            return self.seq.get(pos);
        };

        let (bucket, start) = self.locate_bucket(index, pos);
        let pos_in_bucket = pos - start;
        let num_buckets = self.seq.num_buckets();

        if index.logs[bucket].is_empty() {
            return if bucket == num_buckets {
                self.seq.tail_get(pos_in_bucket)
            } else {
                self.seq.get_in_bucket(bucket, pos_in_bucket)
            };
        }
        if bucket < num_buckets {
            if let Some(val) = self.certified_get(index, bucket, pos_in_bucket) {
                return Some(val);
            }
        }
        MergeIter::for_bucket(&self.seq, index, bucket).nth(pos_in_bucket)
    }

    // Finds the bucket covering logical position `pos` and the logical
    // position at which the bucket starts. Positions past the compressed
    // buckets fall into the tail.
    fn locate_bucket(&self, index: &DynamicIndex, pos: usize) -> (usize, usize) {
        let num_buckets = self.seq.num_buckets();
        let total = if 0 < num_buckets {
            index.sizes.get(num_buckets - 1).unwrap()
        } else {
            0
        };
        if total <= pos {
            return (num_buckets, total);
        }
        let (mut lo, mut hi) = (0, num_buckets - 1);
        while lo < hi {
            let mid = (lo + hi) / 2;
            if index.sizes.get(mid).unwrap() <= pos {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let start = if 0 < lo {
            index.sizes.get(lo - 1).unwrap()
        } else {
            0
        };
        (lo, start)
    }

    // Checks whether the logical content of the compressed bucket `bucket`
    // still holds `val`, reconciling the pending edit logs.
    fn bucket_contains(&self, bucket: usize, val: u64) -> bool {
        let index = self.index.as_ref().unwrap();
        let log = &index.logs[bucket];
        let adds_eq = count_equal(log.additions.as_slice(), val);
        let dels_eq = count_equal(log.deletions.as_slice(), val);

        let physical = self.seq.bucket_len(bucket);
        let (mut lo, mut hi) = (0, physical);
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.seq.get_in_bucket(bucket, mid).map_or(false, |x| x < val) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let mut stored_eq = 0;
        while lo + stored_eq < physical
            && self.seq.get_in_bucket(bucket, lo + stored_eq) == Some(val)
        {
            stored_eq += 1;
        }
        dels_eq < stored_eq + adds_eq
    }

    // Fast-path read: converges on the physical offset whose logical rank
    // matches `pos`, certifying that no pending edit equals the decoded
    // value. Returns [`None`] when certification fails and the caller must
    // fall back to the merge iterator.
    fn certified_get(&self, index: &DynamicIndex, bucket: usize, pos: usize) -> Option<u64> {
        let log = &index.logs[bucket];
        let additions = log.additions.as_slice();
        let deletions = log.deletions.as_slice();
        let physical = self.seq.bucket_len(bucket);

        let mut cur = pos;
        for _ in 0..8 {
            if physical <= cur {
                return None;
            }
            let val = self.seq.get_in_bucket(bucket, cur)?;
            let before_adds = additions.partition_point(|&x| x < val);
            let before_dels = deletions.partition_point(|&x| x <= val);
            if before_adds < additions.len() && additions[before_adds] == val {
                return None;
            }
            if 0 < before_dels && deletions[before_dels - 1] == val {
                return None;
            }
            let shifted = pos as isize - before_adds as isize + before_dels as isize;
            if shifted < 0 {
                return None;
            }
            if shifted as usize == cur {
                return Some(val);
            }
            cur = shifted as usize;
        }
        None
    }

    /// Returns the smallest stored value that is no less than `val`, or
    /// [`None`] if no such value exists.
    pub fn next_geq(&self, val: u64) -> Option<u64> {
        let Some(index) = self.index.as_ref() else {
            return self.seq.next_geq(val);
        };
        if self.len == 0 {
            return None;
        }
        let bucket = self.seq.bucket_of(val);
        MergeIter::for_bucket(&self.seq, index, bucket).find(|&v| val <= v)
    }

    /// Creates an iterator enumerating integers from position `pos`.
    ///
    /// In dynamic mode pending edits are reconciled on the fly, so the
    /// iterator always yields the logical sequence in sorted order.
    pub fn iter(&self, pos: usize) -> Iter {
        let remaining = self.len.saturating_sub(pos);
        let Some(index) = self.index.as_ref() else {
            return Iter::appending(self.seq.iter(pos), remaining);
        };
        let (bucket, start) = self.locate_bucket(index, pos);
        let mut inner = MergeIter::for_bucket(&self.seq, index, bucket);
        for _ in 0..pos - start {
            inner.next();
        }
        Iter::edited(inner, remaining)
    }

    /// Returns the integers as a vector.
    pub fn to_vec(&self) -> Vec<u64> {
        self.iter(0).collect()
    }

    /// Builds a new sequence holding the integers of the given range.
    ///
    /// The result is in append-only mode with a bucket size tuned to the
    /// range length, i.e., `sqrt(8 * range.len())`.
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
        let bucket_size = (((range.len() * 8) as f64).sqrt() as usize).max(1);
        let mut sub = Self::new(bucket_size)?;
        for v in self.iter(range.start).take(range.len()) {
            sub.add(v)?;
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
        self.seq.bucket_size()
    }

    /// Returns the total number of bits of allocated internal storage.
    pub fn bits(&self) -> u64 {
        let mut bits = self.seq.bits();
        if let Some(index) = self.index.as_ref() {
            for log in &index.logs {
                bits += ((log.additions.len() + log.deletions.len()) * 64) as u64;
            }
            bits += index.sizes.bits_used();
        }
        bits
    }

    /// Removes all integers and detaches the edit logs, returning the
    /// sequence to append-only mode.
    pub fn clear(&mut self) {
        self.seq.clear();
        self.index = None;
        self.len = 0;
    }

    /// Reduces the backing capacities to the current number of elements.
    pub fn trim_to_size(&mut self) {
        self.seq.trim_to_size();
        if let Some(index) = self.index.as_mut() {
            for log in index.logs.iter_mut() {
                log.additions.trim_to_size();
                log.deletions.trim_to_size();
            }
            index.logs.shrink_to_fit();
            index.sizes.trim_to_size();
        }
    }

    // Collects the first `count` logical values starting at `bucket`.
    fn fuse(&self, bucket: usize, count: usize) -> Vec<u64> {
        let index = self.index.as_ref().unwrap();
        MergeIter::for_bucket(&self.seq, index, bucket)
            .take(count)
            .collect()
    }

    // Logical length of the tail: buffered values plus pending tail edits.
    fn tail_logical_len(&self) -> usize {
        let index = self.index.as_ref().unwrap();
        let len =
            self.seq.tail_len() as isize + index.logs[self.seq.num_buckets()].size_delta();
        debug_assert!(0 <= len);
        len.max(0) as usize
    }

    // Folds the pending edits of the compressed bucket `bucket` into its
    // encoded form: the bucket is split when it has grown to twice the
    // bucket size, merged with its successor when it has shrunk to half and
    // the combined length stays under twice the bucket size, and re-encoded
    // in place otherwise.
    fn flush_bucket(&mut self, bucket: usize) -> Result<()> {
        let index = self.index.as_ref().unwrap();
        let (max_log_len, half_bucket, double_bucket) = (
            index.max_log_len,
            index.half_bucket,
            index.double_bucket,
        );
        let new_len = index.sizes.get_int(bucket).unwrap();
        let fused = self.fuse(bucket, new_len);
        let bucket_size = self.seq.bucket_size();
        let num_buckets = self.seq.num_buckets();

        if double_bucket <= new_len {
            self.seq.split_bucket(bucket, &fused, bucket_size);
            let index = self.index.as_mut().unwrap();
            index.sizes.set_int(bucket, bucket_size)?;
            index.sizes.add_int(bucket + 1, new_len - bucket_size)?;
            index.logs.insert(bucket + 1, EditLog::new(max_log_len));
        } else if new_len <= half_bucket {
            let next_len = if bucket + 1 < num_buckets {
                self.index.as_ref().unwrap().sizes.get_int(bucket + 1).unwrap()
            } else {
                self.tail_logical_len()
            };
            if 0 < next_len && new_len + next_len < double_bucket {
                let mut merged = fused;
                merged.extend(self.fuse(bucket + 1, next_len));
                self.seq.replace_bucket(bucket, &merged);
                let index = self.index.as_mut().unwrap();
                index.sizes.set_int(bucket, merged.len())?;
                if bucket + 1 < num_buckets {
                    self.seq.remove_bucket(bucket + 1);
                    let index = self.index.as_mut().unwrap();
                    index.sizes.remove_int(bucket + 1)?;
                    index.logs.remove(bucket + 1);
                } else {
                    self.seq.clear_tail();
                    self.seq.raise_trailing_upper(*merged.last().unwrap());
                    self.index.as_mut().unwrap().logs[num_buckets].clear();
                }
            } else if new_len == 0 {
                // The bucket emptied out with nothing to absorb.
                self.seq.remove_bucket(bucket);
                let index = self.index.as_mut().unwrap();
                index.sizes.remove_int(bucket)?;
                index.logs.remove(bucket);
                return Ok(());
            } else {
                self.seq.replace_bucket(bucket, &fused);
                self.index.as_mut().unwrap().sizes.set_int(bucket, new_len)?;
            }
        } else {
            self.seq.replace_bucket(bucket, &fused);
            self.index.as_mut().unwrap().sizes.set_int(bucket, new_len)?;
        }
        self.index.as_mut().unwrap().logs[bucket].clear();
        Ok(())
    }

    // Folds the pending tail edits into the tail buffer, compressing it
    // into a new bucket when it reaches exactly the bucket size.
    fn flush_tail(&mut self) -> Result<()> {
        let num_buckets = self.seq.num_buckets();
        let new_len = self.tail_logical_len();
        let fused = self.fuse(num_buckets, new_len);
        if new_len == self.seq.bucket_size() {
            let index = self.index.as_mut().unwrap();
            index.sizes.push_int(new_len)?;
            let max_log_len = index.max_log_len;
            self.seq.set_tail(fused);
            self.seq.compress_tail();
            let index = self.index.as_mut().unwrap();
            // The old tail log becomes the log of the new compressed bucket.
            index.logs[num_buckets].clear();
            index.logs.push(EditLog::new(max_log_len));
        } else {
            self.seq.set_tail(fused);
            self.index.as_mut().unwrap().logs[num_buckets].clear();
        }
        Ok(())
    }
}

impl MonotoneSequence for DynamicEliasFano {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, pos: usize) -> Option<u64> {
        DynamicEliasFano::get(self, pos)
    }

    fn next_geq(&self, val: u64) -> Option<u64> {
        DynamicEliasFano::next_geq(self, val)
    }

    fn bits(&self) -> u64 {
        DynamicEliasFano::bits(self)
    }

    fn clear(&mut self) {
        DynamicEliasFano::clear(self)
    }

    fn trim_to_size(&mut self) {
        DynamicEliasFano::trim_to_size(self)
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
    fn test_remove_before_dynamize() {
        let mut seq = DynamicEliasFano::new(4).unwrap();
        seq.extend(0..10).unwrap();
        let e = seq.remove(3);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("remove is supported only after dynamize().".to_string())
        );
    }

    #[test]
    fn test_dynamize_too_short() {
        let mut seq = DynamicEliasFano::new(4).unwrap();
        seq.add(7).unwrap();
        let e = seq.dynamize();
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("the sequence must hold at least two integers, but got 1.".to_string())
        );
    }

    #[test]
    fn test_dynamize_bucket_too_small() {
        let mut seq = DynamicEliasFano::new(2).unwrap();
        seq.extend(0..10).unwrap();
        let e = seq.dynamize();
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("bucket_size must be no less than 4 to attach edit logs, but got 2.".to_string())
        );
    }

    #[test]
    fn test_walkthrough() {
        let mut seq = DynamicEliasFano::new(4).unwrap();
        seq.extend(0..10).unwrap();
        seq.dynamize().unwrap();
        assert!(seq.is_dynamic());

        seq.add(3).unwrap();
        assert_eq!(seq.len(), 11);
        assert_eq!(seq.to_vec(), vec![0, 1, 2, 3, 3, 4, 5, 6, 7, 8, 9]);
        for (i, &v) in [0, 1, 2, 3, 3, 4, 5, 6, 7, 8, 9].iter().enumerate() {
            assert_eq!(seq.get(i), Some(v), "i={i}");
        }

        seq.remove(3).unwrap();
        assert_eq!(seq.to_vec(), vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);

        seq.remove(0).unwrap();
        assert_eq!(seq.to_vec(), vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        for (i, &v) in [1, 2, 3, 4, 5, 6, 7, 8, 9].iter().enumerate() {
            assert_eq!(seq.get(i), Some(v), "i={i}");
        }
        assert_eq!(seq.next_geq(0), Some(1));
        assert_eq!(seq.next_geq(4), Some(4));
        assert_eq!(seq.next_geq(10), None);
    }

    #[test]
    fn test_dynamize_preserves_reads() {
        let vals = gen_monotone(5000, 200, 61);
        let bucket_size = ((vals.len() * 8) as f64).sqrt() as usize;
        let mut seq = DynamicEliasFano::new(bucket_size).unwrap();
        seq.extend(vals.iter().copied()).unwrap();

        let mut rng = ChaChaRng::seed_from_u64(62);
        let queries: Vec<u64> = (0..300).map(|_| rng.gen_range(0..=*vals.last().unwrap())).collect();
        let before_gets: Vec<_> = (0..vals.len()).map(|i| seq.get(i)).collect();
        let before_geqs: Vec<_> = queries.iter().map(|&x| seq.next_geq(x)).collect();

        seq.dynamize().unwrap();

        let after_gets: Vec<_> = (0..vals.len()).map(|i| seq.get(i)).collect();
        let after_geqs: Vec<_> = queries.iter().map(|&x| seq.next_geq(x)).collect();
        assert_eq!(before_gets, after_gets);
        assert_eq!(before_geqs, after_geqs);
        assert_eq!(seq.to_vec(), vals);
    }

    #[test]
    fn test_mixed_edits_sorted_enumeration() {
        let vals = gen_monotone(2000, 50, 71);
        let mut seq = DynamicEliasFano::new(127).unwrap();
        seq.extend(vals.iter().copied()).unwrap();
        seq.dynamize().unwrap();

        let mut model = vals.clone();
        let mut rng = ChaChaRng::seed_from_u64(72);
        for _ in 0..600 {
            if rng.gen_bool(0.6) || model.is_empty() {
                let v = rng.gen_range(0..=*model.last().unwrap_or(&100) + 50);
                let pos = model.partition_point(|&x| x <= v);
                model.insert(pos, v);
                seq.add(v).unwrap();
            } else {
                let i = rng.gen_range(0..model.len());
                let v = model.remove(i);
                seq.remove(v).unwrap();
            }
            assert_eq!(seq.len(), model.len());
        }
        assert_eq!(seq.to_vec(), model);
        for (i, &v) in model.iter().enumerate() {
            assert_eq!(seq.get(i), Some(v), "i={i}");
        }
    }

    #[test]
    fn test_add_then_remove_restores() {
        let vals = gen_monotone(20000, 2000, 81);
        let bucket_size = ((vals.len() * 8) as f64).sqrt() as usize;
        let mut seq = DynamicEliasFano::with_capacity(bucket_size, vals.len()).unwrap();
        seq.extend(vals.iter().copied()).unwrap();
        seq.dynamize().unwrap();

        let n = vals.len() / 10;
        let mut rng = ChaChaRng::seed_from_u64(82);
        let extra: Vec<u64> = (0..n)
            .map(|_| rng.gen_range(0..*vals.last().unwrap() + n as u64))
            .collect();

        for &v in &extra {
            seq.add(v).unwrap();
        }
        assert_eq!(seq.len(), vals.len() + n);

        for &v in &extra {
            seq.remove(v).unwrap();
        }
        assert_eq!(seq.len(), vals.len());
        assert_eq!(seq.to_vec(), vals);
        for (i, &v) in vals.iter().enumerate() {
            assert_eq!(seq.get(i), Some(v), "i={i}");
        }
    }

    #[test]
    fn test_next_geq_after_edits() {
        let vals = gen_monotone(3000, 30, 91);
        let mut seq = DynamicEliasFano::new(155).unwrap();
        seq.extend(vals.iter().copied()).unwrap();
        seq.dynamize().unwrap();

        let mut model = vals.clone();
        let mut rng = ChaChaRng::seed_from_u64(92);
        for _ in 0..400 {
            let v = rng.gen_range(0..=*model.last().unwrap());
            let pos = model.partition_point(|&x| x <= v);
            model.insert(pos, v);
            seq.add(v).unwrap();
        }
        for _ in 0..200 {
            let i = rng.gen_range(0..model.len());
            let v = model.remove(i);
            seq.remove(v).unwrap();
        }

        for _ in 0..400 {
            let x = rng.gen_range(0..=*model.last().unwrap() + 5);
            let expected = model.iter().copied().find(|&v| x <= v);
            assert_eq!(seq.next_geq(x), expected, "x={x}");
        }
    }

    #[test]
    fn test_split_and_merge() {
        let mut seq = DynamicEliasFano::new(16).unwrap();
        let mut model: Vec<u64> = (0..256).map(|i| i * 3).collect();
        seq.extend(model.iter().copied()).unwrap();
        seq.dynamize().unwrap();

        // Concentrated additions grow one bucket until it splits, twice over.
        for _ in 0..40 {
            let pos = model.partition_point(|&x| x <= 301);
            model.insert(pos, 301);
            seq.add(301).unwrap();
        }
        assert_eq!(seq.len(), model.len());
        assert_eq!(seq.to_vec(), model);
        for (i, &v) in model.iter().enumerate() {
            assert_eq!(seq.get(i), Some(v), "i={i}");
        }

        // Removing them again, together with the surrounding originals,
        // shrinks the split buckets until they merge back.
        for _ in 0..40 {
            let pos = model.partition_point(|&x| x < 301);
            model.remove(pos);
            seq.remove(301).unwrap();
        }
        for v in (288..=333).step_by(3) {
            let pos = model.partition_point(|&x| x < v);
            model.remove(pos);
            seq.remove(v).unwrap();
        }
        assert_eq!(seq.len(), model.len());
        assert_eq!(seq.to_vec(), model);
        for (i, &v) in model.iter().enumerate() {
            assert_eq!(seq.get(i), Some(v), "i={i}");
        }
    }

    #[test]
    fn test_drain_last_bucket() {
        let mut seq = DynamicEliasFano::new(8).unwrap();
        let mut model: Vec<u64> = (0..16).map(|i| i * 5).collect();
        seq.extend(model.iter().copied()).unwrap();
        seq.dynamize().unwrap();

        // Empty out the last bucket entirely, then shrink the first one.
        for k in (8..16u64).rev() {
            let v = k * 5;
            let pos = model.partition_point(|&x| x < v);
            model.remove(pos);
            seq.remove(v).unwrap();
        }
        assert_eq!(seq.to_vec(), model);

        for v in [0, 10, 20, 30] {
            let pos = model.partition_point(|&x| x < v);
            model.remove(pos);
            seq.remove(v).unwrap();
        }
        assert_eq!(seq.to_vec(), model);
        for (i, &v) in model.iter().enumerate() {
            assert_eq!(seq.get(i), Some(v), "i={i}");
        }
        assert_eq!(seq.next_geq(0), Some(5));
        assert_eq!(seq.next_geq(16), Some(25));
        assert_eq!(seq.next_geq(36), None);
    }

    #[test]
    fn test_clone_independence() {
        let mut seq = DynamicEliasFano::new(8).unwrap();
        seq.extend(0..64).unwrap();
        seq.dynamize().unwrap();

        let copy = seq.clone();
        seq.add(10).unwrap();
        seq.remove(20).unwrap();

        assert_eq!(copy.len(), 64);
        assert_eq!(copy.to_vec(), (0..64).collect::<Vec<u64>>());
    }

    #[test]
    fn test_sub_list() {
        let vals = gen_monotone(4000, 40, 95);
        let mut seq = DynamicEliasFano::new(178).unwrap();
        seq.extend(vals.iter().copied()).unwrap();
        seq.dynamize().unwrap();
        seq.add(vals[17]).unwrap();
        seq.remove(vals[1000]).unwrap();

        let model = seq.to_vec();
        let sub = seq.sub_list(10..2500).unwrap();
        assert_eq!(sub.to_vec(), model[10..2500]);
        assert!(seq.sub_list(0..model.len() + 1).is_err());
    }

    #[test]
    fn test_bits_and_trim() {
        let vals = gen_monotone(3000, 100, 97);
        let mut seq = DynamicEliasFano::new(155).unwrap();
        seq.extend(vals.iter().copied()).unwrap();
        seq.dynamize().unwrap();
        seq.add(vals[5]).unwrap();

        let before = seq.bits();
        seq.trim_to_size();
        assert!(seq.bits() <= before);
        seq.clear();
        assert!(seq.is_empty());
        assert!(!seq.is_dynamic());
    }
}
