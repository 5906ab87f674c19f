//! Iterators on the dynamic Elias-Fano sequence.
#![cfg(target_pointer_width = "64")]

use crate::monotone_sequences::bucketed::iter::BucketIter;
use crate::monotone_sequences::bucketed::{self, BucketedEliasFano};
use crate::monotone_sequences::dynamic::DynamicIndex;

// Sentinel for an exhausted cursor; stored values are below 2^58.
const EXHAUSTED: u64 = u64::MAX;

/// Three-way merge iterator fusing a compressed bucket with its pending
/// additions and deletions, advancing to the next bucket when all three
/// cursors are exhausted.
///
/// The merge emits the smallest head among the bucket cursor `a`, the
/// addition cursor and the deletion cursor: equal additions win over `a` (a
/// value may be added more than once), a deletion equal to an addition
/// cancels that addition, and a deletion equal to `a` cancels the bucket
/// value.
pub(crate) struct MergeIter<'a> {
    seq: &'a BucketedEliasFano,
    index: &'a DynamicIndex,
    bucket: usize,
    bucket_it: BucketIter<'a>,
    add_pos: usize,
    del_pos: usize,
    head: u64,
    add_head: u64,
    del_head: u64,
}

impl<'a> MergeIter<'a> {
    /// Creates the merge iterator positioned at the start of `bucket`,
    /// where the tail buffer counts as the bucket past the compressed ones.
    pub(crate) fn for_bucket(
        seq: &'a BucketedEliasFano,
        index: &'a DynamicIndex,
        bucket: usize,
    ) -> Self {
        let mut it = Self {
            seq,
            index,
            bucket,
            bucket_it: seq.bucket_iter(bucket, 0..0),
            add_pos: 0,
            del_pos: 0,
            head: EXHAUSTED,
            add_head: EXHAUSTED,
            del_head: EXHAUSTED,
        };
        it.load_bucket(bucket);
        it
    }

    fn load_bucket(&mut self, bucket: usize) {
        self.bucket = bucket;
        let physical = self.seq.bucket_len(bucket);
        self.bucket_it = self.seq.bucket_iter(bucket, 0..physical);
        self.add_pos = 0;
        self.del_pos = 0;
        self.head = self.bucket_it.next().unwrap_or(EXHAUSTED);
        self.add_head = self.addition(0);
        self.del_head = self.deletion(0);
    }

    fn addition(&self, pos: usize) -> u64 {
        self.index.logs[self.bucket]
            .additions
            .get(pos)
            .copied()
            .unwrap_or(EXHAUSTED)
    }

    fn deletion(&self, pos: usize) -> u64 {
        self.index.logs[self.bucket]
            .deletions
            .get(pos)
            .copied()
            .unwrap_or(EXHAUSTED)
    }
}

impl Iterator for MergeIter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.head == EXHAUSTED
                && self.add_head == EXHAUSTED
                && self.del_head == EXHAUSTED
            {
                if self.bucket < self.seq.num_buckets() {
                    let next = self.bucket + 1;
                    self.load_bucket(next);
                    continue;
                }
                return None;
            }
            if self.head < self.add_head && self.head < self.del_head {
                let val = self.head;
                self.head = self.bucket_it.next().unwrap_or(EXHAUSTED);
                return Some(val);
            } else if self.add_head <= self.head && self.add_head < self.del_head {
                // <= so that a value added more than once is emitted each time
                let val = self.add_head;
                self.add_pos += 1;
                self.add_head = self.addition(self.add_pos);
                return Some(val);
            } else if self.add_head == self.del_head {
                // the deletion cancels one matching pending addition
                self.add_pos += 1;
                self.add_head = self.addition(self.add_pos);
                self.del_pos += 1;
                self.del_head = self.deletion(self.del_pos);
            } else if self.del_head == self.head {
                // the deletion cancels the current bucket value
                self.head = self.bucket_it.next().unwrap_or(EXHAUSTED);
                self.del_pos += 1;
                self.del_head = self.deletion(self.del_pos);
            } else {
                // no match in this bucket, drop the deletion
                self.del_pos += 1;
                self.del_head = self.deletion(self.del_pos);
            }
        }
    }
}

/// Iterator enumerating integers of a
/// [`DynamicEliasFano`](crate::monotone_sequences::DynamicEliasFano)
/// in order, created by its `iter` method.
pub struct Iter<'a> {
    inner: IterInner<'a>,
    remaining: usize,
}

enum IterInner<'a> {
    Appending(bucketed::iter::Iter<'a>),
    Edited(MergeIter<'a>),
}

impl<'a> Iter<'a> {
    pub(crate) fn appending(it: bucketed::iter::Iter<'a>, remaining: usize) -> Self {
        Self {
            inner: IterInner::Appending(it),
            remaining,
        }
    }

    pub(crate) fn edited(it: MergeIter<'a>, remaining: usize) -> Self {
        Self {
            inner: IterInner::Edited(it),
            remaining,
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let val = match &mut self.inner {
            IterInner::Appending(it) => it.next(),
            IterInner::Edited(it) => it.next(),
        }?;
        self.remaining -= 1;
        Some(val)
    }

    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}
