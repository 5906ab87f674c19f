//! Iterators on the bucketed Elias-Fano sequence.
#![cfg(target_pointer_width = "64")]

use std::ops::Range;

use crate::bit_vectors::bit_vector::unary::UnaryIter;
use crate::bit_vectors::Select;
use crate::monotone_sequences::bucket::{self, EncodedBucket};
use crate::monotone_sequences::bucketed::BucketedEliasFano;

/// Iterator decoding one bucket of a [`BucketedEliasFano`], created by
/// `BucketedEliasFano::bucket_iter`.
///
/// The decoder keeps a running next-one cursor over the upper-part bitmap,
/// so enumerating a whole bucket costs amortized constant time per value.
/// The tail buffer is addressed as the bucket past the compressed ones.
pub(crate) struct BucketIter<'a> {
    seq: &'a BucketedEliasFano,
    encoded: Option<&'a EncodedBucket>,
    unary: Option<UnaryIter<'a>>,
    offset: usize,
    end: usize,
    prev_upper: u64,
    low_len: usize,
}

impl<'a> BucketIter<'a> {
    /// Creates an iterator decoding positions `offsets` of bucket `bucket`.
    pub(crate) fn new(seq: &'a BucketedEliasFano, bucket: usize, offsets: Range<usize>) -> Self {
        let (start, mut end) = (offsets.start, offsets.end);
        end = end.min(seq.bucket_len(bucket));

        if seq.num_buckets() <= bucket {
            return Self {
                seq,
                encoded: None,
                unary: None,
                offset: start,
                end,
                prev_upper: 0,
                low_len: 0,
            };
        }

        let encoded = seq.buckets.get(bucket).unwrap();
        let info = *seq.info.get(bucket).unwrap();
        let unary = encoded
            .high_bits()
            .select1(start)
            .filter(|_| start < end)
            .map(|pos| encoded.high_bits().bit_vector().unary_iter(pos));
        Self {
            seq,
            encoded: Some(encoded),
            unary,
            offset: start,
            end,
            prev_upper: bucket::info_upper(info),
            low_len: bucket::info_width(info),
        }
    }
}

impl Iterator for BucketIter<'_> {
    type Item = u64;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.end <= self.offset {
            return None;
        }
        let Some(encoded) = self.encoded else {
            let val = self.seq.tail_get(self.offset);
            self.offset += 1;
            return val;
        };
        let pos = self.unary.as_mut()?.next()?;
        let high = (pos - self.offset) as u64;
        let low = encoded.low_bits().get_int(self.offset).unwrap();
        self.offset += 1;
        Some(((high << self.low_len) | low) + self.prev_upper)
    }
}

/// Iterator enumerating integers of a [`BucketedEliasFano`] in order,
/// created by [`BucketedEliasFano::iter()`].
pub struct Iter<'a> {
    seq: &'a BucketedEliasFano,
    inner: Option<BucketIter<'a>>,
    bucket: usize,
    pos: usize,
}

impl<'a> Iter<'a> {
    /// Creates an iterator enumerating integers from position `pos`.
    pub(crate) fn new(seq: &'a BucketedEliasFano, pos: usize) -> Self {
        Self {
            seq,
            inner: None,
            bucket: pos / seq.bucket_size(),
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
            let offset = self.pos % self.seq.bucket_size();
            self.inner = Some(self.seq.bucket_iter(
                self.bucket,
                offset..self.seq.bucket_size(),
            ));
        }
        loop {
            if let Some(val) = self.inner.as_mut().unwrap().next() {
                self.pos += 1;
                return Some(val);
            }
            self.bucket += 1;
            self.inner = Some(
                self.seq
                    .bucket_iter(self.bucket, 0..self.seq.bucket_size()),
            );
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

    #[test]
    fn test_iter_across_buckets() {
        let mut seq = BucketedEliasFano::new(3).unwrap();
        seq.extend([2, 3, 5, 8, 13, 21, 34, 55]).unwrap();
        let got: Vec<u64> = seq.iter(0).collect();
        assert_eq!(got, vec![2, 3, 5, 8, 13, 21, 34, 55]);
    }

    #[test]
    fn test_iter_from_every_position() {
        let vals: Vec<u64> = (0..40).map(|i| i * 3 + 1).collect();
        let mut seq = BucketedEliasFano::new(7).unwrap();
        seq.extend(vals.iter().copied()).unwrap();
        for k in 0..=vals.len() {
            let got: Vec<u64> = seq.iter(k).collect();
            assert_eq!(got, vals[k..], "k={k}");
        }
    }

    #[test]
    fn test_bucket_iter_limits() {
        let mut seq = BucketedEliasFano::new(4).unwrap();
        seq.extend([1, 2, 3, 4, 10, 20, 30, 40, 100, 200]).unwrap();

        let got: Vec<u64> = seq.bucket_iter(1, 0..4).collect();
        assert_eq!(got, vec![10, 20, 30, 40]);

        let got: Vec<u64> = seq.bucket_iter(1, 1..3).collect();
        assert_eq!(got, vec![20, 30]);

        // The tail buffer is the bucket past the compressed ones.
        let got: Vec<u64> = seq.bucket_iter(2, 0..4).collect();
        assert_eq!(got, vec![100, 200]);
    }
}
