//! Unary iterator on bit vectors.
use super::WORD_LEN;
use crate::bit_vectors::BitVector;
use crate::broadword;

/// Iterator for enumerating positions of set bits, created by [`BitVector::unary_iter`].
///
/// The iterator keeps a one-word buffer so that consecutive positions are
/// decoded without rescanning the vector, which makes it suitable as a running
/// next-one cursor when decoding unary gap codes.
pub struct UnaryIter<'a> {
    bv: &'a BitVector,
    pos: usize,
    buf: u64,
}

impl<'a> UnaryIter<'a> {
    /// Creates the iterator from the given bit position.
    pub fn new(bv: &'a BitVector, pos: usize) -> Self {
        let buf = if pos / WORD_LEN < bv.num_words() {
            bv.words()[pos / WORD_LEN] & (u64::MAX.wrapping_shl((pos % WORD_LEN) as u32))
        } else {
            0
        };
        Self { bv, pos, buf }
    }

    /// Gets the current bit position.
    #[inline(always)]
    pub const fn position(&self) -> usize {
        self.pos
    }
}

impl Iterator for UnaryIter<'_> {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = self.buf;
        while buf == 0 {
            self.pos += WORD_LEN;
            let word_pos = self.pos / WORD_LEN;
            if self.bv.num_words() <= word_pos {
                return None;
            }
            buf = self.bv.words()[word_pos];
        }
        let pos_in_word = broadword::lsb(buf).unwrap();
        self.buf = buf & (buf - 1); // clear LSB
        self.pos = (self.pos & !(WORD_LEN - 1)) + pos_in_word;
        Some(self.pos).filter(|&x| x < self.bv.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    #[test]
    fn test_sparse() {
        let bv = BitVector::from_bits((0..256).map(|i| i % 67 == 3));
        let expected: Vec<usize> = (0..256).filter(|&i| i % 67 == 3).collect();
        let got: Vec<usize> = bv.unary_iter(0).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_random_starts() {
        let mut rng = ChaChaRng::seed_from_u64(7);
        let bits: Vec<bool> = (0..2000).map(|_| rng.gen_bool(0.1)).collect();
        let bv = BitVector::from_bits(bits.iter().cloned());
        for _ in 0..50 {
            let start = rng.gen_range(0..bits.len());
            let expected: Vec<usize> = (start..bits.len()).filter(|&i| bits[i]).collect();
            let got: Vec<usize> = bv.unary_iter(start).collect();
            assert_eq!(got, expected);
        }
    }
}
