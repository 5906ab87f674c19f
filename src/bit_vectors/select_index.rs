//! Constant-time select structure built on the dense-array technique by Okanohara and Sadakane.
#![cfg(target_pointer_width = "64")]

use crate::bit_vectors::bit_vector::WORD_LEN;
use crate::bit_vectors::{BitVector, NumBits, Select};
use crate::broadword;

const BLOCK_LEN: usize = 1024;
const SUBBLOCK_LEN: usize = 32;
const MAX_IN_BLOCK_DISTANCE: usize = 1 << 16;

/// Constant-time select structure built on the dense-array technique by Okanohara and Sadakane.
///
/// [`SelectIndex`] freezes a [`BitVector`] and answers [`Select::select1`] in
/// constant amortized time through block and subblock inventories, falling
/// back to an explicit position list for blocks whose set bits are spread too
/// far apart.
///
/// # Examples
///
/// ```
/// use efseq::bit_vectors::{BitVector, SelectIndex, Select};
///
/// let idx = SelectIndex::build(BitVector::from_bits([true, false, false, true]));
///
/// assert_eq!(idx.num_ones(), 2);
/// assert_eq!(idx.select1(0), Some(0));
/// assert_eq!(idx.select1(1), Some(3));
/// assert_eq!(idx.select1(2), None);
/// ```
///
/// # References
///
///  - D. Okanohara, and K. Sadakane, "Practical Entropy-Compressed Rank/Select Dictionary,"
///    In ALENEX, 2007.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct SelectIndex {
    bv: BitVector,
    block_inventory: Vec<i64>,
    subblock_inventory: Vec<u16>,
    overflow_positions: Vec<usize>,
    num_ones: usize,
}

impl SelectIndex {
    /// Builds the index over the given bit vector, taking ownership of it.
    ///
    /// # Arguments
    ///
    /// - `bv`: Bit vector to be indexed.
    pub fn build(bv: BitVector) -> Self {
        let mut cur_block_positions = vec![];
        let mut block_inventory = vec![];
        let mut subblock_inventory = vec![];
        let mut overflow_positions = vec![];
        let mut num_ones = 0;

        for word_idx in 0..bv.num_words() {
            let mut cur_pos = word_idx * WORD_LEN;
            let mut cur_word = bv.words()[word_idx];

            while let Some(l) = broadword::lsb(cur_word) {
                cur_pos += l;
                cur_word >>= l;
                if cur_pos >= bv.len() {
                    break;
                }

                cur_block_positions.push(cur_pos);
                if cur_block_positions.len() == BLOCK_LEN {
                    Self::flush_cur_block(
                        &mut cur_block_positions,
                        &mut block_inventory,
                        &mut subblock_inventory,
                        &mut overflow_positions,
                    );
                }

                cur_word >>= 1;
                cur_pos += 1;
                num_ones += 1;
            }
        }

        if !cur_block_positions.is_empty() {
            Self::flush_cur_block(
                &mut cur_block_positions,
                &mut block_inventory,
                &mut subblock_inventory,
                &mut overflow_positions,
            );
        }

        block_inventory.shrink_to_fit();
        subblock_inventory.shrink_to_fit();
        overflow_positions.shrink_to_fit();

        Self {
            bv,
            block_inventory,
            subblock_inventory,
            overflow_positions,
            num_ones,
        }
    }

    fn flush_cur_block(
        cur_block_positions: &mut Vec<usize>,
        block_inventory: &mut Vec<i64>,
        subblock_inventory: &mut Vec<u16>,
        overflow_positions: &mut Vec<usize>,
    ) {
        let &first = cur_block_positions.first().unwrap();
        let &last = cur_block_positions.last().unwrap();
        if last - first < MAX_IN_BLOCK_DISTANCE {
            block_inventory.push(first as i64);
            for i in (0..cur_block_positions.len()).step_by(SUBBLOCK_LEN) {
                subblock_inventory.push((cur_block_positions[i] - first) as u16);
            }
        } else {
            block_inventory.push(-((overflow_positions.len() + 1) as i64));
            for &x in cur_block_positions.iter() {
                overflow_positions.push(x);
            }
            for _ in (0..cur_block_positions.len()).step_by(SUBBLOCK_LEN) {
                subblock_inventory.push(u16::MAX);
            }
        }
        cur_block_positions.clear();
    }

    /// Gets the number of set bits in the indexed vector.
    #[inline(always)]
    pub const fn num_ones(&self) -> usize {
        self.num_ones
    }

    /// Gets a reference to the indexed bit vector.
    pub const fn bit_vector(&self) -> &BitVector {
        &self.bv
    }

    /// Returns the number of bits of the indexed vector (including its padding).
    pub const fn len(&self) -> usize {
        self.bv.len()
    }

    /// Checks if the indexed vector is empty.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of bits of allocated backing storage,
    /// the indexed vector included.
    pub fn bits_used(&self) -> u64 {
        self.bv.bits_used()
            + (self.block_inventory.len() * 64) as u64
            + (self.subblock_inventory.len() * 16) as u64
            + (self.overflow_positions.len() * 64) as u64
    }
}

impl Select for SelectIndex {
    /// Searches the position of the `k`-th bit set, or
    /// [`None`] if `self.num_ones() <= k`.
    ///
    /// # Complexity
    ///
    /// - Constant (amortized)
    ///
    /// # Examples
    ///
    /// ```
    /// use efseq::bit_vectors::{BitVector, SelectIndex, Select};
    ///
    /// let idx = SelectIndex::build(BitVector::from_bits([false, true, true, false, true]));
    /// assert_eq!(idx.select1(0), Some(1));
    /// assert_eq!(idx.select1(2), Some(4));
    /// assert_eq!(idx.select1(3), None);
    /// ```
    fn select1(&self, k: usize) -> Option<usize> {
        if self.num_ones() <= k {
            return None;
        }

        let block = k / BLOCK_LEN;
        let block_pos = self.block_inventory[block];

        if block_pos < 0 {
            let overflow_pos = (-block_pos - 1) as usize;
            return Some(self.overflow_positions[overflow_pos + (k % BLOCK_LEN)]);
        }

        let subblock = k / SUBBLOCK_LEN;
        let mut remainder = k % SUBBLOCK_LEN;
        let start_pos = block_pos as usize + self.subblock_inventory[subblock] as usize;

        let sel = if remainder == 0 {
            start_pos
        } else {
            let mut word_idx = start_pos / WORD_LEN;
            let word_shift = start_pos % WORD_LEN;
            let mut word = self.bv.words()[word_idx] & (u64::MAX << word_shift);

            loop {
                let popcnt = broadword::popcount(word);
                if remainder < popcnt {
                    break;
                }
                remainder -= popcnt;
                word_idx += 1;
                word = self.bv.words()[word_idx];
            }

            word_idx * WORD_LEN + broadword::select_in_word(word, remainder).unwrap()
        };
        Some(sel)
    }
}

impl NumBits for SelectIndex {
    /// Returns the number of bits of the indexed vector.
    fn num_bits(&self) -> usize {
        self.bv.len()
    }

    /// Returns the number of bits set (just wrapping [`Self::num_ones()`]).
    fn num_ones(&self) -> usize {
        self.num_ones
    }
}
