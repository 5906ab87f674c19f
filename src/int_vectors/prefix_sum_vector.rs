//! Updatable array of non-negative increments stored in prefix-sum form.

use anyhow::{anyhow, Result};

use crate::collections::ResizingVec;

/// Updatable array of non-negative increments stored in prefix-sum form.
///
/// The vector stores increments $`d_0, d_1, \dots, d_{n-1}`$ as the sums
/// $`s_i = d_0 + \dots + d_i`$, so both a cumulative sum and a single
/// increment are retrieved in constant time, while a point update shifts all
/// later sums by the change. This is the index translating logical positions
/// into buckets in the dynamic Elias-Fano sequence.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use efseq::int_vectors::PrefixSumVector;
///
/// let mut psv = PrefixSumVector::new(10, 3);
/// assert_eq!(psv.to_vec(), vec![10, 20, 30]);
///
/// psv.incr(1)?;
/// assert_eq!(psv.get_int(1), Some(11));
/// assert_eq!(psv.to_vec(), vec![10, 21, 31]);
/// # Ok(())
/// # }
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct PrefixSumVector {
    sums: ResizingVec<usize>,
}

impl PrefixSumVector {
    /// Creates a new vector of `len` increments, each initialized by `init_value`.
    ///
    /// # Arguments
    ///
    ///  - `init_value`: Initial value of every increment.
    ///  - `len`: Number of increments.
    pub fn new(init_value: usize, len: usize) -> Self {
        let mut sums = ResizingVec::with_capacity(len);
        let mut prefix_sum = 0;
        for _ in 0..len {
            prefix_sum += init_value;
            // NOTE: cannot exceed the unbounded max capacity.
            sums.push(prefix_sum).unwrap();
        }
        Self { sums }
    }

    /// Returns the cumulative sum of the increments up to position `pos`
    /// included, or [`None`] if out of bounds.
    #[inline(always)]
    pub fn get(&self, pos: usize) -> Option<usize> {
        self.sums.get(pos).copied()
    }

    /// Returns the increment at position `pos`, or [`None`] if out of bounds.
    #[inline(always)]
    pub fn get_int(&self, pos: usize) -> Option<usize> {
        let sum = self.sums.get(pos).copied()?;
        if pos > 0 {
            Some(sum - self.sums.get(pos - 1).copied().unwrap())
        } else {
            Some(sum)
        }
    }

    /// Sets the increment at position `pos` to `val`, shifting all later
    /// cumulative sums by the change.
    ///
    /// # Errors
    ///
    /// An error is returned if `pos` is out of bounds.
    pub fn set_int(&mut self, pos: usize, val: usize) -> Result<()> {
        let old = self.get_int(pos).ok_or_else(|| {
            anyhow!(
                "pos must be less than self.len()={}, but got {pos}.",
                self.len()
            )
        })?;
        for i in pos..self.len() {
            let shifted = self.sums.get(i).copied().unwrap() + val - old;
            self.sums.set(i, shifted).unwrap();
        }
        Ok(())
    }

    /// Inserts a new increment `val` at position `pos`, shifting any
    /// subsequent increments to the right.
    ///
    /// # Errors
    ///
    /// An error is returned if `pos` is greater than `self.len()`.
    pub fn add_int(&mut self, pos: usize, val: usize) -> Result<()> {
        if self.len() < pos {
            return Err(anyhow!(
                "pos must be no greater than self.len()={}, but got {pos}.",
                self.len()
            ));
        }
        let base = if pos > 0 {
            self.sums.get(pos - 1).copied().unwrap()
        } else {
            0
        };
        self.sums.insert(pos, base + val)?;
        for i in pos + 1..self.len() {
            let shifted = self.sums.get(i).copied().unwrap() + val;
            self.sums.set(i, shifted).unwrap();
        }
        Ok(())
    }

    /// Appends a new increment `val` at the end.
    pub fn push_int(&mut self, val: usize) -> Result<()> {
        let base = self.sums.last().copied().unwrap_or(0);
        self.sums.push(base + val)
    }

    /// Removes the increment at position `pos`, shifting any subsequent
    /// increments to the left.
    ///
    /// # Errors
    ///
    /// An error is returned if `pos` is out of bounds.
    pub fn remove_int(&mut self, pos: usize) -> Result<()> {
        let old = self.get_int(pos).ok_or_else(|| {
            anyhow!(
                "pos must be less than self.len()={}, but got {pos}.",
                self.len()
            )
        })?;
        self.sums.remove(pos)?;
        for i in pos..self.len() {
            let shifted = self.sums.get(i).copied().unwrap() - old;
            self.sums.set(i, shifted).unwrap();
        }
        Ok(())
    }

    /// Adds one to the increment at position `pos`.
    ///
    /// # Errors
    ///
    /// An error is returned if `pos` is out of bounds.
    pub fn incr(&mut self, pos: usize) -> Result<()> {
        if self.len() <= pos {
            return Err(anyhow!(
                "pos must be less than self.len()={}, but got {pos}.",
                self.len()
            ));
        }
        for i in pos..self.len() {
            let shifted = self.sums.get(i).copied().unwrap() + 1;
            self.sums.set(i, shifted).unwrap();
        }
        Ok(())
    }

    /// Subtracts one from the increment at position `pos`.
    ///
    /// # Errors
    ///
    /// An error is returned if
    ///
    ///  - `pos` is out of bounds, or
    ///  - the increment at `pos` is zero.
    pub fn decr(&mut self, pos: usize) -> Result<()> {
        let old = self.get_int(pos).ok_or_else(|| {
            anyhow!(
                "pos must be less than self.len()={}, but got {pos}.",
                self.len()
            )
        })?;
        if old == 0 {
            return Err(anyhow!(
                "the increment at pos={pos} must be positive to be decremented."
            ));
        }
        for i in pos..self.len() {
            let shifted = self.sums.get(i).copied().unwrap() - 1;
            self.sums.set(i, shifted).unwrap();
        }
        Ok(())
    }

    /// Gets the number of increments.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.sums.len()
    }

    /// Checks if the vector is empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// Returns the allocated capacity.
    pub fn capacity(&self) -> usize {
        self.sums.capacity()
    }

    /// Returns the number of bits of allocated backing storage.
    pub fn bits_used(&self) -> u64 {
        (self.sums.capacity() * 64) as u64
    }

    /// Returns the cumulative sums as a vector.
    pub fn to_vec(&self) -> Vec<usize> {
        self.sums.as_slice().to_vec()
    }

    /// Reduces the capacity to the current number of elements.
    pub fn trim_to_size(&mut self) {
        self.sums.trim_to_size();
    }
}
