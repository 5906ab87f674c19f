//! # Compressed monotone integer sequences in Rust
//!
//! Efseq provides monotone (non-decreasing) integer sequences compressed
//! with a bucketed [Elias-Fano encoding], storing `n` values drawn from a
//! universe `[0, u]` in about `2 + ceil(lg(u / n))` bits per value while
//! answering random access and successor queries quickly on the compressed
//! form.
//!
//! [Elias-Fano encoding]: https://en.wikipedia.org/wiki/Elias%E2%80%93Fano_encoding
//!
//! # Data structures
//!
//! The main interfaces are provided in [`monotone_sequences`]:
//!
//! - [`BucketedEliasFano`](monotone_sequences::BucketedEliasFano):
//!   append-only sequence with a user-chosen bucket size.
//! - [`AdaptiveEliasFano`](monotone_sequences::AdaptiveEliasFano):
//!   append-only sequence that grows its bucket size geometrically, for
//!   sequences of unknown final length.
//! - [`DynamicEliasFano`](monotone_sequences::DynamicEliasFano): sequence
//!   supporting additions and removals of arbitrary values through lazy
//!   per-bucket edit logs.
//!
//! The supporting containers are exposed as well: plain and select-indexed
//! bit vectors in [`bit_vectors`], fixed-width and prefix-sum integer
//! vectors in [`int_vectors`], and a policy-driven resizable array in
//! [`collections`].
//!
//! # Examples
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use efseq::monotone_sequences::DynamicEliasFano;
//!
//! let mut seq = DynamicEliasFano::new(4)?;
//! seq.extend([1, 3, 3, 7, 10, 14, 21, 30])?;
//!
//! assert_eq!(seq.get(3), Some(7));
//! assert_eq!(seq.next_geq(8), Some(10));
//!
//! seq.dynamize()?;
//! seq.add(9)?;
//! seq.remove(3)?;
//! assert_eq!(seq.to_vec(), vec![1, 3, 7, 9, 10, 14, 21, 30]);
//! # Ok(())
//! # }
//! ```
//!
//! # Limitations
//!
//! - The library runs only on 64-bit machines.
//! - Stored values must be less than `2^58`; each bucket packs its base
//!   value and a 6-bit width field into one 64-bit word.
//! - The sequences are single-threaded; share a frozen sequence across
//!   threads only behind the usual synchronization primitives.
#![cfg(target_pointer_width = "64")]

pub mod bit_vectors;
pub mod broadword;
pub mod collections;
pub mod int_vectors;
pub mod monotone_sequences;
pub mod utils;

pub use monotone_sequences::{
    AdaptiveEliasFano, BucketedEliasFano, DynamicEliasFano, MonotoneSequence,
};
