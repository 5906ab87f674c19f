//! Top module for general-purpose containers.
//!
//! [`ResizingVec`] is a resizable array with an explicit doubling/halving
//! policy and an optional hard capacity bound. The Elias-Fano sequences use
//! it for bucket stores and for the bounded per-bucket edit logs of the
//! dynamic variant.
pub mod resizing_vec;

pub use resizing_vec::ResizingVec;
