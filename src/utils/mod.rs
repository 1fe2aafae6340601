//! Small shared utilities.

mod bitset;

pub use bitset::BitSet;
