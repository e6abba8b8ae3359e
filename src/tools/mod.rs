//! Internal building blocks for the pack codec.

pub mod freq_list;
pub mod codebook;
pub mod flat_tree;
pub mod words;
