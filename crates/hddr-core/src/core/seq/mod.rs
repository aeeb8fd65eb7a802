//! Pairwise sequence alignment and identity computation.

pub mod align;
