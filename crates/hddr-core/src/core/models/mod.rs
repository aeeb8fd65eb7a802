//! Data structures for representing a parsed molecular structure.
//!
//! The central type is [`structure::Structure`], which owns chains, residues,
//! and atoms in slot maps and maintains the lookup tables (atom serial,
//! chain identifier, residue ordinal) the restraint machinery relies on.

pub mod atom;
pub mod chain;
pub mod ids;
pub mod residue;
pub mod structure;
