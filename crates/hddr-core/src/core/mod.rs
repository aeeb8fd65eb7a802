//! # Core Module
//!
//! Stateless building blocks for restraint customization: molecular data
//! models, file I/O, sequence alignment, and geometry.
//!
//! ## Overview
//!
//! - **Molecular Representation** ([`models`]) - Chains, residues, and atoms
//!   of a parsed structure, with stable slotmap identifiers.
//! - **File I/O** ([`io`]) - PDB structures, restraint files, PIR alignments,
//!   and CSV restraint-parameter tables.
//! - **Sequence Algorithms** ([`seq`]) - Pairwise global alignment and
//!   residue correspondence mapping.
//! - **Utilities** ([`utils`]) - Residue code tables and geometric helpers.

pub mod io;
pub mod models;
pub mod seq;
pub mod utils;
