//! # Workflows Module
//!
//! High-level entry points orchestrating complete restraint pipelines.
//!
//! ## Overview
//!
//! Workflows tie the core parsers and the engine layer together into the two
//! end-to-end operations users run: deriving optimal restraint parameters by
//! comparing a model against its experimentally determined target
//! ([`analyze`]), and building a model whose stock restraints are rewritten
//! from parameter tables ([`build`]). Each workflow handles input loading,
//! cross-validation of the supplied data sets, and output generation.

pub mod analyze;
pub mod build;
