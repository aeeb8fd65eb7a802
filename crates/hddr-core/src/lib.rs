//! # HDDR Core Library
//!
//! A library for customizing the parameters of homology-derived distance
//! restraints (HDDRs) in comparative protein structure modeling. It augments
//! an external modeling engine by rewriting the Gaussian parameters (location,
//! sigma) of the distance restraints the engine generates, either from
//! user-supplied parameter tables or from deviations measured against an
//! experimentally determined target structure.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models
//!   (`Structure`, alignments), file I/O (PDB structures, restraint files,
//!   PIR alignments, CSV parameter tables), and pure algorithms (pairwise
//!   sequence alignment, geometry).
//!
//! - **[`engine`]: The Logic Core.** This stateful layer orchestrates a model
//!   build: the `ModelBuilder` staged state machine, restraint override
//!   merging and multi-template weighting, template file resolution, and the
//!   `ModelingEngine` adapter over the external optimizer.
//!
//! - **[`workflows`]: The Public API.** Ties `engine` and `core` together to
//!   execute complete procedures: the optimal-restraint analysis of
//!   target-template pairs, and the full customized model build.

pub mod core;
pub mod engine;
pub mod workflows;
