//! # Engine Module
//!
//! The stateful orchestration layer: build-stage state, configuration,
//! multi-template weighting, restraint override merging, template file
//! resolution, and the adapter over the external modeling engine.

pub mod adapter;
pub mod builder;
pub mod config;
pub mod error;
pub mod overrides;
pub mod templates;
pub mod weighting;
