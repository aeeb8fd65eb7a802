//! File formats consumed and produced by the restraint machinery.
//!
//! - [`pdb`] - structure files (read only).
//! - [`rsr`] - restraint files (read, targeted edit, write).
//! - [`pir`] - alignment files (read only).
//! - [`tables`] - CSV restraint-parameter and analysis tables.

pub mod pdb;
pub mod pir;
pub mod rsr;
pub mod tables;
pub mod traits;
