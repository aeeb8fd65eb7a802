//! Adapter over the external comparative-modeling engine.
//!
//! The build pipeline only needs two things from the engine: produce the
//! initial model files (starting structure plus the stock restraint file),
//! and run the optimization once the restraints have been customized. Both
//! stages live behind a trait so the pipeline is testable without the
//! engine installed.

use super::error::EngineError;
use crate::core::io::pir::Alignment;
use std::path::{Path, PathBuf};

/// File artifacts of the initial-model stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialFiles {
    /// The initial (un-optimized) model structure.
    pub structure_path: PathBuf,
    /// The engine-generated restraint file, ready for customization.
    pub restraints_path: PathBuf,
}

/// The external modeling engine the build pipeline drives.
pub trait ModelingEngine {
    /// Generates the initial model structure and restraint file for
    /// `sequence`, modeled on `knowns`, in `work_dir`.
    fn generate_initial(
        &mut self,
        alignment: &Alignment,
        sequence: &str,
        knowns: &[String],
        work_dir: &Path,
    ) -> Result<InitialFiles, EngineError>;

    /// Optimizes the initial model under the (possibly customized) restraint
    /// file, returning the path of the final model structure.
    fn optimize(&mut self, initial: &InitialFiles) -> Result<PathBuf, EngineError>;
}
