use crate::core::io::pdb::PdbError;
use crate::core::io::pir::PirError;
use crate::core::io::rsr::RsrError;
use crate::core::io::tables::TableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A required setup call was not performed before a dependent operation.
    #[error("Usage error: {0}")]
    Usage(String),

    /// Options, table columns, or input designations are invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Supplied data sets contradict each other (e.g. the model and target
    /// sequences do not correspond).
    #[error("Incompatible data: {0}")]
    DataIncompatibility(String),

    /// No structure file could be resolved for a template.
    #[error("Structure file not found for template '{code}'")]
    TemplateNotFound { code: String },

    /// An input configuration the library explicitly does not handle.
    #[error("Unsupported input: {0}")]
    Unsupported(String),

    /// The external modeling engine failed a build stage. Constructed by
    /// [`ModelingEngine`](super::adapter::ModelingEngine) implementations,
    /// not by the library itself.
    #[error("Modeling engine failed during {stage}: {message}")]
    Modeling {
        stage: &'static str,
        message: String,
    },

    #[error("Structure file error: {0}")]
    Pdb(#[from] PdbError),

    #[error("Restraint file error: {0}")]
    Rsr(#[from] RsrError),

    #[error("Alignment file error: {0}")]
    Pir(#[from] PirError),

    #[error("Parameter table error: {0}")]
    Table(#[from] TableError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
