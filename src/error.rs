//! Error types for the imaging-eval library.

use thiserror::Error;

/// Result type for imaging-eval operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Fatal conditions that abort an evaluation run.
///
/// Degenerate cases (true negatives, zero-area comparisons, labels without
/// comparable pairs) and unknown or missing predictions are not errors; they
/// are folded into the report and counted in [`crate::diagnostics::Diagnostics`].
#[derive(Error, Debug)]
pub enum EvalError {
    /// Error during JSON parsing or serialization.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error during I/O operations.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The dataset or the output document was not supplied.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// A bounding box without the required corner fields.
    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),

    /// A ground-truth value of the wrong shape for its modality.
    #[error("Invalid ground truth: {0}")]
    InvalidGroundTruth(String),

    /// A model output of the wrong shape for its modality.
    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    /// Classification threshold outside [0, 1].
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
}
