use std::error::Error;
use std::fmt;

/// Error taxonomy for the preprocessing/training/inference pipeline.
///
/// Everything here surfaces as a client-visible error at the service
/// boundary; training-time I/O failures are carried by `anyhow` instead and
/// propagate to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Apply-mode preprocessing was requested but no fitted artifact exists
    /// at the given path.
    ArtifactMissing(String),
    /// An inference record is missing a feature the model was fit on.
    FeatureMismatch(String),
    /// A categorical value was never seen during fit.
    UnseenCategory { column: String, value: String },
    /// Prediction was requested from a model that has not been fitted/loaded.
    ModelNotLoaded,
    /// Malformed inference input (wrong field type, unparsable value).
    InvalidInput(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineError::ArtifactMissing(path) => {
                write!(f, "No fitted artifact found at {}; run training first", path)
            }
            PipelineError::FeatureMismatch(name) => {
                write!(f, "Record is missing required feature '{}'", name)
            }
            PipelineError::UnseenCategory { column, value } => {
                write!(f, "Value '{}' in column '{}' was not seen during fit", value, column)
            }
            PipelineError::ModelNotLoaded => {
                write!(f, "Model has not been fitted or loaded")
            }
            PipelineError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl Error for PipelineError {}
