//! Error types for the prediction pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Pipeline result type
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised while loading artifacts or serving a prediction
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required artifact is missing or cannot be decoded
    #[error("Failed to load artifact {path}: {reason}")]
    ArtifactLoad { path: PathBuf, reason: String },

    /// Categorical value outside the encoder vocabulary
    #[error("Unknown {field} '{value}'")]
    UnknownCategory { field: &'static str, value: String },

    /// Numeric field outside its accepted range
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// Feature vector disagrees with what an artifact was trained on
    #[error("Shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: String,
        expected: String,
        found: String,
    },

    /// Classifier failed to produce a usable distribution
    #[error("Inference failed for {model}: {reason}")]
    Inference { model: String, reason: String },
}

impl PipelineError {
    pub fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ArtifactLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn shape(context: impl Into<String>, expected: impl ToString, found: impl ToString) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn inference(model: impl Into<String>, reason: impl ToString) -> Self {
        Self::Inference {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error is caused by the submitted form rather than the
    /// deployment. Validation errors are reported back to the user; the rest
    /// abort the request and are logged.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PipelineError::UnknownCategory { .. } | PipelineError::InvalidInput { .. }
        )
    }

    /// Stable machine-readable kind, used in replies
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::ArtifactLoad { .. } => "artifact_load",
            PipelineError::UnknownCategory { .. } => "unknown_category",
            PipelineError::InvalidInput { .. } => "invalid_input",
            PipelineError::ShapeMismatch { .. } => "shape_mismatch",
            PipelineError::Inference { .. } => "inference",
        }
    }
}
