//! Classifier artifact loader

use crate::error::{PipelineError, Result};
use crate::models::classifier::Classifier;
use crate::models::onnx::OnnxClassifier;
use crate::models::tree_ensemble::TreeEnsemble;
use std::path::Path;
use tracing::info;

/// Loads classifier artifacts, picking the runtime from the file extension
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load a single classifier from file.
    ///
    /// `.onnx` files run through ONNX Runtime, `.json` files are tree
    /// ensemble exports.
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<Box<dyn Classifier>> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PipelineError::artifact(path, "model file not found"));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let classifier: Box<dyn Classifier> = match extension.as_deref() {
            Some("onnx") => Box::new(OnnxClassifier::load(path, name, self.onnx_threads)?),
            Some("json") => Box::new(TreeEnsemble::load(path)?),
            other => {
                return Err(PipelineError::artifact(
                    path,
                    format!("unsupported model format {:?}", other.unwrap_or("")),
                ))
            }
        };

        info!(
            model = %name,
            kind = classifier.kind(),
            path = %path.display(),
            "Classifier loaded"
        );

        Ok(classifier)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
