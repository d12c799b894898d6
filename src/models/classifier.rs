//! Classifier abstraction shared by every model format

use crate::error::{PipelineError, Result};

/// A frozen classifier: fixed-length numeric vector in, class distribution out
pub trait Classifier: Send + Sync {
    /// Format tag used in logs ("onnx", "random_forest", ...)
    fn kind(&self) -> &'static str;

    /// Input width the model declares, when it declares one
    fn n_features(&self) -> Option<usize>;

    /// Probability of every class, indexed by class id
    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f64>>;
}

/// Allowed drift of a distribution's sum from 1 (float32 model outputs)
const SUM_TOLERANCE: f64 = 1e-3;

/// Class decision derived from a probability distribution
#[derive(Debug, Clone, PartialEq)]
pub struct ClassPrediction {
    /// Index of the most probable class
    pub class_index: usize,
    /// Probability of that class
    pub probability: f64,
    /// Full distribution
    pub distribution: Vec<f64>,
}

impl ClassPrediction {
    /// Pick the most probable class. Ties go to the lower class index.
    pub fn from_distribution(model: &str, distribution: Vec<f64>) -> Result<Self> {
        if distribution.is_empty() {
            return Err(PipelineError::inference(model, "empty probability distribution"));
        }

        if let Some(bad) = distribution
            .iter()
            .find(|p| !p.is_finite() || **p < -1e-6 || **p > 1.0 + 1e-6)
        {
            return Err(PipelineError::inference(
                model,
                format!("probability {} outside [0, 1]", bad),
            ));
        }

        let total: f64 = distribution.iter().sum();
        if (total - 1.0).abs() > SUM_TOLERANCE {
            return Err(PipelineError::inference(
                model,
                format!("probabilities sum to {}, not 1", total),
            ));
        }

        let mut class_index = 0;
        for (i, &p) in distribution.iter().enumerate().skip(1) {
            if p > distribution[class_index] {
                class_index = i;
            }
        }

        Ok(Self {
            class_index,
            probability: distribution[class_index].clamp(0.0, 1.0),
            distribution,
        })
    }
}

/// Run a classifier and derive its class decision
pub fn classify(model: &str, classifier: &dyn Classifier, features: &[f32]) -> Result<ClassPrediction> {
    if let Some(expected) = classifier.n_features() {
        if expected != features.len() {
            return Err(PipelineError::shape(
                format!("{} input", model),
                format!("{} features", expected),
                format!("{} features", features.len()),
            ));
        }
    }

    let distribution = classifier.predict_proba(features)?;
    ClassPrediction::from_distribution(model, distribution)
}
