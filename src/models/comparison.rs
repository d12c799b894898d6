//! Side-by-side comparison of model outputs

use crate::types::prediction::PredictionResult;
use serde::{Deserialize, Serialize};

/// How the models' decisions relate for one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    /// Every model predicted the same class
    pub agree: bool,
    /// Number of models that predicted fraud
    pub fraud_votes: usize,
    /// Number of models compared
    pub total: usize,
    /// Model with the highest probability for its own decision
    pub most_confident: Option<String>,
}

impl ModelComparison {
    pub fn from_results(results: &[PredictionResult]) -> Self {
        let fraud_votes = results
            .iter()
            .filter(|r| r.predicted_class.is_fraud())
            .count();

        let agree = results
            .windows(2)
            .all(|pair| pair[0].predicted_class == pair[1].predicted_class);

        let most_confident = results
            .iter()
            .fold(None::<&PredictionResult>, |best, r| match best {
                Some(b) if b.probability >= r.probability => Some(b),
                _ => Some(r),
            })
            .map(|r| r.model_key.clone());

        Self {
            agree,
            fraud_votes,
            total: results.len(),
            most_confident,
        }
    }
}
