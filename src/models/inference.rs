//! Multi-model inference engine for fraud prediction

use crate::config::ModelConfig;
use crate::error::{PipelineError, Result};
use crate::feature_extractor::ScaledFeatureVector;
use crate::models::classifier::{classify, Classifier};
use crate::types::prediction::{FraudClass, PredictionResult};
use std::time::{Duration, Instant};
use tracing::debug;

/// A classifier together with the figures shown next to its predictions
pub struct RegisteredModel {
    pub key: String,
    pub display_name: String,
    pub reported_accuracy: f64,
    pub reported_f1: f64,
    pub classifier: Box<dyn Classifier>,
}

impl RegisteredModel {
    pub fn new(config: &ModelConfig, classifier: Box<dyn Classifier>) -> Self {
        Self {
            key: config.key.clone(),
            display_name: config.display_name.clone(),
            reported_accuracy: config.reported_accuracy,
            reported_f1: config.reported_f1,
            classifier,
        }
    }
}

/// Time spent in one classifier for one request
#[derive(Debug, Clone)]
pub struct ModelTiming {
    pub model_key: String,
    pub elapsed: Duration,
}

/// Runs every registered classifier on a scaled vector, in registration order
pub struct InferenceEngine {
    models: Vec<RegisteredModel>,
}

impl InferenceEngine {
    pub fn new(models: Vec<RegisteredModel>) -> Self {
        Self { models }
    }

    /// Get the number of loaded models
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Get loaded model keys
    pub fn model_names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.key.clone()).collect()
    }

    pub fn models(&self) -> &[RegisteredModel] {
        &self.models
    }

    /// Run every classifier, one result per model, and report how long each
    /// took
    pub fn predict_timed(
        &self,
        features: &ScaledFeatureVector,
    ) -> Result<(Vec<PredictionResult>, Vec<ModelTiming>)> {
        let input = features.to_f32();
        let mut results = Vec::with_capacity(self.models.len());
        let mut timings = Vec::with_capacity(self.models.len());

        for model in &self.models {
            let start = Instant::now();
            let prediction = classify(&model.key, model.classifier.as_ref(), &input)?;
            let elapsed = start.elapsed();

            let predicted_class = FraudClass::from_index(prediction.class_index).ok_or_else(|| {
                PipelineError::inference(
                    &model.key,
                    format!("class index {} is not binary", prediction.class_index),
                )
            })?;

            debug!(
                model = %model.key,
                class = ?predicted_class,
                probability = prediction.probability,
                elapsed_us = elapsed.as_micros() as u64,
                "Model inference complete"
            );

            results.push(PredictionResult {
                model_key: model.key.clone(),
                model_name: model.display_name.clone(),
                predicted_class,
                probability: prediction.probability,
                reported_accuracy: model.reported_accuracy,
                reported_f1: model.reported_f1,
            });
            timings.push(ModelTiming {
                model_key: model.key.clone(),
                elapsed,
            });
        }

        Ok((results, timings))
    }
}
