//! Immutable registry of every artifact the pipeline needs
//!
//! Built once at startup and shared read-only by all requests.

use crate::artifacts::{load_feature_columns, FeatureScaler, LabelEncoder};
use crate::config::{ArtifactsConfig, ModelConfig, MODEL_COUNT};
use crate::error::{PipelineError, Result};
use crate::feature_extractor::{FeatureExtractor, FEATURE_COLUMNS};
use crate::models::inference::{InferenceEngine, RegisteredModel};
use crate::models::loader::ModelLoader;
use tracing::{info, warn};

/// Encoders, scaler and classifiers loaded from the artifact directory
pub struct ModelRegistry {
    extractor: FeatureExtractor,
    scaler: FeatureScaler,
    engine: InferenceEngine,
}

impl ModelRegistry {
    /// Load every artifact. Fails before any request can be served if an
    /// artifact is missing, corrupt, or trained on a different column layout.
    pub fn load(artifacts: &ArtifactsConfig, models: &[ModelConfig]) -> Result<Self> {
        info!(dir = %artifacts.dir, "Loading artifacts");

        let category = LabelEncoder::load(artifacts.path(&artifacts.category_encoder), "category")?;
        let gender = LabelEncoder::load(artifacts.path(&artifacts.gender_encoder), "gender")?;
        let job = LabelEncoder::load(artifacts.path(&artifacts.job_encoder), "job")?;
        info!(
            categories = category.len(),
            genders = gender.len(),
            jobs = job.len(),
            "Label encoders loaded"
        );

        let scaler = FeatureScaler::load(artifacts.path(&artifacts.scaler))?;

        if let Some(file) = &artifacts.feature_columns {
            let path = artifacts.path(file);
            if path.exists() {
                let columns = load_feature_columns(&path)?;
                check_columns("feature column manifest", &columns)?;
            } else {
                warn!(path = %path.display(), "Feature column manifest not found, skipping check");
            }
        }

        let loader = ModelLoader::with_threads(artifacts.onnx_threads);
        let mut registered = Vec::with_capacity(models.len());
        for model in models {
            let classifier = loader.load_model(artifacts.path(&model.file), &model.key)?;
            registered.push(RegisteredModel::new(model, classifier));
        }

        let registry = Self::from_parts(
            FeatureExtractor::new(category, gender, job),
            scaler,
            InferenceEngine::new(registered),
        )?;

        info!(
            models = ?registry.engine.model_names(),
            features = registry.extractor.feature_count(),
            "Model registry ready"
        );

        Ok(registry)
    }

    /// Assemble a registry from already loaded parts, checking that they
    /// agree on the feature layout.
    pub fn from_parts(
        extractor: FeatureExtractor,
        scaler: FeatureScaler,
        engine: InferenceEngine,
    ) -> Result<Self> {
        if engine.model_count() != MODEL_COUNT {
            return Err(PipelineError::shape(
                "model registry",
                format!("{} models", MODEL_COUNT),
                format!("{} models", engine.model_count()),
            ));
        }

        if scaler.n_features() != FEATURE_COLUMNS.len() {
            return Err(PipelineError::shape(
                "scaler",
                format!("{} columns", FEATURE_COLUMNS.len()),
                format!("{} columns", scaler.n_features()),
            ));
        }
        if !scaler.feature_names().is_empty() {
            check_columns("scaler", scaler.feature_names())?;
        }

        for model in engine.models() {
            if let Some(width) = model.classifier.n_features() {
                if width != FEATURE_COLUMNS.len() {
                    return Err(PipelineError::shape(
                        format!("model {}", model.key),
                        format!("{} features", FEATURE_COLUMNS.len()),
                        format!("{} features", width),
                    ));
                }
            }
        }

        Ok(Self {
            extractor,
            scaler,
            engine,
        })
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }
}

fn check_columns(context: &str, columns: &[String]) -> Result<()> {
    let aligned = columns.len() == FEATURE_COLUMNS.len()
        && columns.iter().zip(FEATURE_COLUMNS).all(|(a, b)| a == b);
    if aligned {
        Ok(())
    } else {
        Err(PipelineError::shape(
            context,
            FEATURE_COLUMNS.join(","),
            columns.join(","),
        ))
    }
}
