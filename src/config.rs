//! Configuration management for the prediction service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub artifacts: ArtifactsConfig,
    pub models: Vec<ModelConfig>,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject the form submits commands on
    pub request_subject: String,
}

/// Preprocessing artifact locations, relative to `dir`
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory containing the artifact files
    pub dir: String,
    pub scaler: String,
    /// Column manifest; skipped when the file does not exist
    #[serde(default)]
    pub feature_columns: Option<String>,
    pub category_encoder: String,
    pub gender_encoder: String,
    pub job_encoder: String,
    /// Number of threads for ONNX inference per model (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

impl ArtifactsConfig {
    /// Resolve an artifact file name against the artifact directory
    pub fn path(&self, file: &str) -> PathBuf {
        Path::new(&self.dir).join(file)
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: "models".to_string(),
            scaler: "scaler.json".to_string(),
            feature_columns: Some("feature_columns.json".to_string()),
            category_encoder: "label_encoder_category.json".to_string(),
            gender_encoder: "label_encoder_gender.json".to_string(),
            job_encoder: "label_encoder_job.json".to_string(),
            onnx_threads: 1,
        }
    }
}

/// One classifier served by the registry
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Stable key, e.g. "random_forest"
    pub key: String,
    /// Name shown to users
    pub display_name: String,
    /// Model artifact file inside the artifact directory
    pub file: String,
    /// Accuracy measured at training time, in percent
    pub reported_accuracy: f64,
    /// F1-score measured at training time, in percent
    #[serde(default)]
    pub reported_f1: f64,
}

/// Number of classifiers the service compares: a random forest and a
/// gradient boosted ensemble
pub const MODEL_COUNT: usize = 2;

/// The two classifiers trained for this application
pub fn default_models() -> Vec<ModelConfig> {
    vec![
        ModelConfig {
            key: "random_forest".to_string(),
            display_name: "Random Forest".to_string(),
            file: "model_rf.onnx".to_string(),
            reported_accuracy: 97.6,
            reported_f1: 97.7,
        },
        ModelConfig {
            key: "xgboost".to_string(),
            display_name: "XGBoost".to_string(),
            file: "model_xgb.onnx".to_string(),
            reported_accuracy: 99.2,
            reported_f1: 99.2,
        },
    ]
}

/// Request handling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of requests handled concurrently
    pub workers: usize,
    /// Seconds between metrics summaries (0 disables them)
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the file named by `FRAUD_CONFIG`, or the
    /// default location
    pub fn load() -> Result<Self> {
        let path = std::env::var("FRAUD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path.
    ///
    /// `FRAUD__SECTION__KEY` environment variables override file values.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("FRAUD").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.models.len() != MODEL_COUNT {
            anyhow::bail!(
                "Exactly {} models must be configured, found {}",
                MODEL_COUNT,
                self.models.len()
            );
        }
        for (i, model) in self.models.iter().enumerate() {
            if self.models[..i].iter().any(|m| m.key == model.key) {
                anyhow::bail!("Duplicate model key '{}'", model.key);
            }
        }
        if self.pipeline.workers == 0 {
            anyhow::bail!("pipeline.workers must be at least 1");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                request_subject: "fraud.form".to_string(),
            },
            artifacts: ArtifactsConfig::default(),
            models: default_models(),
            pipeline: PipelineConfig {
                workers: 4,
                metrics_interval_secs: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
