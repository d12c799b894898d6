//! Fraud Prediction Service Library
//!
//! Encodes and scales a credit card transaction submitted through a form,
//! then classifies it with every registered model.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod handler;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use feature_extractor::{FeatureExtractor, FEATURE_COLUMNS};
pub use handler::{handle, Command, Response};
pub use models::inference::InferenceEngine;
pub use registry::ModelRegistry;
pub use service::{FormService, Reply};
pub use types::{
    prediction::{FraudClass, PredictionResult},
    transaction::TransactionInput,
};
