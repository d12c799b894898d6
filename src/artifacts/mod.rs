//! Preprocessing artifacts produced by the training pipeline

pub mod encoder;
pub mod scaler;

pub use encoder::LabelEncoder;
pub use scaler::{FeatureScaler, ScalerParams};

use crate::error::{PipelineError, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read and decode a JSON artifact
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).map_err(|e| PipelineError::artifact(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| PipelineError::artifact(path, e))
}

/// Load the optional feature column manifest (`["amt", "category", ...]`)
pub fn load_feature_columns<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    read_json(path.as_ref())
}
