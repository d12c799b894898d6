//! ONNX classifiers run through ONNX Runtime

use crate::error::{PipelineError, Result};
use crate::models::classifier::Classifier;
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor, ValueType};
use std::path::Path;
use std::sync::{Mutex, Once};
use tracing::{debug, info, warn};

static ORT_INIT: Once = Once::new();

/// Initialize the ONNX Runtime environment once per process
fn init_runtime() {
    ORT_INIT.call_once(|| match ort::init().commit() {
        Ok(_) => info!("ONNX Runtime initialized"),
        Err(e) => warn!(error = %e, "ONNX Runtime environment setup failed, using defaults"),
    });
}

/// Loaded ONNX model with metadata
pub struct OnnxClassifier {
    /// Model name
    name: String,
    /// ONNX Runtime session; running needs exclusive access
    session: Mutex<Session>,
    /// Input name for the model
    input_name: String,
    /// Output name for probabilities
    output_name: String,
    /// Input width declared by the graph
    n_features: Option<usize>,
}

impl OnnxClassifier {
    /// Load a single ONNX model from file
    pub fn load<P: AsRef<Path>>(path: P, name: &str, threads: usize) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::artifact(path, "model file not found"));
        }
        init_runtime();

        info!(model = %name, path = %path.display(), threads = threads, "Loading ONNX model");

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(threads))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| PipelineError::artifact(path, e))?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| PipelineError::artifact(path, "model declares no inputs"))?;
        let input_name = input.name.clone();
        let n_features = match &input.input_type {
            ValueType::Tensor { shape, .. } => shape
                .last()
                .copied()
                .filter(|d| *d > 0)
                .map(|d| d as usize),
            _ => None,
        };

        // Prefer an explicit probability output over the label output
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.iter().find(|o| !o.name.contains("label")))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| PipelineError::artifact(path, "model declares no outputs"))?;

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            n_features = ?n_features,
            "Model loaded successfully"
        );

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            output_name,
            n_features,
        })
    }

    fn run(&self, features: &[f32]) -> std::result::Result<Vec<f64>, String> {
        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .map_err(|e| format!("failed to create input tensor: {}", e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_tensor])
            .map_err(|e| e.to_string())?;

        self.extract_distribution(&outputs)
    }

    /// Extract the class distribution from model output.
    /// Handles tensor outputs (XGBoost, zipmap-free sklearn) and seq(map)
    /// outputs (sklearn with zipmap, LightGBM).
    fn extract_distribution(&self, outputs: &SessionOutputs) -> std::result::Result<Vec<f64>, String> {
        if let Some(output) = outputs.get(self.output_name.as_str()) {
            if let Some(distribution) = self.try_extract(&output) {
                return Ok(distribution);
            }
        }

        // Fallback: iterate all outputs and try extraction
        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }
            if let Some(distribution) = self.try_extract(&output) {
                debug!(model = %self.name, output = %name, "Extracted distribution (fallback)");
                return Ok(distribution);
            }
        }

        Err("no probability output found".to_string())
    }

    fn try_extract(&self, output: &DynValue) -> Option<Vec<f64>> {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            return distribution_from_tensor(&dims, data);
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            match self.extract_from_sequence_map(output) {
                Ok(distribution) => return Some(distribution),
                Err(e) => debug!(model = %self.name, error = %e, "seq(map) extraction failed"),
            }
        }

        None
    }

    /// Extract the distribution from seq(map(int64, float)) format
    fn extract_from_sequence_map(&self, output: &DynValue) -> std::result::Result<Vec<f64>, String> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| format!("failed to downcast to sequence: {}", e))?;

        let maps = sequence
            .try_extract_sequence::<DynMapValueType>(&allocator)
            .map_err(|e| e.to_string())?;

        // batch size is always 1
        let map_value = maps.first().ok_or("empty sequence")?;
        let kv_pairs = map_value
            .try_extract_key_values::<i64, f32>()
            .map_err(|e| e.to_string())?;

        distribution_from_pairs(&kv_pairs).ok_or_else(|| "no class probabilities in map".to_string())
    }
}

/// Class distribution from a probability tensor of shape `[1, n]` or `[n]`.
/// A single column is read as the positive-class probability.
pub(crate) fn distribution_from_tensor(dims: &[i64], data: &[f32]) -> Option<Vec<f64>> {
    let width = match dims {
        [_, n] | [n] => usize::try_from(*n).ok()?,
        _ => return None,
    };

    match width {
        0 => None,
        1 => {
            let p = *data.first()? as f64;
            Some(vec![1.0 - p, p])
        }
        n => Some(data.get(..n)?.iter().map(|&v| v as f64).collect()),
    }
}

/// Class distribution from `(class_id, probability)` pairs
pub(crate) fn distribution_from_pairs(pairs: &[(i64, f32)]) -> Option<Vec<f64>> {
    let max_class = pairs.iter().map(|(class, _)| *class).max()?;
    if max_class < 0 || pairs.iter().any(|(class, _)| *class < 0) {
        return None;
    }

    let mut distribution = vec![0.0; max_class as usize + 1];
    for (class, prob) in pairs {
        distribution[*class as usize] = *prob as f64;
    }
    Some(distribution)
}

impl Classifier for OnnxClassifier {
    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f64>> {
        self.run(features)
            .map_err(|reason| PipelineError::inference(&self.name, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classifier::ClassPrediction;

    #[test]
    fn test_tensor_distribution() {
        assert_eq!(
            distribution_from_tensor(&[1, 2], &[0.25, 0.75]),
            Some(vec![0.25, 0.75])
        );
        assert_eq!(
            distribution_from_tensor(&[2], &[0.5, 0.5]),
            Some(vec![0.5, 0.5])
        );
        assert_eq!(
            distribution_from_tensor(&[1, 1], &[0.75]),
            Some(vec![0.25, 0.75])
        );
        assert_eq!(distribution_from_tensor(&[1, 2, 3], &[0.0; 6]), None);
        assert_eq!(distribution_from_tensor(&[1, 3], &[0.1]), None);
    }

    #[test]
    fn test_pair_distribution() {
        assert_eq!(
            distribution_from_pairs(&[(1, 0.75), (0, 0.25)]),
            Some(vec![0.25, 0.75])
        );
        assert_eq!(distribution_from_pairs(&[]), None);
        assert_eq!(distribution_from_pairs(&[(-1, 0.5)]), None);
    }

    #[test]
    fn test_partial_zipmap_is_an_inference_error() {
        // a map missing class 0 leaves the distribution short of 1
        let distribution = distribution_from_pairs(&[(1, 0.3)]).unwrap();
        assert_eq!(distribution, vec![0.0, 0.3]);

        let err = ClassPrediction::from_distribution("xgboost", distribution).unwrap_err();
        assert!(matches!(err, PipelineError::Inference { .. }));
    }

    fn fixture() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/amount_classifier.onnx")
    }

    #[test]
    fn test_load_selects_probability_output() {
        let model = OnnxClassifier::load(fixture(), "xgboost", 1).unwrap();

        assert_eq!(model.kind(), "onnx");
        assert_eq!(model.input_name, "float_input");
        // "label" is declared first but carries class ids, not probabilities
        assert_eq!(model.output_name, "probabilities");
        assert_eq!(model.n_features(), Some(8));
    }

    #[test]
    fn test_predict_proba_runs_session() {
        let model = OnnxClassifier::load(fixture(), "xgboost", 1).unwrap();

        let neutral = model.predict_proba(&[0.0; 8]).unwrap();
        assert_eq!(neutral.len(), 2);
        assert!((neutral[0] - 0.5).abs() < 1e-6);
        assert!((neutral[1] - 0.5).abs() < 1e-6);

        let mut large_amount = [0.0_f32; 8];
        large_amount[0] = 1.0;
        let fraud = model.predict_proba(&large_amount).unwrap();
        assert!((fraud.iter().sum::<f64>() - 1.0).abs() < 1e-5);
        assert!(fraud[1] > 0.98);
    }

    #[test]
    fn test_loader_dispatches_onnx() {
        let model = crate::models::loader::ModelLoader::new()
            .load_model(fixture(), "xgboost")
            .unwrap();
        assert_eq!(model.kind(), "onnx");
        assert_eq!(model.n_features(), Some(8));
    }

    #[test]
    fn test_corrupt_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_rf.onnx");
        std::fs::write(&path, b"not a protobuf").unwrap();

        let err = OnnxClassifier::load(&path, "random_forest", 1).err().unwrap();
        assert!(matches!(err, PipelineError::ArtifactLoad { .. }));
    }

    #[test]
    fn test_missing_model_file() {
        let err = OnnxClassifier::load("does/not/exist.onnx", "random_forest", 1)
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::ArtifactLoad { .. }));
    }
}
