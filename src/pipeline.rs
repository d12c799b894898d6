//! Encode, scale and classify one form submission

use crate::error::Result;
use crate::feature_extractor::{EncodedFeatureVector, ScaledFeatureVector};
use crate::models::inference::ModelTiming;
use crate::registry::ModelRegistry;
use crate::types::prediction::PredictionResult;
use crate::types::transaction::TransactionInput;

/// Everything produced while serving one submission
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub encoded: EncodedFeatureVector,
    pub scaled: ScaledFeatureVector,
    pub results: Vec<PredictionResult>,
    pub timings: Vec<ModelTiming>,
}

/// Encoding stage
pub fn encode(registry: &ModelRegistry, input: &TransactionInput) -> Result<EncodedFeatureVector> {
    registry.extractor().extract(input)
}

/// Scaling stage
pub fn scale(registry: &ModelRegistry, encoded: &EncodedFeatureVector) -> Result<ScaledFeatureVector> {
    registry.scaler().transform(encoded)
}

/// Inference stage, with the time spent in each model
pub fn infer(
    registry: &ModelRegistry,
    scaled: &ScaledFeatureVector,
) -> Result<(Vec<PredictionResult>, Vec<ModelTiming>)> {
    registry.engine().predict_timed(scaled)
}

/// Run all stages, one result per registered model
pub fn predict(registry: &ModelRegistry, input: &TransactionInput) -> Result<Vec<PredictionResult>> {
    run(registry, input).map(|run| run.results)
}

/// Run all stages and keep the intermediate vectors and model timings
pub fn run(registry: &ModelRegistry, input: &TransactionInput) -> Result<PipelineRun> {
    let encoded = encode(registry, input)?;
    let scaled = scale(registry, &encoded)?;
    let (results, timings) = infer(registry, &scaled)?;

    Ok(PipelineRun {
        encoded,
        scaled,
        results,
        timings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{FeatureScaler, LabelEncoder, ScalerParams};
    use crate::config::default_models;
    use crate::error::PipelineError;
    use crate::feature_extractor::{FeatureExtractor, FEATURE_COLUMNS};
    use crate::models::inference::{InferenceEngine, RegisteredModel};
    use crate::models::tree_ensemble::{EnsembleKind, Tree, TreeEnsemble, TreeNode};
    use crate::types::prediction::FraudClass;

    fn encoder(field: &'static str, classes: &[&str]) -> LabelEncoder {
        LabelEncoder::from_classes(field, classes.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    // Splits on the scaled amount column: large amounts look fraudulent.
    fn amount_tree(kind: EnsembleKind) -> TreeEnsemble {
        let (low, high) = match kind {
            EnsembleKind::RandomForest => (vec![0.9, 0.1], vec![0.2, 0.8]),
            EnsembleKind::GradientBoosting => (vec![-3.0], vec![3.0]),
        };
        TreeEnsemble {
            kind,
            n_features: 8,
            n_classes: 2,
            base_score: 0.0,
            trees: vec![Tree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 0,
                        threshold: 2.0,
                        left: 1,
                        right: 2,
                    },
                    TreeNode::Leaf { value: low },
                    TreeNode::Leaf { value: high },
                ],
            }],
        }
    }

    fn registry() -> ModelRegistry {
        let extractor = FeatureExtractor::new(
            encoder("category", &["gas_transport", "grocery_pos", "shopping_net"]),
            encoder("gender", &["F", "M"]),
            encoder("job", &["Engineer", "Teacher"]),
        );
        let scaler = FeatureScaler::new(
            FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            ScalerParams::Standard {
                mean: vec![70.0, 1.0, 0.5, 0.5, 90000.0, 12.0, 45.0, 75.0],
                scale: vec![150.0, 1.0, 0.5, 0.5, 300000.0, 7.0, 17.0, 30.0],
            },
        )
        .unwrap();
        let configs = default_models();
        let engine = InferenceEngine::new(vec![
            RegisteredModel::new(&configs[0], Box::new(amount_tree(EnsembleKind::RandomForest))),
            RegisteredModel::new(&configs[1], Box::new(amount_tree(EnsembleKind::GradientBoosting))),
        ]);
        ModelRegistry::from_parts(extractor, scaler, engine).unwrap()
    }

    #[test]
    fn test_reference_submission() {
        let registry = registry();
        let input = TransactionInput::new("grocery_pos", "F", "Teacher");

        let results = predict(&registry, &input).unwrap();
        assert_eq!(results.len(), 2);
        for result in &results {
            assert_eq!(result.predicted_class, FraudClass::NotFraud);
            assert!(result.probability >= 0.5 && result.probability <= 1.0);
        }
        assert_eq!(results[0].model_name, "Random Forest");
        assert_eq!(results[1].model_name, "XGBoost");
    }

    #[test]
    fn test_large_amount_is_flagged() {
        let registry = registry();
        let mut input = TransactionInput::new("shopping_net", "M", "Engineer");
        input.amount = 1200.0;
        input.hour = 2;

        let run = run(&registry, &input).unwrap();
        assert_eq!(run.encoded.len(), 8);
        assert_eq!(run.scaled.len(), run.encoded.len());
        assert_eq!(run.timings.len(), 2);
        for result in &run.results {
            assert_eq!(result.predicted_class, FraudClass::Fraud);
            assert!(result.probability >= 0.5);
        }
    }

    #[test]
    fn test_probability_bounds_over_many_inputs() {
        let registry = registry();
        let categories = ["gas_transport", "grocery_pos", "shopping_net"];
        for (i, amount) in [0.0, 1.0, 99.9, 370.0, 371.0, 5000.0].iter().enumerate() {
            let mut input = TransactionInput::new(categories[i % 3], "M", "Teacher");
            input.amount = *amount;
            input.age = 18 + (i as u8) * 10;
            input.hour = (i as u8) * 4;

            for result in predict(&registry, &input).unwrap() {
                assert!((0.5..=1.0).contains(&result.probability));
            }
        }
    }

    #[test]
    fn test_unknown_category_stops_at_encoding() {
        let registry = registry();
        let input = TransactionInput::new("not_a_real_category", "F", "Teacher");

        let err = predict(&registry, &input).unwrap_err();
        assert!(err.is_validation());
        assert!(matches!(err, PipelineError::UnknownCategory { .. }));
    }
}
