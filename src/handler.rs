//! Command dispatch for the prediction form
//!
//! Each page of the application is one [`Command`], served by [`handle`] as a
//! pure function of the registry and the command.

use crate::error::Result;
use crate::models::comparison::ModelComparison;
use crate::models::inference::ModelTiming;
use crate::pipeline;
use crate::registry::ModelRegistry;
use crate::types::prediction::{PredictionCard, PredictionResult};
use crate::types::transaction::{FormDefaults, TransactionInput, AGE_RANGE, HOUR_RANGE};
use serde::{Deserialize, Serialize};

pub const APP_TITLE: &str = "Credit Card Fraud Detection";

/// A request from the form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "snake_case")]
pub enum Command {
    /// Overview page
    Home,
    /// Options and ranges needed to render the data-entry form
    FormSchema,
    /// Classify a submission with every model
    Predict(TransactionInput),
    /// Charts page (not implemented)
    Visualize,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Home => "home",
            Command::FormSchema => "form_schema",
            Command::Predict(_) => "predict",
            Command::Visualize => "visualize",
        }
    }
}

/// Reply to a [`Command`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "page", content = "data", rename_all = "snake_case")]
pub enum Response {
    Home(Overview),
    FormSchema(FormSchema),
    Prediction(PredictionReport),
    Visualization(Notice),
}

/// Reported training figures of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
    pub model_name: String,
    pub accuracy: f64,
    pub f1: f64,
}

/// Overview page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub title: String,
    pub description: String,
    pub workflow: Vec<String>,
    pub performance: Vec<ModelPerformance>,
}

/// Inclusive integer range accepted by a form field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: u8,
    pub max: u8,
}

/// Data-entry form description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    pub categories: Vec<String>,
    pub genders: Vec<String>,
    pub jobs: Vec<String>,
    pub hour: Range,
    pub age: Range,
    pub defaults: FormDefaults,
}

/// Prediction page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub results: Vec<PredictionResult>,
    pub cards: Vec<PredictionCard>,
    pub comparison: ModelComparison,
}

/// Placeholder page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

/// Serve one command
pub fn handle(registry: &ModelRegistry, command: &Command) -> Result<Response> {
    handle_timed(registry, command).map(|(response, _)| response)
}

/// Serve one command, reporting per-model inference time for predictions
pub fn handle_timed(
    registry: &ModelRegistry,
    command: &Command,
) -> Result<(Response, Vec<ModelTiming>)> {
    let response = match command {
        Command::Home => Response::Home(overview(registry)),
        Command::FormSchema => Response::FormSchema(form_schema(registry)),
        Command::Predict(input) => {
            let run = pipeline::run(registry, input)?;
            return Ok((Response::Prediction(report(run.results)), run.timings));
        }
        Command::Visualize => Response::Visualization(Notice {
            title: "Data Visualization".to_string(),
            message: "Visualization is not implemented yet.".to_string(),
        }),
    };
    Ok((response, Vec::new()))
}

/// Build the prediction page from pipeline results
pub fn report(results: Vec<PredictionResult>) -> PredictionReport {
    let cards = results.iter().map(PredictionResult::to_card).collect();
    let comparison = ModelComparison::from_results(&results);
    PredictionReport {
        results,
        cards,
        comparison,
    }
}

fn overview(registry: &ModelRegistry) -> Overview {
    let names: Vec<&str> = registry
        .engine()
        .models()
        .iter()
        .map(|m| m.display_name.as_str())
        .collect();

    Overview {
        title: APP_TITLE.to_string(),
        description: format!(
            "Classifies credit card transactions as fraudulent or legitimate using {}.",
            names.join(" and ")
        ),
        workflow: vec![
            "Enter transaction data".to_string(),
            "Predict fraud automatically".to_string(),
            "Compare the results of both models".to_string(),
        ],
        performance: registry
            .engine()
            .models()
            .iter()
            .map(|m| ModelPerformance {
                model_name: m.display_name.clone(),
                accuracy: m.reported_accuracy,
                f1: m.reported_f1,
            })
            .collect(),
    }
}

fn form_schema(registry: &ModelRegistry) -> FormSchema {
    let extractor = registry.extractor();
    FormSchema {
        categories: extractor.category_encoder().classes().to_vec(),
        genders: extractor.gender_encoder().classes().to_vec(),
        jobs: extractor.job_encoder().classes().to_vec(),
        hour: Range {
            min: HOUR_RANGE.0,
            max: HOUR_RANGE.1,
        },
        age: Range {
            min: AGE_RANGE.0,
            max: AGE_RANGE.1,
        },
        defaults: FormDefaults::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{FeatureScaler, LabelEncoder, ScalerParams};
    use crate::config::default_models;
    use crate::error::PipelineError;
    use crate::feature_extractor::FeatureExtractor;
    use crate::models::inference::{InferenceEngine, RegisteredModel};
    use crate::models::tree_ensemble::{EnsembleKind, Tree, TreeEnsemble, TreeNode};

    fn encoder(field: &'static str, classes: &[&str]) -> LabelEncoder {
        LabelEncoder::from_classes(field, classes.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn leaf_model(kind: EnsembleKind, value: Vec<f64>) -> TreeEnsemble {
        TreeEnsemble {
            kind,
            n_features: 8,
            n_classes: 2,
            base_score: 0.0,
            trees: vec![Tree {
                nodes: vec![TreeNode::Leaf { value }],
            }],
        }
    }

    fn registry() -> ModelRegistry {
        let configs = default_models();
        ModelRegistry::from_parts(
            FeatureExtractor::new(
                encoder("category", &["grocery_pos", "travel"]),
                encoder("gender", &["F", "M"]),
                encoder("job", &["Teacher"]),
            ),
            FeatureScaler::new(
                Vec::new(),
                ScalerParams::Standard {
                    mean: vec![0.0; 8],
                    scale: vec![1.0; 8],
                },
            )
            .unwrap(),
            InferenceEngine::new(vec![
                RegisteredModel::new(
                    &configs[0],
                    Box::new(leaf_model(EnsembleKind::RandomForest, vec![0.3, 0.7])),
                ),
                RegisteredModel::new(
                    &configs[1],
                    Box::new(leaf_model(EnsembleKind::GradientBoosting, vec![-2.0])),
                ),
            ]),
        )
        .unwrap()
    }

    #[test]
    fn test_home() {
        let response = handle(&registry(), &Command::Home).unwrap();
        let Response::Home(overview) = response else {
            panic!("expected home page");
        };
        assert_eq!(overview.performance.len(), 2);
        assert_eq!(overview.performance[0].accuracy, 97.6);
        assert_eq!(overview.performance[0].f1, 97.7);
        assert_eq!(overview.performance[1].accuracy, 99.2);
        assert!(overview.description.contains("Random Forest and XGBoost"));
    }

    #[test]
    fn test_form_schema_lists_vocabularies() {
        let response = handle(&registry(), &Command::FormSchema).unwrap();
        let Response::FormSchema(schema) = response else {
            panic!("expected form schema");
        };
        assert_eq!(schema.categories, vec!["grocery_pos", "travel"]);
        assert_eq!(schema.genders, vec!["F", "M"]);
        assert_eq!(schema.hour, Range { min: 0, max: 23 });
        assert_eq!(schema.age, Range { min: 18, max: 100 });
        assert_eq!(schema.defaults.amount, 100.0);
    }

    #[test]
    fn test_predict() {
        let command = Command::Predict(TransactionInput::new("grocery_pos", "F", "Teacher"));
        let response = handle(&registry(), &command).unwrap();
        let Response::Prediction(report) = response else {
            panic!("expected prediction page");
        };

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.cards[0].label, "Fraud");
        assert_eq!(report.cards[0].probability_text, "70.00%");
        assert_eq!(report.cards[0].accuracy_text, "Model accuracy: 97.6%");
        assert_eq!(report.cards[1].label, "Not fraud");
        assert_eq!(report.cards[1].accuracy_text, "Model accuracy: 99.2%");
        assert!(!report.comparison.agree);
    }

    #[test]
    fn test_predict_unknown_category() {
        let command = Command::Predict(TransactionInput::new("not_a_real_category", "F", "Teacher"));
        let err = handle(&registry(), &command).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownCategory { .. }));
    }

    #[test]
    fn test_visualize_is_a_stub() {
        let response = handle(&registry(), &Command::Visualize).unwrap();
        assert!(matches!(response, Response::Visualization(_)));
    }

    #[test]
    fn test_command_wire_format() {
        let command: Command = serde_json::from_str(r#"{"command": "home"}"#).unwrap();
        assert_eq!(command, Command::Home);

        let command: Command = serde_json::from_str(
            r#"{"command": "predict", "payload": {
                "amount": 100.0, "category": "grocery_pos", "gender": "F",
                "job": "Teacher", "city_population": 3000, "hour": 12,
                "age": 30, "distance_km": 10.0
            }}"#,
        )
        .unwrap();
        assert_eq!(command.name(), "predict");
        assert_eq!(
            command,
            Command::Predict(TransactionInput::new("grocery_pos", "F", "Teacher"))
        );
    }
}
