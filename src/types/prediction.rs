//! Prediction results and their display form

use serde::{Deserialize, Serialize};

/// Binary fraud decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudClass {
    NotFraud,
    Fraud,
}

impl FraudClass {
    /// Map a class index produced by a classifier (0 = not fraud, 1 = fraud)
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(FraudClass::NotFraud),
            1 => Some(FraudClass::Fraud),
            _ => None,
        }
    }

    pub fn is_fraud(self) -> bool {
        self == FraudClass::Fraud
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            FraudClass::NotFraud => "Not fraud",
            FraudClass::Fraud => "Fraud",
        }
    }
}

/// Output of one classifier for one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Registry key, e.g. "random_forest"
    pub model_key: String,

    /// Display name, e.g. "Random Forest"
    pub model_name: String,

    /// Predicted class
    pub predicted_class: FraudClass,

    /// Probability of the predicted class (not necessarily of fraud)
    pub probability: f64,

    /// Accuracy measured at training time, in percent
    pub reported_accuracy: f64,

    /// F1-score measured at training time, in percent
    pub reported_f1: f64,
}

impl PredictionResult {
    /// Format the result for display
    pub fn to_card(&self) -> PredictionCard {
        PredictionCard {
            model_name: self.model_name.clone(),
            label: self.predicted_class.label().to_string(),
            is_fraud: self.predicted_class.is_fraud(),
            probability_text: format!("{:.2}%", self.probability * 100.0),
            accuracy_text: format!("Model accuracy: {:.1}%", self.reported_accuracy),
        }
    }
}

/// Display-ready rendering of a [`PredictionResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionCard {
    pub model_name: String,
    pub label: String,
    pub is_fraud: bool,
    pub probability_text: String,
    pub accuracy_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_formatting() {
        let result = PredictionResult {
            model_key: "xgboost".to_string(),
            model_name: "XGBoost".to_string(),
            predicted_class: FraudClass::Fraud,
            probability: 0.98765,
            reported_accuracy: 99.2,
            reported_f1: 99.2,
        };

        let card = result.to_card();
        assert_eq!(card.label, "Fraud");
        assert!(card.is_fraud);
        assert_eq!(card.probability_text, "98.77%");
        assert_eq!(card.accuracy_text, "Model accuracy: 99.2%");
    }

    #[test]
    fn test_fraud_class_index() {
        assert_eq!(FraudClass::from_index(0), Some(FraudClass::NotFraud));
        assert_eq!(FraudClass::from_index(1), Some(FraudClass::Fraud));
        assert_eq!(FraudClass::from_index(2), None);
        assert_eq!(
            serde_json::to_string(&FraudClass::NotFraud).unwrap(),
            "\"not_fraud\""
        );
    }
}
