//! Feature extraction for fraud model inference.
//!
//! Turns a form submission into the numeric vector the scaler and both
//! classifiers were trained on. Column order is fixed by training.

use crate::artifacts::LabelEncoder;
use crate::error::Result;
use crate::types::transaction::TransactionInput;

/// Training-time column order
pub const FEATURE_COLUMNS: [&str; 8] = [
    "amt",
    "category",
    "gender",
    "job",
    "city_pop",
    "hour",
    "age",
    "distance_km",
];

/// Submission with categorical fields replaced by their codes
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatureVector {
    columns: &'static [&'static str],
    values: Vec<f64>,
}

impl EncodedFeatureVector {
    pub fn new(columns: &'static [&'static str], values: Vec<f64>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Encoded vector after normalization by the fitted scaler
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledFeatureVector {
    columns: &'static [&'static str],
    values: Vec<f64>,
}

impl ScaledFeatureVector {
    pub fn new(columns: &'static [&'static str], values: Vec<f64>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Model input tensor row
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v as f32).collect()
    }
}

/// Feature extractor that encodes form submissions into model input features.
///
/// Holds the three label encoders fitted during training.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    category: LabelEncoder,
    gender: LabelEncoder,
    job: LabelEncoder,
}

impl FeatureExtractor {
    /// Create a new feature extractor from the fitted encoders.
    pub fn new(category: LabelEncoder, gender: LabelEncoder, job: LabelEncoder) -> Self {
        Self {
            category,
            gender,
            job,
        }
    }

    /// Extract features from a submission.
    ///
    /// Numeric ranges are validated first, then every categorical field is
    /// looked up in its encoder. Returns the vector in [`FEATURE_COLUMNS`] order.
    pub fn extract(&self, tx: &TransactionInput) -> Result<EncodedFeatureVector> {
        tx.validate()?;

        let category = self.category.transform(&tx.category)?;
        let gender = self.gender.transform(&tx.gender)?;
        let job = self.job.transform(&tx.job)?;

        let values = vec![
            tx.amount,
            category as f64,
            gender as f64,
            job as f64,
            tx.city_population as f64,
            tx.hour as f64,
            tx.age as f64,
            tx.distance_km,
        ];

        Ok(EncodedFeatureVector::new(&FEATURE_COLUMNS, values))
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COLUMNS.len()
    }

    /// Get feature names (training order).
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_COLUMNS
    }

    pub fn category_encoder(&self) -> &LabelEncoder {
        &self.category
    }

    pub fn gender_encoder(&self) -> &LabelEncoder {
        &self.gender
    }

    pub fn job_encoder(&self) -> &LabelEncoder {
        &self.job
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn encoder(field: &'static str, classes: &[&str]) -> LabelEncoder {
        LabelEncoder::from_classes(field, classes.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(
            encoder("category", &["entertainment", "grocery_pos", "travel"]),
            encoder("gender", &["F", "M"]),
            encoder("job", &["Engineer", "Nurse", "Teacher"]),
        )
    }

    #[test]
    fn test_feature_extraction() {
        let extractor = extractor();
        let tx = TransactionInput::new("grocery_pos", "F", "Teacher");

        let features = extractor.extract(&tx).unwrap();

        assert_eq!(features.len(), extractor.feature_count());
        assert_eq!(
            features.values(),
            &[100.0, 1.0, 0.0, 2.0, 3000.0, 12.0, 30.0, 10.0]
        );
        assert_eq!(features.columns(), &FEATURE_COLUMNS);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = extractor();
        let mut tx = TransactionInput::new("travel", "M", "Nurse");
        tx.amount = 912.37;
        tx.hour = 2;

        let first = extractor.extract(&tx).unwrap();
        let second = extractor.extract(&tx).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_category() {
        let extractor = extractor();
        let tx = TransactionInput::new("not_a_real_category", "F", "Teacher");

        let err = extractor.extract(&tx).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnknownCategory { field: "category", .. }
        ));
    }

    #[test]
    fn test_unknown_job_and_gender() {
        let extractor = extractor();

        let tx = TransactionInput::new("travel", "X", "Teacher");
        assert!(matches!(
            extractor.extract(&tx),
            Err(PipelineError::UnknownCategory { field: "gender", .. })
        ));

        let tx = TransactionInput::new("travel", "F", "Astronaut");
        assert!(matches!(
            extractor.extract(&tx),
            Err(PipelineError::UnknownCategory { field: "job", .. })
        ));
    }

    #[test]
    fn test_feature_count() {
        let extractor = extractor();
        assert_eq!(extractor.feature_count(), 8);
        assert_eq!(extractor.feature_names().len(), 8);
    }
}
