//! Fitted per-column feature scaler

use crate::artifacts::read_json;
use crate::error::{PipelineError, Result};
use crate::feature_extractor::{EncodedFeatureVector, ScaledFeatureVector};
use serde::Deserialize;
use std::path::Path;

/// Learned normalization parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerParams {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `(x - data_min) / (data_max - data_min)` mapped onto `feature_range`
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "default_feature_range")]
        feature_range: (f64, f64),
    },
}

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

#[derive(Deserialize)]
struct ScalerFile {
    #[serde(default)]
    feature_names: Vec<String>,
    #[serde(flatten)]
    params: ScalerParams,
}

/// Scaler fitted at training time, frozen after load
#[derive(Debug, Clone)]
pub struct FeatureScaler {
    feature_names: Vec<String>,
    params: ScalerParams,
}

impl FeatureScaler {
    /// Build a scaler, checking that every parameter column lines up.
    ///
    /// `feature_names` may be empty when the artifact did not record them;
    /// only the column count is checked then.
    pub fn new(feature_names: Vec<String>, params: ScalerParams) -> std::result::Result<Self, String> {
        let columns = match &params {
            ScalerParams::Standard { mean, scale } => {
                if mean.len() != scale.len() {
                    return Err(format!(
                        "mean has {} columns but scale has {}",
                        mean.len(),
                        scale.len()
                    ));
                }
                mean.len()
            }
            ScalerParams::MinMax {
                data_min,
                data_max,
                feature_range,
            } => {
                if data_min.len() != data_max.len() {
                    return Err(format!(
                        "data_min has {} columns but data_max has {}",
                        data_min.len(),
                        data_max.len()
                    ));
                }
                if feature_range.0 >= feature_range.1 {
                    return Err(format!("invalid feature_range {:?}", feature_range));
                }
                data_min.len()
            }
        };

        if columns == 0 {
            return Err("scaler has no columns".to_string());
        }
        if !feature_names.is_empty() && feature_names.len() != columns {
            return Err(format!(
                "{} feature names for {} columns",
                feature_names.len(),
                columns
            ));
        }

        Ok(Self {
            feature_names,
            params,
        })
    }

    /// Load a scaler from its JSON artifact
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file: ScalerFile = read_json(path)?;
        Self::new(file.feature_names, file.params).map_err(|reason| PipelineError::artifact(path, reason))
    }

    /// Number of columns the scaler was fitted on
    pub fn n_features(&self) -> usize {
        match &self.params {
            ScalerParams::Standard { mean, .. } => mean.len(),
            ScalerParams::MinMax { data_min, .. } => data_min.len(),
        }
    }

    /// Column names recorded at fit time (may be empty)
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Normalize an encoded vector column by column
    pub fn transform(&self, encoded: &EncodedFeatureVector) -> Result<ScaledFeatureVector> {
        let values = encoded.values();
        if values.len() != self.n_features() {
            return Err(PipelineError::shape(
                "scaler input",
                format!("{} columns", self.n_features()),
                format!("{} columns", values.len()),
            ));
        }

        if !self.feature_names.is_empty() {
            let columns = encoded.columns();
            let aligned = columns.len() == self.feature_names.len()
                && columns
                    .iter()
                    .zip(&self.feature_names)
                    .all(|(a, b)| *a == b.as_str());
            if !aligned {
                return Err(PipelineError::shape(
                    "scaler column order",
                    self.feature_names.join(","),
                    columns.join(","),
                ));
            }
        }

        let scaled = match &self.params {
            ScalerParams::Standard { mean, scale } => values
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(&x, (&m, &s))| (x - m) / non_zero(s))
                .collect(),
            ScalerParams::MinMax {
                data_min,
                data_max,
                feature_range: (lo, hi),
            } => values
                .iter()
                .zip(data_min.iter().zip(data_max))
                .map(|(&x, (&min, &max))| (x - min) / non_zero(max - min) * (hi - lo) + lo)
                .collect(),
        };

        Ok(ScaledFeatureVector::new(encoded.columns(), scaled))
    }
}

// Constant columns are left unscaled.
fn non_zero(value: f64) -> f64 {
    if value.abs() < f64::EPSILON {
        1.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extractor::FEATURE_COLUMNS;

    fn names() -> Vec<String> {
        FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect()
    }

    fn encoded() -> EncodedFeatureVector {
        EncodedFeatureVector::new(&FEATURE_COLUMNS, vec![100.0, 4.0, 0.0, 10.0, 3000.0, 12.0, 30.0, 10.0])
    }

    #[test]
    fn test_standard_scaling() {
        let scaler = FeatureScaler::new(
            names(),
            ScalerParams::Standard {
                mean: vec![50.0, 4.0, 0.5, 10.0, 1000.0, 12.0, 40.0, 0.0],
                scale: vec![25.0, 2.0, 0.5, 5.0, 1000.0, 0.0, 10.0, 5.0],
            },
        )
        .unwrap();

        let scaled = scaler.transform(&encoded()).unwrap();
        assert_eq!(scaled.len(), 8);
        assert_eq!(scaled.values()[0], 2.0);
        assert_eq!(scaled.values()[2], -1.0);
        assert_eq!(scaled.values()[4], 2.0);
        // zero scale column passes through centered
        assert_eq!(scaled.values()[5], 0.0);
        assert_eq!(scaled.values()[6], -1.0);
        assert_eq!(scaled.columns(), &FEATURE_COLUMNS);
    }

    #[test]
    fn test_min_max_scaling() {
        let scaler = FeatureScaler::new(
            Vec::new(),
            ScalerParams::MinMax {
                data_min: vec![0.0; 8],
                data_max: vec![200.0, 8.0, 1.0, 20.0, 6000.0, 24.0, 60.0, 20.0],
                feature_range: (0.0, 1.0),
            },
        )
        .unwrap();

        let scaled = scaler.transform(&encoded()).unwrap();
        for value in scaled.values() {
            assert!((value - 0.5).abs() < 1e-12 || *value == 0.0);
        }
    }

    #[test]
    fn test_column_count_mismatch() {
        let scaler = FeatureScaler::new(
            Vec::new(),
            ScalerParams::Standard {
                mean: vec![0.0; 7],
                scale: vec![1.0; 7],
            },
        )
        .unwrap();

        let err = scaler.transform(&encoded()).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_column_order_mismatch() {
        let mut swapped = names();
        swapped.swap(0, 1);
        let scaler = FeatureScaler::new(
            swapped,
            ScalerParams::Standard {
                mean: vec![0.0; 8],
                scale: vec![1.0; 8],
            },
        )
        .unwrap();

        let err = scaler.transform(&encoded()).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_parse_artifact() {
        let json = r#"{
            "kind": "standard",
            "feature_names": ["a", "b"],
            "mean": [1.0, 2.0],
            "scale": [1.0, 2.0]
        }"#;
        let file: ScalerFile = serde_json::from_str(json).unwrap();
        let scaler = FeatureScaler::new(file.feature_names, file.params).unwrap();
        assert_eq!(scaler.n_features(), 2);

        let uneven = ScalerParams::Standard {
            mean: vec![1.0, 2.0],
            scale: vec![1.0],
        };
        assert!(FeatureScaler::new(Vec::new(), uneven).is_err());
    }
}
