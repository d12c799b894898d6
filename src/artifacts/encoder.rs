//! Fitted label encoders for the categorical form fields

use crate::artifacts::read_json;
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Deserialize)]
struct EncoderFile {
    classes: Vec<String>,
}

/// Maps a fixed vocabulary of labels to integer codes.
///
/// The code of a label is its position in `classes`. Fitted encoders store
/// their classes sorted, so codes follow lexical order.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    field: &'static str,
    classes: Vec<String>,
    codes: HashMap<String, usize>,
}

impl LabelEncoder {
    /// Build an encoder for `field` from its known classes
    pub fn from_classes(field: &'static str, classes: Vec<String>) -> std::result::Result<Self, String> {
        if classes.is_empty() {
            return Err(format!("encoder for {} has no classes", field));
        }

        let mut codes = HashMap::with_capacity(classes.len());
        for (code, class) in classes.iter().enumerate() {
            if codes.insert(class.clone(), code).is_some() {
                return Err(format!("duplicate class '{}' in {} encoder", class, field));
            }
        }
        if let Some(pair) = classes.windows(2).find(|pair| pair[0] > pair[1]) {
            return Err(format!(
                "{} encoder classes are not sorted: '{}' comes before '{}'",
                field, pair[0], pair[1]
            ));
        }

        Ok(Self {
            field,
            classes,
            codes,
        })
    }

    /// Load an encoder from a `{"classes": [...]}` JSON file
    pub fn load<P: AsRef<Path>>(path: P, field: &'static str) -> Result<Self> {
        let path = path.as_ref();
        let file: EncoderFile = read_json(path)?;
        Self::from_classes(field, file.classes).map_err(|reason| PipelineError::artifact(path, reason))
    }

    /// Known classes in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Integer code of `value`
    pub fn transform(&self, value: &str) -> Result<usize> {
        self.codes
            .get(value)
            .copied()
            .ok_or_else(|| PipelineError::UnknownCategory {
                field: self.field,
                value: value.to_string(),
            })
    }

    /// Label of `code`, if it is in range
    pub fn inverse_transform(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> LabelEncoder {
        LabelEncoder::from_classes(
            "category",
            vec![
                "entertainment".to_string(),
                "grocery_pos".to_string(),
                "shopping_net".to_string(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_transform_uses_class_position() {
        let encoder = categories();
        assert_eq!(encoder.transform("entertainment").unwrap(), 0);
        assert_eq!(encoder.transform("grocery_pos").unwrap(), 1);
        assert_eq!(encoder.transform("shopping_net").unwrap(), 2);
    }

    #[test]
    fn test_unknown_value() {
        let encoder = categories();
        let err = encoder.transform("not_a_real_category").unwrap_err();
        match err {
            PipelineError::UnknownCategory { field, value } => {
                assert_eq!(field, "category");
                assert_eq!(value, "not_a_real_category");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_vocabulary_round_trip() {
        let encoder = categories();
        for class in encoder.classes() {
            let code = encoder.transform(class).unwrap();
            assert_eq!(encoder.inverse_transform(code), Some(class.as_str()));
        }
        assert_eq!(encoder.inverse_transform(3), None);
    }

    #[test]
    fn test_rejects_bad_vocabulary() {
        assert!(LabelEncoder::from_classes("gender", vec![]).is_err());
        assert!(
            LabelEncoder::from_classes("gender", vec!["F".to_string(), "F".to_string()]).is_err()
        );
    }

    #[test]
    fn test_rejects_unsorted_vocabulary() {
        let err = LabelEncoder::from_classes(
            "job",
            vec!["Teacher".to_string(), "Engineer".to_string()],
        )
        .unwrap_err();
        assert!(err.contains("not sorted"));
    }

    #[test]
    fn test_load_rejects_unsorted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label_encoder_category.json");
        std::fs::write(&path, r#"{"classes": ["travel", "grocery_pos"]}"#).unwrap();

        let err = LabelEncoder::load(&path, "category").unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactLoad { .. }));
    }
}
