//! Transaction form submission

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Accepted hour-of-day range
pub const HOUR_RANGE: (u8, u8) = (0, 23);

/// Accepted customer age range
pub const AGE_RANGE: (u8, u8) = (18, 100);

/// A card transaction entered through the prediction form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    /// Transaction amount (USD)
    #[serde(alias = "amt")]
    pub amount: f64,

    /// Merchant category, e.g. "grocery_pos"
    pub category: String,

    /// Card holder gender ("F" / "M")
    pub gender: String,

    /// Card holder job title
    pub job: String,

    /// Population of the card holder's city
    #[serde(alias = "city_pop")]
    pub city_population: u64,

    /// Hour of day the transaction happened (0-23)
    pub hour: u8,

    /// Card holder age in years (18-100)
    pub age: u8,

    /// Distance between card holder and merchant in km
    pub distance_km: f64,
}

impl TransactionInput {
    /// Create a submission with the form's default numeric values
    pub fn new(category: &str, gender: &str, job: &str) -> Self {
        let defaults = FormDefaults::default();
        Self {
            amount: defaults.amount,
            category: category.to_string(),
            gender: gender.to_string(),
            job: job.to_string(),
            city_population: defaults.city_population,
            hour: defaults.hour,
            age: defaults.age,
            distance_km: defaults.distance_km,
        }
    }

    /// Check numeric fields against the ranges the form accepts.
    ///
    /// Categorical fields are checked later against the encoders.
    pub fn validate(&self) -> Result<()> {
        non_negative("amount", self.amount)?;
        non_negative("distance_km", self.distance_km)?;

        if self.hour > HOUR_RANGE.1 {
            return Err(PipelineError::InvalidInput {
                field: "hour",
                reason: format!(
                    "{} is outside {}-{}",
                    self.hour, HOUR_RANGE.0, HOUR_RANGE.1
                ),
            });
        }

        if self.age < AGE_RANGE.0 || self.age > AGE_RANGE.1 {
            return Err(PipelineError::InvalidInput {
                field: "age",
                reason: format!("{} is outside {}-{}", self.age, AGE_RANGE.0, AGE_RANGE.1),
            });
        }

        Ok(())
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(PipelineError::InvalidInput {
            field,
            reason: "must be a finite number".to_string(),
        });
    }
    if value < 0.0 {
        return Err(PipelineError::InvalidInput {
            field,
            reason: format!("{} is negative", value),
        });
    }
    Ok(())
}

/// Initial values shown in the form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefaults {
    pub amount: f64,
    pub city_population: u64,
    pub hour: u8,
    pub age: u8,
    pub distance_km: f64,
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            amount: 100.0,
            city_population: 3000,
            hour: 12,
            age: 30,
            distance_km: 10.0,
        }
    }
}
