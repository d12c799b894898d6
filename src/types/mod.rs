//! Type definitions for the prediction service

pub mod prediction;
pub mod transaction;

pub use prediction::{FraudClass, PredictionCard, PredictionResult};
pub use transaction::{FormDefaults, TransactionInput};
