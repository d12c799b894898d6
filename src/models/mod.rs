//! Classifier runtimes and the multi-model inference engine

pub mod classifier;
pub mod comparison;
pub mod inference;
pub mod loader;
pub mod onnx;
pub mod tree_ensemble;

pub use classifier::{ClassPrediction, Classifier};
pub use comparison::ModelComparison;
pub use inference::{InferenceEngine, RegisteredModel};
pub use loader::ModelLoader;
