mod adapter;
pub mod builder;
mod encoding;
mod error;
mod labels;
mod model;
mod types;
mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::SentimentAdapter;
pub use builder::{AdapterBuilder, AdapterConfig};
pub use encoding::PaddingPolicy;
pub use error::AdapterError;
pub use labels::{LabelField, LabelTable};
pub use model::{ModelArtifact, OnnxClassifier, SequenceClassifier};
pub use types::{EncodedBatch, Instance, LabeledPrediction, PredictionResponse, RawPrediction, RawRequest};

/// Information about the current state and configuration of an adapter
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterInfo {
    /// Location the artifact was loaded from, once loaded
    pub artifact_location: Option<String>,
    /// Labels in class-index order
    pub labels: Vec<String>,
    /// Response key the label is reported under
    pub label_field: LabelField,
    pub padding: PaddingPolicy,
    pub max_length: usize,
    pub return_probabilities: bool,
    pub return_confidence: bool,
    pub loaded: bool,
}
