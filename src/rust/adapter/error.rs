use ort::Error as OrtError;

use crate::model_manager::ArtifactError;

/// Represents the different types of errors that can occur in the sentiment adapter.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// A pipeline stage was called before the artifact was loaded
    #[error("Adapter not loaded: call load() before encode/infer/decode")]
    NotLoaded,
    /// A request instance is missing its `text` field or carries an invalid one
    #[error("Malformed input at instance {index}: {reason}")]
    MalformedInput { index: usize, reason: String },
    /// The request envelope itself is unusable
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Error occurred while loading or using the tokenizer
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
    /// The forward pass failed or produced an output of the wrong shape
    #[error("Model execution failure: {0}")]
    ModelExecutionFailure(String),
    /// The model produced a class index outside the label table
    #[error("Unknown class index {class_index} for instance {index} (label table has {num_labels} entries)")]
    UnknownClassIndex {
        index: usize,
        class_index: usize,
        num_labels: usize,
    },
    /// Error occurred while building the adapter or validating its configuration
    #[error("Build error: {0}")]
    Build(String),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<OrtError> for AdapterError {
    fn from(err: OrtError) -> Self {
        AdapterError::Build(err.to_string())
    }
}

impl AdapterError {
    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        AdapterError::MalformedInput {
            index,
            reason: reason.into(),
        }
    }
}
