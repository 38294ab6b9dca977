use std::collections::HashMap;
use std::fmt;

use log::{debug, error, info};
use ndarray::{Array2, Ix2};
use ort::session::Session;
use ort::value::{Tensor, ValueType};
use tokenizers::Tokenizer;

use super::error::AdapterError;
use super::types::EncodedBatch;
use crate::model_manager::ArtifactPaths;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A model head that scores every row of an encoded batch.
///
/// The ONNX implementation is the production backend; anything else that can
/// turn token ids into `[batch, num_labels]` logits can be plugged in through
/// [`ModelArtifact::new`].
pub trait SequenceClassifier: Send + Sync + fmt::Debug {
    /// Runs one forward pass over the whole batch and returns raw logits.
    fn logits(&self, batch: &EncodedBatch) -> Result<Array2<f32>, AdapterError>;

    /// Size of the classification head, when the model declares it statically.
    fn num_labels(&self) -> Option<usize> {
        None
    }
}

/// The loaded tokenizer and classification model.
///
/// Immutable once handed to the adapter; shared read-only between threads.
#[derive(Debug)]
pub struct ModelArtifact {
    pub(crate) location: String,
    pub(crate) tokenizer: Tokenizer,
    pub(crate) model: Box<dyn SequenceClassifier>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<ModelArtifact>();
    }
};

impl ModelArtifact {
    /// Bundles a tokenizer and a model backend.
    ///
    /// The adapter applies its padding and truncation policy to `tokenizer` when
    /// the artifact is installed.
    pub fn new(
        location: impl Into<String>,
        tokenizer: Tokenizer,
        model: Box<dyn SequenceClassifier>,
    ) -> Self {
        Self {
            location: location.into(),
            tokenizer,
            model,
        }
    }

    /// Loads `tokenizer.json` and `model.onnx` from resolved artifact paths.
    pub fn from_files(
        location: impl Into<String>,
        paths: &ArtifactPaths,
        runtime_config: &RuntimeConfig,
    ) -> Result<Self, AdapterError> {
        let tokenizer = Tokenizer::from_file(&paths.tokenizer).map_err(|e| {
            error!("Failed to load tokenizer: {}", e);
            AdapterError::Tokenizer(format!("Failed to load tokenizer: {}", e))
        })?;
        info!("Tokenizer loaded from {:?}", paths.tokenizer);

        let session = create_session_builder(runtime_config)?.commit_from_file(&paths.model)?;
        let model = OnnxClassifier::new(session)?;
        info!("Model loaded from {:?}", paths.model);

        Ok(Self::new(location, tokenizer, Box::new(model)))
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

/// A sequence-classification head exported to ONNX.
///
/// Expects `input_ids` and `attention_mask` inputs (plus `token_type_ids` when the
/// graph declares it) and logits of shape `[batch, num_labels]` as the first output.
#[derive(Debug)]
pub struct OnnxClassifier {
    session: Session,
    feeds_token_type_ids: bool,
    num_labels: Option<usize>,
}

impl OnnxClassifier {
    pub fn new(session: Session) -> Result<Self, AdapterError> {
        Self::validate_model(&session)?;
        debug!("Model structure validated successfully");

        let feeds_token_type_ids = session.inputs.iter().any(|i| i.name == "token_type_ids");
        let num_labels = session.outputs.first().and_then(|output| match &output.output_type {
            ValueType::Tensor { dimensions, .. } => dimensions
                .last()
                .copied()
                .filter(|&d| d > 0)
                .map(|d| d as usize),
            _ => None,
        });

        Ok(Self {
            session,
            feeds_token_type_ids,
            num_labels,
        })
    }

    /// Validates that the model has the expected input/output structure
    fn validate_model(session: &Session) -> Result<(), AdapterError> {
        for required in ["input_ids", "attention_mask"] {
            if !session.inputs.iter().any(|i| i.name == required) {
                return Err(AdapterError::Build(format!(
                    "Model is missing required input '{}' (found: {:?})",
                    required,
                    session.inputs.iter().map(|i| i.name.as_str()).collect::<Vec<_>>()
                )));
            }
        }
        if session.outputs.is_empty() {
            return Err(AdapterError::Build(
                "Model must have at least 1 output for logits".to_string(),
            ));
        }
        Ok(())
    }
}

impl SequenceClassifier for OnnxClassifier {
    fn logits(&self, batch: &EncodedBatch) -> Result<Array2<f32>, AdapterError> {
        let tensor = |name: &str, array: &Array2<i64>| {
            Tensor::from_array(array.clone()).map_err(|e| {
                AdapterError::ModelExecutionFailure(format!("Failed to create {} tensor: {}", name, e))
            })
        };

        let mut input_tensors = HashMap::new();
        input_tensors.insert("input_ids", tensor("input_ids", &batch.input_ids)?);
        input_tensors.insert("attention_mask", tensor("attention_mask", &batch.attention_mask)?);
        if self.feeds_token_type_ids {
            input_tensors.insert("token_type_ids", tensor("token_type_ids", &batch.token_type_ids)?);
        }

        let outputs = self.session.run(input_tensors).map_err(|e| {
            AdapterError::ModelExecutionFailure(format!("Failed to run model: {}", e))
        })?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>().map_err(|e| {
            AdapterError::ModelExecutionFailure(format!("Failed to extract output tensor: {}", e))
        })?;

        output_tensor
            .into_dimensionality::<Ix2>()
            .map(|view| view.to_owned())
            .map_err(|e| {
                AdapterError::ModelExecutionFailure(format!("Expected [batch, num_labels] logits: {}", e))
            })
    }

    fn num_labels(&self) -> Option<usize> {
        self.num_labels
    }
}
