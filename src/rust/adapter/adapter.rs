use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use serde_json::Value;
use tokenizers::Tokenizer;

use super::builder::{AdapterBuilder, AdapterConfig};
use super::encoding::{configure_tokenizer, TextEncoding};
use super::error::AdapterError;
use super::model::ModelArtifact;
use super::types::{EncodedBatch, LabeledPrediction, PredictionResponse, RawPrediction, RawRequest};
use super::utils::{argmax, softmax};
use super::AdapterInfo;
use crate::model_manager::{ArtifactLocation, ModelManager};

/// A four-stage sentiment classification pipeline.
///
/// The host calls [`load`](Self::load) once, then
/// [`encode`](Self::encode) → [`infer`](Self::infer) → [`decode`](Self::decode)
/// for every request batch. Every stage before `load` fails with
/// [`AdapterError::NotLoaded`].
///
/// # Thread Safety
///
/// The loaded artifact is immutable and held in an `Arc`, so a loaded adapter can
/// be shared across threads behind an `Arc` and its stages called concurrently.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use sentiment_adapter::{SentimentAdapter, Preset, RawRequest};
///
/// let mut adapter = SentimentAdapter::builder_from_preset(Preset::ThreeClass).build()?;
/// adapter.load("/opt/models/sentiment")?;
///
/// let request = RawRequest::from_texts(["great product", "never again"]);
/// let response = adapter.predict(&request)?;
/// assert_eq!(response.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SentimentAdapter {
    config: AdapterConfig,
    artifact: Option<Arc<ModelArtifact>>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<SentimentAdapter>();
    }
};

impl TextEncoding for SentimentAdapter {
    fn tokenizer(&self) -> Option<&Tokenizer> {
        self.artifact.as_ref().map(|artifact| &artifact.tokenizer)
    }
}

impl SentimentAdapter {
    pub(crate) fn new(config: AdapterConfig) -> Self {
        Self {
            config,
            artifact: None,
        }
    }

    /// Creates a new AdapterBuilder for fluent construction
    pub fn builder() -> AdapterBuilder {
        AdapterBuilder::new()
    }

    pub fn builder_from_preset(preset: crate::Preset) -> AdapterBuilder {
        AdapterBuilder::from_preset(preset)
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.artifact.is_some()
    }

    /// Returns information about the adapter's current state
    pub fn info(&self) -> AdapterInfo {
        AdapterInfo {
            artifact_location: self.artifact.as_ref().map(|a| a.location.clone()),
            labels: self.config.labels.labels().to_vec(),
            label_field: self.config.labels.field(),
            padding: self.config.padding,
            max_length: self.config.max_length,
            return_probabilities: self.config.return_probabilities,
            return_confidence: self.config.return_confidence,
            loaded: self.is_loaded(),
        }
    }

    /// Initialize: resolves `location` and loads the tokenizer and ONNX model.
    ///
    /// `location` is a directory path, a `file://` URI or an `http(s)://` base URL
    /// whose files were already fetched with [`ModelManager::fetch`]. Once loaded,
    /// further calls leave the existing artifact in place.
    ///
    /// # Errors
    /// - `Artifact` if the location cannot be resolved
    /// - `Tokenizer` / `Build` if the files fail to load or the model does not fit the label table
    pub fn load(&mut self, location: &str) -> Result<(), AdapterError> {
        if let Some(artifact) = &self.artifact {
            warn!(
                "Adapter already loaded from {}; ignoring load of {}",
                artifact.location, location
            );
            return Ok(());
        }

        let start = Instant::now();
        info!("Loading model artifacts from {}", location);
        let parsed = ArtifactLocation::parse(location)?;
        let paths = match &parsed {
            ArtifactLocation::Local(dir) => ModelManager::resolve_local(dir)?,
            ArtifactLocation::Remote(_) => {
                let manager = match &self.config.cache_dir {
                    Some(dir) => ModelManager::new(dir)?,
                    None => ModelManager::new_default()?,
                };
                manager.resolve(&parsed)?
            }
        };
        let artifact = ModelArtifact::from_files(location, &paths, &self.config.runtime)?;
        self.load_artifact(artifact)?;
        info!("Adapter ready (took {:.2?})", start.elapsed());
        Ok(())
    }

    /// Installs an already constructed artifact, applying this adapter's
    /// padding and truncation policy to its tokenizer.
    pub fn load_artifact(&mut self, mut artifact: ModelArtifact) -> Result<(), AdapterError> {
        if let Some(existing) = &self.artifact {
            warn!(
                "Adapter already loaded from {}; ignoring artifact from {}",
                existing.location, artifact.location
            );
            return Ok(());
        }

        configure_tokenizer(&mut artifact.tokenizer, self.config.padding, self.config.max_length)?;

        if let Some(num_labels) = artifact.model.num_labels() {
            if num_labels != self.config.labels.len() {
                return Err(AdapterError::Build(format!(
                    "Model head has {} classes but the label table has {} labels",
                    num_labels,
                    self.config.labels.len()
                )));
            }
        }

        self.artifact = Some(Arc::new(artifact));
        Ok(())
    }

    fn artifact(&self) -> Result<&ModelArtifact, AdapterError> {
        self.artifact.as_deref().ok_or(AdapterError::NotLoaded)
    }

    /// Encode: tokenizes every instance's text, in order, into one batch.
    ///
    /// # Errors
    /// - `NotLoaded` before [`load`](Self::load)
    /// - `MalformedInput` naming the first instance without `text`; the whole batch fails
    pub fn encode(&self, request: &RawRequest) -> Result<EncodedBatch, AdapterError> {
        self.artifact()?;
        let texts = request.texts()?;
        let batch = self.encode_texts(&texts)?;
        debug!("Encoded {} instances into {:?}", batch.len(), batch.input_ids.dim());
        Ok(batch)
    }

    /// Counts the tokens the loaded tokenizer produces for `text`, after truncation and padding.
    pub fn count_tokens(&self, text: &str) -> Result<usize, AdapterError> {
        TextEncoding::count_tokens(self, text)
    }

    /// Infer: one forward pass over the whole batch.
    ///
    /// Softmax is only computed when probabilities or confidence are retained; the
    /// predicted class is the argmax either way.
    ///
    /// # Errors
    /// - `NotLoaded` before [`load`](Self::load)
    /// - `ModelExecutionFailure` if the forward pass fails or returns the wrong shape
    pub fn infer(&self, batch: &EncodedBatch) -> Result<Vec<RawPrediction>, AdapterError> {
        let artifact = self.artifact()?;
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let logits = artifact.model.logits(batch)?;
        if logits.nrows() != batch.len() {
            return Err(AdapterError::ModelExecutionFailure(format!(
                "Model returned {} rows for a batch of {}",
                logits.nrows(),
                batch.len()
            )));
        }
        if logits.ncols() == 0 {
            return Err(AdapterError::ModelExecutionFailure(
                "Model returned no class scores".into(),
            ));
        }
        debug!("Forward pass over {:?} took {:.2?}", batch.input_ids.dim(), start.elapsed());

        let retain_probabilities = self.config.return_probabilities;
        let retain_confidence = self.config.return_confidence;

        logits
            .outer_iter()
            .map(|row| -> Result<RawPrediction, AdapterError> {
                if retain_probabilities || retain_confidence {
                    let probabilities = softmax(row);
                    let (class_index, confidence) = argmax(probabilities.view())
                        .ok_or_else(|| AdapterError::ModelExecutionFailure("Empty probability row".into()))?;
                    Ok(RawPrediction {
                        class_index,
                        probabilities: retain_probabilities.then(|| probabilities.to_vec()),
                        confidence: retain_confidence.then_some(confidence),
                    })
                } else {
                    let (class_index, _) = argmax(row)
                        .ok_or_else(|| AdapterError::ModelExecutionFailure("Empty logit row".into()))?;
                    Ok(RawPrediction {
                        class_index,
                        probabilities: None,
                        confidence: None,
                    })
                }
            })
            .collect()
    }

    /// Decode: maps class indices through the label table.
    ///
    /// # Errors
    /// - `NotLoaded` before [`load`](Self::load)
    /// - `UnknownClassIndex` if an index falls outside the table
    pub fn decode(&self, predictions: Vec<RawPrediction>) -> Result<PredictionResponse, AdapterError> {
        self.artifact()?;
        let labels = &self.config.labels;

        let predictions = predictions
            .into_iter()
            .enumerate()
            .map(|(index, prediction)| -> Result<LabeledPrediction, AdapterError> {
                let label = labels.label_for(index, prediction.class_index)?;
                Ok(LabeledPrediction {
                    label: label.to_string(),
                    field: labels.field(),
                    confidence: prediction.confidence,
                    probabilities: prediction.probabilities,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PredictionResponse { predictions })
    }

    /// Runs encode, infer and decode in sequence.
    pub fn predict(&self, request: &RawRequest) -> Result<PredictionResponse, AdapterError> {
        let batch = self.encode(request)?;
        let raw = self.infer(&batch)?;
        self.decode(raw)
    }

    /// Handles a JSON-like request mapping and returns the JSON response envelope.
    pub fn predict_json(&self, request: &Value) -> Result<Value, AdapterError> {
        let request = RawRequest::from_json(request)?;
        let response = self.predict(&request)?;
        Ok(serde_json::to_value(response)?)
    }
}
