use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use super::adapter::SentimentAdapter;
use super::encoding::PaddingPolicy;
use super::error::AdapterError;
use super::labels::{LabelField, LabelTable};
use crate::model_manager::ExpectedHashes;
use crate::models::Preset;
use crate::runtime::RuntimeConfig;

const DEFAULT_MAX_LENGTH: usize = 512;

/// Deployment configuration of a [`SentimentAdapter`].
///
/// Deserializable from JSON; missing fields fall back to the three-class defaults.
///
/// ```
/// use sentiment_adapter::AdapterConfig;
///
/// let config: AdapterConfig = serde_json::from_str(r#"{
///     "labels": {"labels": ["1 star", "2 stars", "3 stars", "4 stars", "5 stars"], "field": "review"},
///     "padding": "batch_longest",
///     "return_probabilities": false
/// }"#).unwrap();
/// assert_eq!(config.labels.len(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub labels: LabelTable,
    pub padding: PaddingPolicy,
    pub max_length: usize,
    pub return_probabilities: bool,
    pub return_confidence: bool,
    pub runtime: RuntimeConfig,
    /// Cache root for remote artifacts; the platform default when unset
    pub cache_dir: Option<PathBuf>,
    pub expected_hashes: ExpectedHashes,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            labels: LabelTable::three_class(),
            padding: PaddingPolicy::Fixed,
            max_length: DEFAULT_MAX_LENGTH,
            return_probabilities: true,
            return_confidence: true,
            runtime: RuntimeConfig::default(),
            cache_dir: None,
            expected_hashes: ExpectedHashes::default(),
        }
    }
}

impl AdapterConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AdapterError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.max_length == 0 {
            return Err(AdapterError::Build("max_length must be greater than zero".into()));
        }
        Ok(())
    }
}

/// A builder for constructing a SentimentAdapter with a fluent interface.
///
/// The adapter it builds is not loaded; call [`SentimentAdapter::load`] next.
///
/// ```
/// use sentiment_adapter::{SentimentAdapter, LabelField, PaddingPolicy};
///
/// let adapter = SentimentAdapter::builder()
///     .with_labels(vec!["bad", "good"], LabelField::Sentiment)?
///     .with_padding(PaddingPolicy::BatchLongest)
///     .with_max_length(128)
///     .with_probabilities(false)
///     .build()?;
/// assert!(!adapter.is_loaded());
/// # Ok::<(), sentiment_adapter::AdapterError>(())
/// ```
#[derive(Debug, Default)]
pub struct AdapterBuilder {
    config: AdapterConfig,
}

impl AdapterBuilder {
    /// Creates a builder with the three-class defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a known deployment preset
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            config: preset.config(),
        }
    }

    /// Replaces the whole configuration, e.g. one read with [`AdapterConfig::from_file`]
    pub fn with_config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the ordered label table; `labels[i]` names class index `i`.
    ///
    /// # Errors
    /// `Build` if the list is empty, has a blank or duplicate label, or exceeds 100 entries.
    pub fn with_labels(
        mut self,
        labels: Vec<impl Into<String>>,
        field: LabelField,
    ) -> Result<Self, AdapterError> {
        self.config.labels = LabelTable::new(labels, field)?;
        Ok(self)
    }

    pub fn with_label_table(mut self, labels: LabelTable) -> Self {
        self.config.labels = labels;
        self
    }

    pub fn with_label_field(mut self, field: LabelField) -> Self {
        self.config.labels = self.config.labels.with_field(field);
        self
    }

    pub fn with_padding(mut self, padding: PaddingPolicy) -> Self {
        self.config.padding = padding;
        self
    }

    /// Truncation length, and the padded length under [`PaddingPolicy::Fixed`]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.config.max_length = max_length;
        self
    }

    pub fn with_probabilities(mut self, retain: bool) -> Self {
        self.config.return_probabilities = retain;
        self
    }

    pub fn with_confidence(mut self, retain: bool) -> Self {
        self.config.return_confidence = retain;
        self
    }

    /// Sets the runtime configuration for ONNX model execution
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.config.runtime = config;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = Some(dir.into());
        self
    }

    pub fn with_expected_hashes(mut self, hashes: ExpectedHashes) -> Self {
        self.config.expected_hashes = hashes;
        self
    }

    /// Validates the configuration and returns an unloaded adapter
    pub fn build(self) -> Result<SentimentAdapter, AdapterError> {
        self.config.validate()?;
        info!(
            "Built adapter: {} labels under '{}', padding {:?}, max_length {}",
            self.config.labels.len(),
            self.config.labels.field(),
            self.config.padding,
            self.config.max_length
        );
        Ok(SentimentAdapter::new(self.config))
    }
}
