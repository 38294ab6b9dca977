use ndarray::Array2;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use serde_json::Value;

use super::error::AdapterError;
use super::labels::LabelField;

/// One unit of input within a batched request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
pub struct Instance {
    #[serde(default)]
    pub text: Option<String>,
}

impl Instance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// An ordered batch of instances, as received from the host.
///
/// A missing `instances` key deserializes to an empty batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
pub struct RawRequest {
    #[serde(default)]
    pub instances: Vec<Instance>,
}

impl RawRequest {
    pub fn new(instances: Vec<Instance>) -> Self {
        Self { instances }
    }

    /// Builds a request from plain strings.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            instances: texts.into_iter().map(Instance::new).collect(),
        }
    }

    /// Parses a JSON-like request mapping, validating every instance.
    ///
    /// Unlike plain deserialization this reports the index of the first
    /// instance that is not an object or whose `text` is missing or not a string.
    pub fn from_json(value: &Value) -> Result<Self, AdapterError> {
        let object = value
            .as_object()
            .ok_or_else(|| AdapterError::InvalidRequest("request must be a JSON object".into()))?;

        let instances = match object.get("instances") {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(AdapterError::InvalidRequest(
                    "`instances` must be an array".into(),
                ))
            }
        };

        let parsed = instances
            .iter()
            .enumerate()
            .map(|(index, item)| match item.get("text") {
                _ if !item.is_object() => Err(AdapterError::malformed(index, "instance must be an object")),
                Some(Value::String(text)) => Ok(Instance::new(text.as_str())),
                None | Some(Value::Null) => Err(AdapterError::malformed(index, "missing `text` field")),
                Some(_) => Err(AdapterError::malformed(index, "`text` must be a string")),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { instances: parsed })
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Returns every instance's text in order, or the index of the first one without text.
    pub(crate) fn texts(&self) -> Result<Vec<&str>, AdapterError> {
        self.instances
            .iter()
            .enumerate()
            .map(|(index, instance)| {
                instance
                    .text
                    .as_deref()
                    .ok_or_else(|| AdapterError::malformed(index, "missing `text` field"))
            })
            .collect()
    }
}

/// Token-level tensors for a batch, one row per instance.
///
/// All three matrices share the shape `[batch, seq_len]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBatch {
    pub input_ids: Array2<i64>,
    pub attention_mask: Array2<i64>,
    pub token_type_ids: Array2<i64>,
}

impl EncodedBatch {
    pub fn empty() -> Self {
        Self {
            input_ids: Array2::zeros((0, 0)),
            attention_mask: Array2::zeros((0, 0)),
            token_type_ids: Array2::zeros((0, 0)),
        }
    }

    /// Number of rows (instances) in the batch
    pub fn len(&self) -> usize {
        self.input_ids.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn seq_len(&self) -> usize {
        self.input_ids.ncols()
    }
}

/// Per-instance model output before label mapping.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RawPrediction {
    pub class_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Per-instance prediction carrying a human-readable label.
///
/// Serializes the label under its configured field (`sentiment` or `review`)
/// and omits the optional fields that were not retained.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPrediction {
    pub label: String,
    pub field: LabelField,
    pub confidence: Option<f32>,
    pub probabilities: Option<Vec<f32>>,
}

impl Serialize for LabeledPrediction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 1 + self.confidence.is_some() as usize + self.probabilities.is_some() as usize;
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry(self.field.key(), &self.label)?;
        if let Some(confidence) = self.confidence {
            map.serialize_entry("confidence", &confidence)?;
        }
        if let Some(probabilities) = &self.probabilities {
            map.serialize_entry("probabilities", probabilities)?;
        }
        map.end()
    }
}

/// The response envelope handed back to the host.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct PredictionResponse {
    pub predictions: Vec<LabeledPrediction>,
}

impl PredictionResponse {
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}
