use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::AdapterError;

const MAX_LABELS: usize = 100;

/// The response key a label is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelField {
    /// `{"sentiment": "positive"}`
    #[default]
    Sentiment,
    /// `{"review": "4 stars"}`
    Review,
}

impl LabelField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Sentiment => "sentiment",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for LabelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Deserialize)]
struct RawLabelTable {
    labels: Vec<String>,
    #[serde(default)]
    field: LabelField,
}

/// An ordered mapping from class index to label.
///
/// The table must match the model head: index `i` of the logits maps to `labels[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLabelTable")]
pub struct LabelTable {
    labels: Vec<String>,
    field: LabelField,
}

impl TryFrom<RawLabelTable> for LabelTable {
    type Error = AdapterError;

    fn try_from(raw: RawLabelTable) -> Result<Self, Self::Error> {
        LabelTable::new(raw.labels, raw.field)
    }
}

impl LabelTable {
    /// Creates a label table, rejecting empty, blank or duplicate labels.
    pub fn new(labels: Vec<impl Into<String>>, field: LabelField) -> Result<Self, AdapterError> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();

        if labels.is_empty() {
            return Err(AdapterError::Build("Label table cannot be empty".into()));
        }
        if labels.len() > MAX_LABELS {
            return Err(AdapterError::Build(format!(
                "Maximum number of labels ({}) exceeded",
                MAX_LABELS
            )));
        }
        if let Some(pos) = labels.iter().position(|l| l.trim().is_empty()) {
            return Err(AdapterError::Build(format!("Label {} cannot be empty", pos)));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = labels.iter().find(|l| !seen.insert(l.as_str())) {
            return Err(AdapterError::Build(format!("Duplicate label '{}'", dup)));
        }

        Ok(Self { labels, field })
    }

    /// `negative`, `neutral`, `positive`, reported under `sentiment`.
    pub fn three_class() -> Self {
        Self {
            labels: vec!["negative".into(), "neutral".into(), "positive".into()],
            field: LabelField::Sentiment,
        }
    }

    /// `1 star` through `5 stars`, reported under `review`.
    pub fn star_rating() -> Self {
        Self {
            labels: (1..=5)
                .map(|n| if n == 1 { "1 star".to_string() } else { format!("{} stars", n) })
                .collect(),
            field: LabelField::Review,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn field(&self) -> LabelField {
        self.field
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn with_field(mut self, field: LabelField) -> Self {
        self.field = field;
        self
    }

    /// Looks up the label for `class_index`; `instance` is only used for the error.
    pub fn label_for(&self, instance: usize, class_index: usize) -> Result<&str, AdapterError> {
        self.labels
            .get(class_index)
            .map(String::as_str)
            .ok_or(AdapterError::UnknownClassIndex {
                index: instance,
                class_index,
                num_labels: self.labels.len(),
            })
    }
}
