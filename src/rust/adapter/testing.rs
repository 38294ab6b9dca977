use std::str::FromStr;

use ndarray::Array2;
use tokenizers::Tokenizer;

use super::error::AdapterError;
use super::model::{ModelArtifact, SequenceClassifier};
use super::types::EncodedBatch;

const TOKENIZER_JSON: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [],
  "normalizer": {"type": "Lowercase"},
  "pre_tokenizer": {"type": "Whitespace"},
  "post_processor": null,
  "decoder": null,
  "model": {
    "type": "WordLevel",
    "vocab": {
      "[PAD]": 0, "[UNK]": 1,
      "great": 2, "good": 3, "love": 4,
      "okay": 5, "fine": 6,
      "bad": 7, "terrible": 8, "awful": 9, "hate": 10,
      "product": 11, "service": 12, "it": 13, "the": 14
    },
    "unk_token": "[UNK]"
  }
}"#;

pub(crate) fn word_level_tokenizer() -> Tokenizer {
    Tokenizer::from_str(TOKENIZER_JSON).expect("valid tokenizer fixture")
}

/// Scores rows by counting sentiment words: ids 2..=4 vote for the top class,
/// 5..=6 for the middle one, 7..=10 for class 0.
#[derive(Debug)]
pub(crate) struct LexiconClassifier {
    num_labels: usize,
}

impl SequenceClassifier for LexiconClassifier {
    fn logits(&self, batch: &EncodedBatch) -> Result<Array2<f32>, AdapterError> {
        let mut logits = Array2::zeros((batch.len(), self.num_labels));
        for (row, (ids, mask)) in batch
            .input_ids
            .outer_iter()
            .zip(batch.attention_mask.outer_iter())
            .enumerate()
        {
            for (&id, &m) in ids.iter().zip(mask.iter()) {
                if m == 0 {
                    continue;
                }
                let class = match id {
                    2..=4 => self.num_labels - 1,
                    5..=6 => self.num_labels / 2,
                    7..=10 => 0,
                    _ => continue,
                };
                logits[[row, class]] += 1.0;
            }
        }
        Ok(logits)
    }

    fn num_labels(&self) -> Option<usize> {
        Some(self.num_labels)
    }
}

#[derive(Debug)]
pub(crate) struct FailingClassifier;

impl SequenceClassifier for FailingClassifier {
    fn logits(&self, _batch: &EncodedBatch) -> Result<Array2<f32>, AdapterError> {
        Err(AdapterError::ModelExecutionFailure("forward pass aborted".into()))
    }
}

pub(crate) fn lexicon_artifact(num_labels: usize) -> ModelArtifact {
    ModelArtifact::new(
        "memory://lexicon",
        word_level_tokenizer(),
        Box::new(LexiconClassifier { num_labels }),
    )
}

pub(crate) fn failing_artifact() -> ModelArtifact {
    ModelArtifact::new("memory://failing", word_level_tokenizer(), Box::new(FailingClassifier))
}

/// Returns logits of the wrong shape: `extra_rows` more rows than the batch and `cols` columns.
#[derive(Debug)]
pub(crate) struct MisshapenClassifier {
    extra_rows: usize,
    cols: usize,
}

impl SequenceClassifier for MisshapenClassifier {
    fn logits(&self, batch: &EncodedBatch) -> Result<Array2<f32>, AdapterError> {
        Ok(Array2::zeros((batch.len() + self.extra_rows, self.cols)))
    }
}

pub(crate) fn misshapen_artifact(extra_rows: usize, cols: usize) -> ModelArtifact {
    ModelArtifact::new(
        "memory://misshapen",
        word_level_tokenizer(),
        Box::new(MisshapenClassifier { extra_rows, cols }),
    )
}
