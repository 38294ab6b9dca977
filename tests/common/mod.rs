#![allow(dead_code)]

use std::str::FromStr;

use env_logger::{Builder, Env};
use ndarray::Array2;
use sentiment_adapter::{
    AdapterError, EncodedBatch, ModelArtifact, PaddingPolicy, Preset, SentimentAdapter, SequenceClassifier,
};
use tokenizers::Tokenizer;

pub const TOKENIZER_JSON: &str = r#"{
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
      "great": 2, "excellent": 3, "love": 4,
      "okay": 5, "average": 6,
      "bad": 7, "terrible": 8, "broke": 9,
      "product": 10, "service": 11, "after": 12, "a": 13, "day": 14
    },
    "unk_token": "[UNK]"
  }
}"#;

// Initialize test logger
pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

pub fn tokenizer() -> Tokenizer {
    Tokenizer::from_str(TOKENIZER_JSON).expect("valid tokenizer fixture")
}

/// Deterministic stand-in for a sentiment head: positive words vote for the top
/// class, neutral words for the middle one, negative words for class 0.
#[derive(Debug)]
pub struct KeywordModel {
    pub num_labels: usize,
}

impl SequenceClassifier for KeywordModel {
    fn logits(&self, batch: &EncodedBatch) -> Result<Array2<f32>, AdapterError> {
        let mut logits = Array2::zeros((batch.len(), self.num_labels));
        for (row, ids) in batch.input_ids.outer_iter().enumerate() {
            for (col, &id) in ids.iter().enumerate() {
                if batch.attention_mask[[row, col]] == 0 {
                    continue;
                }
                match id {
                    2..=4 => logits[[row, self.num_labels - 1]] += 2.0,
                    5..=6 => logits[[row, self.num_labels / 2]] += 2.0,
                    7..=9 => logits[[row, 0]] += 2.0,
                    _ => {}
                }
            }
        }
        Ok(logits)
    }

    fn num_labels(&self) -> Option<usize> {
        Some(self.num_labels)
    }
}

/// Always reports a class index past the end of any sensible label table.
#[derive(Debug)]
pub struct OversizedHead;

impl SequenceClassifier for OversizedHead {
    fn logits(&self, batch: &EncodedBatch) -> Result<Array2<f32>, AdapterError> {
        let mut logits = Array2::zeros((batch.len(), 9));
        logits.column_mut(8).fill(5.0);
        Ok(logits)
    }
}

pub fn keyword_artifact(num_labels: usize) -> ModelArtifact {
    ModelArtifact::new("memory://keywords", tokenizer(), Box::new(KeywordModel { num_labels }))
}

pub fn loaded_adapter(preset: Preset) -> SentimentAdapter {
    init();
    let mut adapter = SentimentAdapter::builder_from_preset(preset)
        .with_max_length(32)
        .build()
        .expect("valid preset");
    adapter
        .load_artifact(keyword_artifact(preset.characteristics().num_labels))
        .expect("artifact fits preset");
    adapter
}

pub fn loaded_adapter_with_padding(preset: Preset, padding: PaddingPolicy) -> SentimentAdapter {
    let mut adapter = SentimentAdapter::builder_from_preset(preset)
        .with_max_length(32)
        .with_padding(padding)
        .build()
        .expect("valid preset");
    adapter
        .load_artifact(keyword_artifact(preset.characteristics().num_labels))
        .expect("artifact fits preset");
    adapter
}
