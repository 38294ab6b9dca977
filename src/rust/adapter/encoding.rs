use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use super::error::AdapterError;
use super::types::EncodedBatch;

/// How rows of a batch are padded.
///
/// Both policies produce the same predictions; they trade memory for latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingPolicy {
    /// Every row is padded to exactly `max_length` tokens
    Fixed,
    /// Rows are padded to the longest sequence in the batch
    #[default]
    BatchLongest,
}

/// Applies the padding and truncation policy to a freshly loaded tokenizer.
///
/// Keeps the tokenizer's own pad token when it declares one, otherwise looks up
/// `[PAD]` or `<pad>` in the vocabulary.
pub(crate) fn configure_tokenizer(
    tokenizer: &mut Tokenizer,
    policy: PaddingPolicy,
    max_length: usize,
) -> Result<(), AdapterError> {
    if max_length == 0 {
        return Err(AdapterError::Build("max_length must be greater than zero".into()));
    }

    let mut padding = match tokenizer.get_padding() {
        Some(params) => params.clone(),
        None => {
            let mut params = PaddingParams::default();
            if let Some((token, id)) = ["[PAD]", "<pad>"]
                .iter()
                .find_map(|t| tokenizer.token_to_id(t).map(|id| (t.to_string(), id)))
            {
                params.pad_token = token;
                params.pad_id = id;
            } else {
                log::warn!(
                    "Tokenizer declares no pad token and has no [PAD] or <pad>; padding with id {}",
                    params.pad_id
                );
            }
            params
        }
    };
    padding.strategy = match policy {
        PaddingPolicy::Fixed => PaddingStrategy::Fixed(max_length),
        PaddingPolicy::BatchLongest => PaddingStrategy::BatchLongest,
    };
    tokenizer.with_padding(Some(padding));

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| AdapterError::Tokenizer(e.to_string()))?;

    Ok(())
}

/// Turns text into the integer tensors a sequence-classification model consumes.
///
/// Implementors only provide access to a configured tokenizer; `None` means the
/// artifact has not been loaded yet.
pub(crate) trait TextEncoding {
    /// Returns the configured tokenizer if available
    fn tokenizer(&self) -> Option<&Tokenizer>;

    /// Counts the tokens `text` produces, after truncation and padding.
    fn count_tokens(&self, text: &str) -> Result<usize, AdapterError> {
        let tokenizer = self.tokenizer().ok_or(AdapterError::NotLoaded)?;
        tokenizer
            .encode(text, true)
            .map_err(|e| AdapterError::Tokenizer(e.to_string()))
            .map(|encoding| encoding.get_ids().len())
    }

    /// Tokenizes all texts in one batched call.
    ///
    /// Row `i` of every returned matrix corresponds to `texts[i]`. Segment-type ids
    /// are zero-filled when the tokenizer does not produce them.
    ///
    /// # Errors
    /// - `NotLoaded` if the tokenizer is not initialized
    /// - `Tokenizer` if encoding fails or rows come back with unequal lengths
    fn encode_texts(&self, texts: &[&str]) -> Result<EncodedBatch, AdapterError> {
        let tokenizer = self.tokenizer().ok_or(AdapterError::NotLoaded)?;
        if texts.is_empty() {
            return Ok(EncodedBatch::empty());
        }

        let encodings = tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| AdapterError::Tokenizer(e.to_string()))?;

        let batch_size = encodings.len();
        let seq_len = encodings.first().map(|e| e.len()).unwrap_or(0);

        let mut input_ids = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask = Vec::with_capacity(batch_size * seq_len);
        let mut token_type_ids = Vec::with_capacity(batch_size * seq_len);

        for (row, encoding) in encodings.iter().enumerate() {
            if encoding.len() != seq_len {
                return Err(AdapterError::Tokenizer(format!(
                    "Row {} has {} tokens, expected {}; is padding configured?",
                    row,
                    encoding.len(),
                    seq_len
                )));
            }
            input_ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));

            let type_ids = encoding.get_type_ids();
            if type_ids.len() == seq_len {
                token_type_ids.extend(type_ids.iter().map(|&t| t as i64));
            } else {
                token_type_ids.extend(std::iter::repeat(0i64).take(seq_len));
            }
        }

        let shape = (batch_size, seq_len);
        let to_matrix = |name: &str, data: Vec<i64>| {
            Array2::from_shape_vec(shape, data).map_err(|e| {
                AdapterError::Tokenizer(format!("Failed to create {} array: {}", name, e))
            })
        };

        Ok(EncodedBatch {
            input_ids: to_matrix("input_ids", input_ids)?,
            attention_mask: to_matrix("attention_mask", attention_mask)?,
            token_type_ids: to_matrix("token_type_ids", token_type_ids)?,
        })
    }
}
