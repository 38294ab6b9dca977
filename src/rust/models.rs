use serde::{Deserialize, Serialize};

use crate::adapter::{AdapterConfig, LabelTable, PaddingPolicy};

/// Known deployment shapes of the sentiment head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Three-way polarity head (BERT base, uncased)
    ///
    /// Characteristics:
    /// - Labels: negative, neutral, positive (under `sentiment`)
    /// - Max sequence length: 512, padded to full length
    ThreeClass,
    /// Five-way star rating head (multilingual BERT)
    ///
    /// Characteristics:
    /// - Labels: 1 star .. 5 stars (under `review`)
    /// - Max sequence length: 512, padded to the longest row
    StarRating,
}

/// Characteristics of a preset's model head and tokenization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCharacteristics {
    pub num_labels: usize,
    pub max_sequence_length: usize,
    pub padding: PaddingPolicy,
}

impl Preset {
    pub fn characteristics(&self) -> ModelCharacteristics {
        match self {
            Self::ThreeClass => ModelCharacteristics {
                num_labels: 3,
                max_sequence_length: 512,
                padding: PaddingPolicy::Fixed,
            },
            Self::StarRating => ModelCharacteristics {
                num_labels: 5,
                max_sequence_length: 512,
                padding: PaddingPolicy::BatchLongest,
            },
        }
    }

    pub fn label_table(&self) -> LabelTable {
        match self {
            Self::ThreeClass => LabelTable::three_class(),
            Self::StarRating => LabelTable::star_rating(),
        }
    }

    /// Full adapter configuration for this preset, retaining probabilities and confidence.
    pub fn config(&self) -> AdapterConfig {
        let characteristics = self.characteristics();
        AdapterConfig {
            labels: self.label_table(),
            padding: characteristics.padding,
            max_length: characteristics.max_sequence_length,
            return_probabilities: true,
            return_confidence: true,
            ..AdapterConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_label_tables_match_heads() {
        for preset in [Preset::ThreeClass, Preset::StarRating] {
            assert_eq!(preset.label_table().len(), preset.characteristics().num_labels);
        }
    }

    #[test]
    fn test_preset_config() {
        let config = Preset::StarRating.config();
        assert_eq!(config.padding, PaddingPolicy::BatchLongest);
        assert_eq!(config.max_length, 512);
        assert_eq!(config.labels.labels()[4], "5 stars");
        assert!(config.return_probabilities && config.return_confidence);
    }
}
