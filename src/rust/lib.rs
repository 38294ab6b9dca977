//! A four-stage sentiment classification adapter over ONNX models and HuggingFace tokenizers.
//!
//! A host loads the adapter once and then drives every request batch through
//! `encode` → `infer` → `decode`, or calls `predict` to run all three:
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use sentiment_adapter::{Preset, SentimentAdapter};
//! use serde_json::json;
//!
//! let mut adapter = SentimentAdapter::builder_from_preset(Preset::StarRating).build()?;
//! adapter.load("/opt/models/nlptown-sentiment")?;
//!
//! let response = adapter.predict_json(&json!({
//!     "instances": [{"text": "Works as advertised"}, {"text": "Broke after a day"}]
//! }))?;
//! println!("{}", response);
//! # Ok(())
//! # }
//! ```
//!
//! # Label tables
//!
//! The mapping from class index to label is configuration, not code: use a
//! [`Preset`] or supply any ordered list with [`AdapterBuilder::with_labels`].
//!
//! # Thread Safety
//!
//! Once loaded the adapter is immutable. Wrap it in an `Arc` to share it:
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use sentiment_adapter::{Preset, RawRequest, SentimentAdapter};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let mut adapter = SentimentAdapter::builder_from_preset(Preset::ThreeClass).build()?;
//! adapter.load("/opt/models/bert-sentiment")?;
//! let adapter = Arc::new(adapter);
//!
//! let handles: Vec<_> = (0..3)
//!     .map(|_| {
//!         let adapter = Arc::clone(&adapter);
//!         thread::spawn(move || adapter.predict(&RawRequest::from_texts(["test text"])))
//!     })
//!     .collect();
//! for handle in handles {
//!     handle.join().unwrap()?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod batch;
pub mod model_manager;
pub mod models;
mod runtime;

pub use adapter::{
    AdapterBuilder, AdapterConfig, AdapterError, AdapterInfo, EncodedBatch, Instance, LabelField,
    LabelTable, LabeledPrediction, ModelArtifact, OnnxClassifier, PaddingPolicy, PredictionResponse,
    RawPrediction, RawRequest, SentimentAdapter, SequenceClassifier,
};
pub use batch::{run_jsonl, BatchSummary};
pub use model_manager::{ArtifactError, ArtifactLocation, ArtifactPaths, ExpectedHashes, ModelManager};
pub use models::{ModelCharacteristics, Preset};
pub use runtime::{create_session_builder, OptimizationLevel, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
