use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::Result as OrtResult;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::adapter::AdapterError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Graph optimization level applied when a session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationLevel {
    Disable,
    Level1,
    Level2,
    #[default]
    Level3,
}

impl From<OptimizationLevel> for GraphOptimizationLevel {
    fn from(level: OptimizationLevel) -> Self {
        match level {
            OptimizationLevel::Disable => GraphOptimizationLevel::Disable,
            OptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
            OptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
            OptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        }
    }
}

/// ONNX Runtime session settings. Zero thread counts let ONNX Runtime decide.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: OptimizationLevel,
}

fn init_onnx_environment() -> OrtResult<()> {
    ort::init().with_name("sentiment-adapter").commit()?;
    Ok(())
}

/// Initializes the process-wide ONNX Runtime environment exactly once.
///
/// Later calls return the outcome of the first one.
pub fn ensure_initialized() -> Result<(), AdapterError> {
    INIT.get_or_init(|| init_onnx_environment().map_err(|e| e.to_string()))
        .clone()
        .map_err(|msg| AdapterError::Build(format!("Failed to initialize ONNX Runtime environment: {}", msg)))
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, AdapterError> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    builder = builder.with_optimization_level(config.optimization_level.into())?;

    Ok(builder)
}
