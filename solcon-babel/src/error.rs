//! Error types for descriptor conversion

use solcon_engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Converter not found: {0}")]
    ConverterNotFound(String),

    #[error("No provider line found in the descriptor")]
    ProviderNotFound,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
