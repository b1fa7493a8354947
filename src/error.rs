use crate::embedding::EmbeddingError;
use crate::llm::LlmError;
use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Sentinel RAG core
#[derive(Error, Debug)]
pub enum SentinelError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Embedding service failures
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Vector store failures
    #[error("Vector store error: {0}")]
    VectorStore(#[from] StoreError),

    /// LLM client failures
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Session memory errors
    #[error("Session error: {0}")]
    Session(String),

    /// The request was cancelled or ran past its deadline
    #[error("Request cancelled: {0}")]
    Cancelled(String),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for Sentinel operations
pub type Result<T> = std::result::Result<T, SentinelError>;
