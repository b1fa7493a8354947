//! Configuration management for the Sentinel RAG core
//!
//! Every component reads its own section (`retrieval`, `pipeline`, `memory`, ...), so each
//! one can be built in isolation with `Default` values. Files are TOML, environment
//! variables of the form `SENTINEL_SECTION__KEY` override file values, and named profiles
//! layer a small set of overrides on top.

use crate::error::{Result, SentinelError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Component switches, read by the orchestrator when selecting a strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub ragpart_enabled: bool,
    pub hgmem_enabled: bool,
    pub hifi_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            ragpart_enabled: true,
            hgmem_enabled: true,
            hifi_enabled: true,
        }
    }
}

/// Word-count thresholds for the query complexity classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Lookup phrasing is SIMPLE only below this many words
    pub simple_word_threshold: usize,
    /// Anything longer than this is COMPLEX
    pub complex_word_threshold: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            simple_word_threshold: 10,
            complex_word_threshold: 25,
        }
    }
}

/// Defended retrieval engine parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of threshold passes fused per defended search
    pub passes: usize,
    /// Similarity floor of the first pass
    pub base_similarity: f32,
    /// Floor decrease applied per subsequent pass
    pub threshold_step: f32,
    /// RRF K constant
    pub rrf_k: f32,
    /// Documents scoring above this suspicion are discarded
    pub suspicion_threshold: f32,
    /// Suspicion above this is logged even when kept
    pub suspicion_warn_threshold: f32,
    /// Query terms must be longer than this to be masked
    pub mask_min_term_len: usize,
    /// N: fragments per document
    pub partitions: usize,
    /// k: fragments per combination
    pub combination_size: usize,
    pub fast_path_top_k: usize,
    pub full_pipeline_top_k: usize,
    pub multi_step_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            passes: 3,
            base_similarity: 0.6,
            threshold_step: 0.05,
            rrf_k: 60.0,
            suspicion_threshold: 0.4,
            suspicion_warn_threshold: 0.3,
            mask_min_term_len: 3,
            partitions: 4,
            combination_size: 3,
            fast_path_top_k: 5,
            full_pipeline_top_k: 15,
            multi_step_top_k: 5,
        }
    }
}

/// Hierarchical filtering and generation pipeline parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub initial_retrieval_k: usize,
    pub retrieval_similarity: f32,
    /// Weight lost per formulated-query index during fusion
    pub query_weight_decay: f32,
    pub max_formulated_queries: usize,
    pub filtered_top_k: usize,
    /// Sections kept when the ranker returns nothing usable
    pub fallback_sections_on_empty: usize,
    /// Sections kept when the ranking call fails outright
    pub fallback_sections_on_error: usize,
    pub preview_chars: usize,
    pub verification_excerpt_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            initial_retrieval_k: 20,
            retrieval_similarity: 0.5,
            query_weight_decay: 0.1,
            max_formulated_queries: 3,
            filtered_top_k: 5,
            fallback_sections_on_empty: 3,
            fallback_sections_on_error: 5,
            preview_chars: 150,
            verification_excerpt_chars: 200,
        }
    }
}

/// Hypergraph memory parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Edge count above which an insert consolidates
    pub max_memory_points: usize,
    /// Jaccard similarity at or above which two edges merge
    pub merge_similarity_threshold: f64,
    pub max_subqueries: usize,
    /// Characters kept from a document when it becomes a memory point
    pub summary_chars: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_memory_points: 50,
            merge_similarity_threshold: 0.7,
            max_subqueries: 3,
            summary_chars: 200,
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub base_url: String,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai-compatible".to_string(),
            base_url: "http://localhost:11434/v1".to_string(),
            api_key_env: "SENTINEL_LLM_API_KEY".to_string(),
            model: "llama3.1".to_string(),
            temperature: 0.1,
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "hashing" or "fastembed"
    pub provider: String,
    pub model: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashing".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub request_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 120,
        }
    }
}

impl OrchestratorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ragpart_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hgmem_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hifi_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_provider: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SentinelError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SentinelError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| SentinelError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| SentinelError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(enabled) = overrides.ragpart_enabled {
            self.features.ragpart_enabled = enabled;
        }
        if let Some(enabled) = overrides.hgmem_enabled {
            self.features.hgmem_enabled = enabled;
        }
        if let Some(enabled) = overrides.hifi_enabled {
            self.features.hifi_enabled = enabled;
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(provider) = overrides.embedding_provider {
            self.embedding.provider = provider;
        }

        ConfigValidator::validate(self)
    }

    /// Apply environment variable overrides
    /// Environment variables in format: SENTINEL_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("SENTINEL_") {
                if !config_key.contains("__") {
                    continue;
                }
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "FEATURES__RAGPART_ENABLED" => self.features.ragpart_enabled = parse_env(path, value)?,
            "FEATURES__HGMEM_ENABLED" => self.features.hgmem_enabled = parse_env(path, value)?,
            "FEATURES__HIFI_ENABLED" => self.features.hifi_enabled = parse_env(path, value)?,
            "RETRIEVAL__SUSPICION_THRESHOLD" => {
                self.retrieval.suspicion_threshold = parse_env(path, value)?
            }
            "MEMORY__MAX_MEMORY_POINTS" => {
                self.memory.max_memory_points = parse_env(path, value)?
            }
            "LLM__BASE_URL" => self.llm.base_url = value.to_string(),
            "LLM__MODEL" => self.llm.model = value.to_string(),
            "LLM__TIMEOUT_SECS" => self.llm.timeout_secs = parse_env(path, value)?,
            "EMBEDDING__PROVIDER" => self.embedding.provider = value.to_string(),
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SentinelError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("sentinel-rag").join("config.toml"))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| SentinelError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

impl Default for Config {
    fn default() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(
            "fast".to_string(),
            ProfileOverrides {
                hifi_enabled: Some(false),
                hgmem_enabled: Some(false),
                ..ProfileOverrides::default()
            },
        );
        profiles.insert(
            "offline".to_string(),
            ProfileOverrides {
                hifi_enabled: Some(false),
                hgmem_enabled: Some(false),
                embedding_provider: Some("hashing".to_string()),
                ..ProfileOverrides::default()
            },
        );

        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            features: FeatureFlags::default(),
            classifier: ClassifierConfig::default(),
            retrieval: RetrievalConfig::default(),
            pipeline: PipelineConfig::default(),
            memory: MemoryConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            profiles,
        }
    }
}
