use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{Result, SentinelError, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem before failing
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_classifier(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_pipeline(config, &mut errors);
        Self::validate_memory(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_orchestrator(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SentinelError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_classifier(config: &Config, errors: &mut Vec<ValidationError>) {
        let c = &config.classifier;
        if c.simple_word_threshold >= c.complex_word_threshold {
            errors.push(ValidationError::new(
                "classifier.simple_word_threshold",
                format!(
                    "Must be below complex_word_threshold ({} >= {})",
                    c.simple_word_threshold, c.complex_word_threshold
                ),
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let r = &config.retrieval;

        if r.passes == 0 {
            errors.push(ValidationError::new(
                "retrieval.passes",
                "At least one retrieval pass is required",
            ));
        }

        Self::check_unit_range("retrieval.base_similarity", r.base_similarity as f64, errors);
        Self::check_unit_range("retrieval.suspicion_threshold", r.suspicion_threshold as f64, errors);
        Self::check_unit_range(
            "retrieval.suspicion_warn_threshold",
            r.suspicion_warn_threshold as f64,
            errors,
        );

        if r.threshold_step < 0.0 {
            errors.push(ValidationError::new(
                "retrieval.threshold_step",
                "Threshold step cannot be negative",
            ));
        }

        if r.rrf_k <= 0.0 {
            errors.push(ValidationError::new(
                "retrieval.rrf_k",
                "RRF constant must be positive",
            ));
        }

        if r.partitions == 0 {
            errors.push(ValidationError::new(
                "retrieval.partitions",
                "Partition count must be greater than 0",
            ));
        }

        if r.combination_size == 0 || r.combination_size > r.partitions {
            errors.push(ValidationError::new(
                "retrieval.combination_size",
                format!(
                    "Combination size must be in 1..={}, got {}",
                    r.partitions, r.combination_size
                ),
            ));
        }

        for (path, value) in [
            ("retrieval.fast_path_top_k", r.fast_path_top_k),
            ("retrieval.full_pipeline_top_k", r.full_pipeline_top_k),
            ("retrieval.multi_step_top_k", r.multi_step_top_k),
        ] {
            if value == 0 {
                errors.push(ValidationError::new(path, "Top-K must be greater than 0"));
            }
        }
    }

    fn validate_pipeline(config: &Config, errors: &mut Vec<ValidationError>) {
        let p = &config.pipeline;

        Self::check_unit_range("pipeline.retrieval_similarity", p.retrieval_similarity as f64, errors);
        Self::check_unit_range("pipeline.query_weight_decay", p.query_weight_decay as f64, errors);

        if p.initial_retrieval_k == 0 {
            errors.push(ValidationError::new(
                "pipeline.initial_retrieval_k",
                "Initial retrieval K must be greater than 0",
            ));
        }

        if p.filtered_top_k == 0 {
            errors.push(ValidationError::new(
                "pipeline.filtered_top_k",
                "Filtered top-K must be greater than 0",
            ));
        }

        if p.max_formulated_queries == 0 {
            errors.push(ValidationError::new(
                "pipeline.max_formulated_queries",
                "At least one formulated query must be allowed",
            ));
        }

        // The last formulated query must still carry a positive fusion weight
        let lowest_weight = 1.0 - p.query_weight_decay * p.max_formulated_queries as f32;
        if lowest_weight <= 0.0 {
            errors.push(ValidationError::new(
                "pipeline.query_weight_decay",
                format!(
                    "Decay {} leaves no weight for query {} of {}",
                    p.query_weight_decay, p.max_formulated_queries, p.max_formulated_queries
                ),
            ));
        }
    }

    fn validate_memory(config: &Config, errors: &mut Vec<ValidationError>) {
        let m = &config.memory;

        if m.max_memory_points == 0 {
            errors.push(ValidationError::new(
                "memory.max_memory_points",
                "Memory ceiling must be greater than 0",
            ));
        }

        Self::check_unit_range(
            "memory.merge_similarity_threshold",
            m.merge_similarity_threshold,
            errors,
        );
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.llm.model.is_empty() {
            errors.push(ValidationError::new("llm.model", "Model name cannot be empty"));
        }

        let temp = config.llm.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }

        if config.llm.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "llm.timeout_secs",
                "LLM timeout must be greater than 0",
            ));
        }

        let provider = &config.llm.provider;
        let valid_providers = ["openai-compatible", "openai", "ollama"];
        if !valid_providers.contains(&provider.as_str()) {
            errors.push(ValidationError::new(
                "llm.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    valid_providers, provider
                ),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.embedding.provider;
        if provider != "hashing" && provider != "fastembed" {
            errors.push(ValidationError::new(
                "embedding.provider",
                format!("Provider must be 'hashing' or 'fastembed', got '{}'", provider),
            ));
        }

        if config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Embedding dimension must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_orchestrator(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.orchestrator.request_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "orchestrator.request_timeout_secs",
                "Request timeout must be greater than 0",
            ));
        }
    }

    fn check_unit_range(path: &str, value: f64, errors: &mut Vec<ValidationError>) {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ValidationError::new(
                path,
                format!("Must be between 0.0 and 1.0, got {}", value),
            ));
        }
    }
}
