/// Embedding provider trait and FastEmbed implementation
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitializationError(String),

    #[error("Embedding generation failed: {0}")]
    GenerationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for embedding providers
///
/// Implementations must be deterministic: identical input yields an identical vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate embeddings for multiple texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

#[cfg(feature = "fastembed")]
pub use fast::FastEmbedProvider;

#[cfg(feature = "fastembed")]
mod fast {
    use super::{EmbeddingError, EmbeddingProvider};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::Arc;

    /// FastEmbed provider for local embedding generation
    ///
    /// Models are downloaded on-demand to `~/.cache/huggingface/` on first use.
    pub struct FastEmbedProvider {
        model: Arc<TextEmbedding>,
        model_name: String,
        dimension: usize,
    }

    impl FastEmbedProvider {
        pub fn new(model_name: &str) -> Result<Self, EmbeddingError> {
            let (embedding_model, dimension) = match model_name {
                "all-MiniLM-L6-v2" | "all-minilm-l6-v2" => (EmbeddingModel::AllMiniLML6V2, 384),
                "bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
                "bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
                _ => {
                    return Err(EmbeddingError::InitializationError(format!(
                        "Unsupported model: {}. Supported: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5",
                        model_name
                    )));
                }
            };

            tracing::info!(
                "Initializing embedding model: {} ({}D)",
                model_name,
                dimension
            );

            let init_options = InitOptions::new(embedding_model).with_show_download_progress(true);
            let model = TextEmbedding::try_new(init_options)
                .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

            Ok(Self {
                model: Arc::new(model),
                model_name: model_name.to_string(),
                dimension,
            })
        }

        pub fn with_default_model() -> Result<Self, EmbeddingError> {
            Self::new("all-MiniLM-L6-v2")
        }
    }

    #[async_trait]
    impl EmbeddingProvider for FastEmbedProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.is_empty() {
                return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
            }

            // ONNX inference is CPU-bound; keep it off the async workers
            let model = self.model.clone();
            let input = vec![text.to_string()];
            let embeddings = tokio::task::spawn_blocking(move || model.embed(input, None))
                .await
                .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?
                .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

            let embedding = embeddings.into_iter().next().ok_or_else(|| {
                EmbeddingError::GenerationError("No embeddings generated".to_string())
            })?;

            if embedding.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }

            Ok(embedding)
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            &self.model_name
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        #[ignore] // Requires model download (~90MB) - run with: cargo test --features fastembed -- --ignored
        async fn test_single_embedding() {
            let provider = FastEmbedProvider::with_default_model().unwrap();
            let embedding = provider.embed("This is a test sentence.").await.unwrap();
            assert_eq!(embedding.len(), 384);
        }
    }
}
