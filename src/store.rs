//! Vector store port and a brute-force in-memory implementation

use crate::document::{Document, ScoredDocument, SearchFilter};
use crate::embedding::{cosine_similarity, EmbeddingError, EmbeddingProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// One similarity query against the store
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    pub min_similarity: f32,
    pub filter: Option<SearchFilter>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: 10,
            min_similarity: 0.0,
            filter: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn with_filter(mut self, filter: Option<SearchFilter>) -> Self {
        self.filter = filter;
        self
    }
}

/// Similarity search collaborator
///
/// Results come back ordered by descending score; callers rely on that order for rank fusion.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn similarity_search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<ScoredDocument>, StoreError>;

    async fn add(&self, documents: Vec<Document>) -> Result<(), StoreError>;
}

/// Exhaustive cosine search over documents embedded at insert time
pub struct InMemoryVectorStore {
    embedder: Arc<dyn EmbeddingProvider>,
    entries: RwLock<Vec<(Document, Vec<f32>)>>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn similarity_search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<ScoredDocument>, StoreError> {
        if request.top_k == 0 || request.query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed(&request.query).await?;
        let entries = self.entries.read().await;

        let mut scored: Vec<ScoredDocument> = entries
            .iter()
            .filter(|(doc, _)| {
                request
                    .filter
                    .as_ref()
                    .map(|f| f.matches(doc))
                    .unwrap_or(true)
            })
            .map(|(doc, vec)| ScoredDocument::new(doc.clone(), cosine_similarity(&query_vec, vec)))
            .filter(|sd| sd.score >= request.min_similarity)
            .collect();

        // sort_by is stable, so equal scores keep insertion order
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(request.top_k);

        tracing::debug!(
            "Vector search returned {} of {} documents (min_similarity={:.2})",
            scored.len(),
            entries.len(),
            request.min_similarity
        );

        Ok(scored)
    }

    async fn add(&self, documents: Vec<Document>) -> Result<(), StoreError> {
        let mut embedded = Vec::with_capacity(documents.len());
        for doc in documents {
            if doc.content.trim().is_empty() {
                continue;
            }
            let vec = self.embedder.embed(&doc.content).await?;
            embedded.push((doc, vec));
        }

        self.entries.write().await.extend(embedded);
        Ok(())
    }
}
