//! Poisoning-resistant retrieval
//!
//! `secure_search` = multi-pass RRF retrieval at 2x K, then RAGMask filtering, then top K.

use super::fusion::{reciprocal_rank_fusion, FusionConfig, RankedList};
use super::partition::{combination_text, generate_combinations, partition_document};
use super::suspicion::{mask_terms, maskable_terms, suspicion_from_similarities};
use crate::config::RetrievalConfig;
use crate::document::{truncate, Document, ScoredDocument, SearchFilter};
use crate::embedding::{average_embeddings, cosine_similarity, EmbeddingError, EmbeddingProvider};
use crate::store::{SearchRequest, StoreError, VectorStore};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;

pub const RAGPART_TYPE_KEY: &str = "ragpart_type";
pub const RAGPART_PARTITIONS_KEY: &str = "ragpart_partitions";
pub const RAGPART_INDEX_KEY: &str = "ragpart_partition_index";
pub const RAGPART_TOTAL_KEY: &str = "ragpart_total_partitions";

pub struct DefendedRetriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
    fusion: FusionConfig,
}

impl DefendedRetriever {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        let fusion = FusionConfig::new(config.rrf_k).unwrap_or_else(|e| {
            tracing::warn!("{}; falling back to k=60", e);
            FusionConfig::default()
        });

        tracing::info!(
            partitions = config.partitions,
            combination_size = config.combination_size,
            passes = config.passes,
            "Defended retriever initialized"
        );

        Self {
            store,
            embedder,
            config,
            fusion,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Similarity floor of a given pass
    fn pass_threshold(&self, pass: usize) -> f32 {
        (self.config.base_similarity - pass as f32 * self.config.threshold_step).max(0.0)
    }

    /// Multi-pass retrieval fused with RRF
    ///
    /// Each pass asks for `2 * top_k` candidates at a decreasing similarity floor. Passes
    /// run concurrently; a failed pass is logged and left out of the fusion, so total
    /// failure yields an empty list. Scores on the returned documents are fused RRF scores.
    pub async fn defended_search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Vec<ScoredDocument> {
        tracing::info!("Defended search for query: {}", truncate(query, 50));

        let requests: Vec<SearchRequest> = (0..self.config.passes)
            .map(|pass| {
                SearchRequest::new(query)
                    .with_top_k(top_k * 2)
                    .with_min_similarity(self.pass_threshold(pass))
                    .with_filter(filter.cloned())
            })
            .collect();

        let outcomes = join_all(requests.iter().map(|r| self.store.similarity_search(r))).await;

        let mut lists = Vec::with_capacity(outcomes.len());
        for (pass, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(docs) => lists.push(RankedList::unweighted(docs)),
                Err(e) => tracing::warn!("Retrieval pass {} failed: {}", pass, e),
            }
        }

        let successful_passes = lists.len();
        let mut fused = match reciprocal_rank_fusion(lists, &self.fusion) {
            Ok(fused) => fused,
            Err(e) => {
                tracing::warn!("Fusion of retrieval passes failed: {}", e);
                return Vec::new();
            }
        };
        fused.truncate(top_k);

        tracing::info!(
            "Defended search returned {} results from {} retrieval passes",
            fused.len(),
            successful_passes
        );

        fused
            .into_iter()
            .map(|f| ScoredDocument::new(f.document, f.score))
            .collect()
    }

    /// RAGMask suspicion score of a document against a query, in [0, 1]
    pub async fn compute_suspicion_score(
        &self,
        document: &Document,
        query: &str,
    ) -> Result<f32, EmbeddingError> {
        if document.content.is_empty() {
            return Ok(0.0);
        }
        let query_vec = self.embedder.embed(query).await?;
        self.suspicion_against(document, query, &query_vec).await
    }

    async fn suspicion_against(
        &self,
        document: &Document,
        query: &str,
        query_vec: &[f32],
    ) -> Result<f32, EmbeddingError> {
        let content = &document.content;
        if content.is_empty() {
            return Ok(0.0);
        }

        let terms = maskable_terms(query, self.config.mask_min_term_len);
        let masked = mask_terms(content, &terms);
        if masked == *content {
            // nothing to mask, so nothing can drop
            return Ok(0.0);
        }

        let original_vec = self.embedder.embed(content).await?;
        let original = cosine_similarity(&original_vec, query_vec);

        let masked_vec = self.embedder.embed(&masked).await?;
        let masked_sim = cosine_similarity(&masked_vec, query_vec);

        let score = suspicion_from_similarities(original, masked_sim);
        if score > self.config.suspicion_warn_threshold {
            tracing::warn!(
                "High suspicion score {:.3} for document from {}",
                score,
                document.source_or_unknown()
            );
        }
        Ok(score)
    }

    /// Drop documents whose suspicion exceeds `threshold`, preserving order
    ///
    /// Documents that cannot be scored are dropped too.
    pub async fn filter_suspicious_documents(
        &self,
        documents: Vec<ScoredDocument>,
        query: &str,
        threshold: f32,
    ) -> Vec<ScoredDocument> {
        if documents.is_empty() {
            return documents;
        }

        let query_vec = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Cannot embed query for suspicion filtering: {}", e);
                return Vec::new();
            }
        };

        let scores = join_all(
            documents
                .iter()
                .map(|d| self.suspicion_against(&d.document, query, &query_vec)),
        )
        .await;

        documents
            .into_iter()
            .zip(scores)
            .filter_map(|(doc, score)| match score {
                Ok(s) if s > threshold => {
                    tracing::warn!(
                        "Filtering suspicious document (score: {:.3}): {}",
                        s,
                        doc.document.source_or_unknown()
                    );
                    None
                }
                Ok(_) => Some(doc),
                Err(e) => {
                    tracing::warn!(
                        "Suspicion scoring failed for {}: {}",
                        doc.document.source_or_unknown(),
                        e
                    );
                    None
                }
            })
            .collect()
    }

    /// Defended retrieval at 2x K, suspicion filtering, then the top K survivors
    pub async fn secure_search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Vec<ScoredDocument> {
        let candidates = self.defended_search(query, top_k * 2, filter).await;
        let mut filtered = self
            .filter_suspicious_documents(candidates, query, self.config.suspicion_threshold)
            .await;
        filtered.truncate(top_k);
        filtered
    }

    /// Plain single-pass similarity search, used when the defenses are switched off
    pub async fn plain_search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredDocument>, StoreError> {
        let request = SearchRequest::new(query)
            .with_top_k(top_k)
            .with_min_similarity(self.config.base_similarity)
            .with_filter(filter.cloned());
        self.store.similarity_search(&request).await
    }

    /// Similarity between a query and the average of a document's fragment-combination
    /// embeddings. `None` when the document yields no non-empty combination.
    pub async fn score_with_partitions(
        &self,
        document: &Document,
        query: &str,
    ) -> Result<Option<f32>, EmbeddingError> {
        let fragments = partition_document(&document.content, self.config.partitions);
        let texts: Vec<String> =
            generate_combinations(fragments.len(), self.config.combination_size)
                .iter()
                .filter_map(|combo| combination_text(&fragments, combo))
                .collect();

        if texts.is_empty() {
            return Ok(None);
        }

        let embeddings = self.embedder.embed_batch(&texts).await?;
        let Some(averaged) = average_embeddings(&embeddings) else {
            return Ok(None);
        };

        let query_vec = self.embedder.embed(query).await?;
        Ok(Some(cosine_similarity(&averaged, &query_vec)))
    }

    /// Store the full document plus each non-empty partition, tagged with `ragpart_*`
    /// metadata. Returns the number of stored records.
    pub async fn ingest_with_partitions(&self, document: Document) -> Result<usize, StoreError> {
        let n = self.config.partitions;
        let partitions = partition_document(&document.content, n);

        let mut records = Vec::with_capacity(partitions.len() + 1);
        records.push(
            document
                .clone()
                .with_metadata(RAGPART_TYPE_KEY, "full")
                .with_metadata(RAGPART_PARTITIONS_KEY, Value::from(n)),
        );

        for (i, partition) in partitions.into_iter().enumerate() {
            if partition.is_empty() {
                continue;
            }
            let mut part = Document::new(partition);
            part.metadata = document.metadata.clone();
            records.push(
                part.with_metadata(RAGPART_TYPE_KEY, "partition")
                    .with_metadata(RAGPART_INDEX_KEY, Value::from(i))
                    .with_metadata(RAGPART_TOTAL_KEY, Value::from(n)),
            );
        }

        let stored = records.len();
        self.store.add(records).await?;

        tracing::info!(
            "Ingested document with {} partitions: {}",
            stored - 1,
            document.source_or_unknown()
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::store::InMemoryVectorStore;

    fn retriever(store: Arc<InMemoryVectorStore>, embedder: Arc<HashingEmbedder>) -> DefendedRetriever {
        let mut config = RetrievalConfig::default();
        config.base_similarity = 0.0;
        config.threshold_step = 0.0;
        DefendedRetriever::new(store, embedder, config)
    }

    #[tokio::test]
    async fn test_pass_thresholds_decrease() {
        let embedder = Arc::new(HashingEmbedder::default());
        let store = Arc::new(InMemoryVectorStore::new(embedder.clone()));
        let r = DefendedRetriever::new(store, embedder, RetrievalConfig::default());
        assert!((r.pass_threshold(0) - 0.6).abs() < 1e-6);
        assert!((r.pass_threshold(2) - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_suspicion_zero_without_query_terms() {
        let embedder = Arc::new(HashingEmbedder::default());
        let store = Arc::new(InMemoryVectorStore::new(embedder.clone()));
        let r = retriever(store, embedder);

        let doc = Document::new("Cafeteria hours are posted near the entrance.");
        let score = r.compute_suspicion_score(&doc, "quarterly budget").await.unwrap();
        assert_eq!(score, 0.0);
        assert_eq!(r.compute_suspicion_score(&Document::new(""), "x").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_stuffed_document_is_filtered() {
        let embedder = Arc::new(HashingEmbedder::default());
        let store = Arc::new(InMemoryVectorStore::new(embedder.clone()));
        store
            .add(vec![
                Document::new("budget budget budget allocation allocation budget")
                    .with_source("stuffed.txt"),
                Document::new("The finance office publishes the yearly budget allocation in March, covering staff and equipment.")
                    .with_source("real.txt"),
            ])
            .await
            .unwrap();
        let r = retriever(store, embedder);

        let results = r.secure_search("budget allocation", 5, None).await;
        let sources: Vec<String> = results.iter().map(|d| d.document.source_or_unknown()).collect();
        assert!(!sources.contains(&"stuffed.txt".to_string()));
    }

    #[tokio::test]
    async fn test_ingest_with_partitions() {
        let embedder = Arc::new(HashingEmbedder::default());
        let store = Arc::new(InMemoryVectorStore::new(embedder.clone()));
        let r = retriever(store.clone(), embedder);

        let stored = r
            .ingest_with_partitions(Document::new("One. Two.").with_source("doc.txt"))
            .await
            .unwrap();
        // full document + two non-empty partitions
        assert_eq!(stored, 3);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_score_with_partitions() {
        let embedder = Arc::new(HashingEmbedder::default());
        let store = Arc::new(InMemoryVectorStore::new(embedder.clone()));
        let r = retriever(store, embedder);

        let doc = Document::new("Budget approved. Staff hired. Equipment bought. Audit passed.");
        let score = r.score_with_partitions(&doc, "budget audit").await.unwrap();
        assert!(score.map(|s| s > 0.0).unwrap_or(false));

        assert_eq!(r.score_with_partitions(&Document::new(""), "x").await.unwrap(), None);
    }
}
