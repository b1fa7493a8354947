//! Strategy orchestrator
//!
//! Classifies a query, picks one of four execution paths and composes the defended
//! retriever, the hierarchical pipeline and the hypergraph memory into one result.
//! Every request ends in an [`OrchestratorResult`]; failures, cancellation and the
//! request deadline surface as `success = false` rather than as errors.

mod fast_path;
mod result;

pub use fast_path::{build_simple_response, unique_sources, NO_RECORDS_MESSAGE};
pub use result::{OrchestratorResult, ProcessingStrategy, ReasoningStep};

use crate::analysis::{QueryAnalysis, QueryClassifier, QueryComplexity};
use crate::config::{Config, FeatureFlags, RetrievalConfig};
use crate::document::{truncate, Department, ScoredDocument, SearchFilter};
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, SentinelError};
use crate::llm::{BoundedLlm, LlmClient};
use crate::memory::{HyperGraphMemory, MemoryStats};
use crate::pipeline::{HierarchicalPipeline, PipelineResult};
use crate::retrieval::DefendedRetriever;
use crate::store::VectorStore;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const MEMORY_ANSWER_MIN_CHARS: usize = 50;
const MEMORY_ANSWER_SUMMARY_CHARS: usize = 200;

/// Opening of the answer every failed request returns
pub const FAILURE_ANSWER: &str =
    "I apologize, but I'm unable to process your request at the moment. Please try rephrasing your question.";

/// Complexity -> strategy, degraded by the component switches
pub fn select_strategy(
    complexity: QueryComplexity,
    features: &FeatureFlags,
    memory_available: bool,
) -> ProcessingStrategy {
    match complexity {
        QueryComplexity::Simple => ProcessingStrategy::FastPath,
        QueryComplexity::Moderate if features.hifi_enabled => ProcessingStrategy::StandardHifi,
        QueryComplexity::Moderate => ProcessingStrategy::FastPath,
        QueryComplexity::Complex => ProcessingStrategy::FullPipeline,
        QueryComplexity::MultiHop if features.hgmem_enabled && memory_available => {
            ProcessingStrategy::MultiStepMemory
        }
        QueryComplexity::MultiHop => ProcessingStrategy::FullPipeline,
    }
}

pub struct Orchestrator {
    classifier: QueryClassifier,
    retriever: DefendedRetriever,
    pipeline: HierarchicalPipeline,
    memory: Option<Arc<HyperGraphMemory>>,
    features: FeatureFlags,
    retrieval: RetrievalConfig,
    summary_chars: usize,
    request_timeout: Duration,
}

impl Orchestrator {
    /// Wire every component from one configuration
    ///
    /// The LLM client is wrapped so each call is bounded by `llm.timeout_secs`. Memory is
    /// only built when `features.hgmem_enabled` is set.
    pub fn new(
        config: &Config,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
    ) -> Result<Self> {
        let llm: Arc<dyn LlmClient> = Arc::new(BoundedLlm::new(llm, config.llm.timeout()));

        let classifier = QueryClassifier::new(config.classifier.clone())
            .map_err(|e| SentinelError::Config(format!("Invalid classifier pattern: {}", e)))?;
        let pipeline = HierarchicalPipeline::new(llm.clone(), store.clone(), config.pipeline.clone())
            .map_err(|e| SentinelError::Config(format!("Invalid pipeline pattern: {}", e)))?;
        let retriever = DefendedRetriever::new(store, embedder, config.retrieval.clone());

        let memory = config
            .features
            .hgmem_enabled
            .then(|| Arc::new(HyperGraphMemory::new(llm, config.memory.clone())));

        tracing::info!(
            ragpart = config.features.ragpart_enabled,
            hgmem = memory.is_some(),
            hifi = config.features.hifi_enabled,
            "Orchestrator initialized"
        );

        Ok(Self {
            classifier,
            retriever,
            pipeline,
            memory,
            features: config.features.clone(),
            retrieval: config.retrieval.clone(),
            summary_chars: config.memory.summary_chars,
            request_timeout: config.orchestrator.request_timeout(),
        })
    }

    pub fn memory(&self) -> Option<&Arc<HyperGraphMemory>> {
        self.memory.as_ref()
    }

    pub fn classify(&self, query: &str) -> QueryAnalysis {
        self.classifier.analyze(query)
    }

    pub fn strategy_for(&self, complexity: QueryComplexity) -> ProcessingStrategy {
        select_strategy(complexity, &self.features, self.memory.is_some())
    }

    /// Process one query for a session and department. Never fails.
    pub async fn execute(
        &self,
        query: &str,
        session_id: &str,
        department: Department,
    ) -> OrchestratorResult {
        self.execute_with_cancel(query, session_id, department, CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), abandoning the request when `cancel` fires or the
    /// request deadline passes. Work in flight at that point is dropped, not merged.
    pub async fn execute_with_cancel(
        &self,
        query: &str,
        session_id: &str,
        department: Department,
        cancel: CancellationToken,
    ) -> OrchestratorResult {
        let start = Instant::now();

        let analysis = self.classifier.analyze(query);
        let strategy = self.strategy_for(analysis.complexity);

        tracing::info!(
            session_id,
            department = department.as_str(),
            complexity = %analysis.complexity,
            strategy = %strategy,
            "Processing query '{}'",
            truncate(query, 50)
        );

        let mut result = OrchestratorResult::new(session_id, query, department, analysis, strategy);
        result.add_reasoning_step(
            "ANALYSIS",
            format!(
                "Query classified as {} ({} words, {} entities)",
                result.analysis.complexity,
                result.analysis.word_count,
                result.analysis.entities.len()
            ),
        );
        result.add_reasoning_step("STRATEGY", format!("Selected {}", strategy));

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SentinelError::Cancelled("cancelled".to_string())),
            run = tokio::time::timeout(self.request_timeout, self.run_strategy(result.clone())) => {
                match run {
                    Ok(outcome) => outcome,
                    Err(_) => Err(SentinelError::Cancelled("timed out".to_string())),
                }
            }
        };

        let mut result = match outcome {
            Ok(mut done) => {
                done.success = true;
                done
            }
            Err(e) => {
                let reason = match e {
                    SentinelError::Cancelled(reason) => reason,
                    other => other.to_string(),
                };
                tracing::error!(session_id, strategy = %strategy, "Query processing failed: {}", reason);
                result.success = false;
                result.answer = format!("{} ({})", FAILURE_ANSWER, reason);
                result.add_reasoning_step("ERROR", reason.clone());
                result.error = Some(reason);
                result
            }
        };

        result.elapsed_ms = start.elapsed().as_millis() as u64;
        log_summary(&result);
        result
    }

    /// Drop a session's memory; a no-op without memory
    pub fn clear_session(&self, session_id: &str) {
        if let Some(memory) = &self.memory {
            memory.clear(session_id);
        }
    }

    /// Memory counters for a session; all zero when the session or memory is absent
    pub async fn session_stats(&self, session_id: &str) -> MemoryStats {
        match &self.memory {
            Some(memory) => memory.stats(session_id).await,
            None => MemoryStats::default(),
        }
    }

    async fn run_strategy(&self, draft: OrchestratorResult) -> Result<OrchestratorResult> {
        match draft.strategy {
            ProcessingStrategy::FastPath => self.fast_path(draft).await,
            ProcessingStrategy::StandardHifi => self.standard_hifi(draft).await,
            ProcessingStrategy::FullPipeline => self.full_pipeline(draft).await,
            ProcessingStrategy::MultiStepMemory => self.multi_step_memory(draft).await,
        }
    }

    /// Defended search when enabled, a plain single-pass search otherwise
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredDocument>> {
        if self.features.ragpart_enabled {
            Ok(self.retriever.secure_search(query, top_k, Some(filter)).await)
        } else {
            Ok(self.retriever.plain_search(query, top_k, Some(filter)).await?)
        }
    }

    async fn fast_path(&self, mut r: OrchestratorResult) -> Result<OrchestratorResult> {
        let filter = SearchFilter::department(r.department);
        let documents = self
            .search(&r.query, self.retrieval.fast_path_top_k, &filter)
            .await?;

        r.used_ragpart = self.features.ragpart_enabled;
        r.documents_retrieved = documents.len();
        r.citations = unique_sources(&documents);
        r.answer = build_simple_response(&documents, &r.citations);
        r.add_reasoning_step(
            "RETRIEVAL",
            format!("Retrieved {} documents", documents.len()),
        );
        Ok(r)
    }

    async fn standard_hifi(&self, mut r: OrchestratorResult) -> Result<OrchestratorResult> {
        let pipeline = self.pipeline.execute(&r.query, r.department).await;
        apply_pipeline(&mut r, pipeline);
        Ok(r)
    }

    async fn full_pipeline(&self, mut r: OrchestratorResult) -> Result<OrchestratorResult> {
        if self.features.ragpart_enabled {
            let filter = SearchFilter::department(r.department);
            let prefiltered = self
                .retriever
                .secure_search(&r.query, self.retrieval.full_pipeline_top_k, Some(&filter))
                .await;
            r.filtered_count = prefiltered.len();
            r.used_ragpart = true;
            r.add_reasoning_step(
                "RAGPART",
                format!("{} documents passed the defended pre-filter", prefiltered.len()),
            );
        }

        let pipeline = self.pipeline.execute(&r.query, r.department).await;
        apply_pipeline(&mut r, pipeline);

        if let Some(memory) = &self.memory {
            // a failed draft leaves only an error message as the answer
            let drafted = r.draft_answer.as_deref().is_some_and(|d| !d.is_empty());
            let entities = self.classifier.extract_entities(&r.answer);
            if drafted && !entities.is_empty() && r.answer.chars().count() > MEMORY_ANSWER_MIN_CHARS {
                let description = format!(
                    "Query: {} -> {}",
                    r.query,
                    truncate(&r.answer, MEMORY_ANSWER_SUMMARY_CHARS)
                );
                memory
                    .insert_memory_point(&r.session_id, &description, &entities, None)
                    .await;
                r.used_hgmem = true;
                r.add_reasoning_step(
                    "HGMEM",
                    format!("Stored answer memory point over {} entities", entities.len()),
                );
            }
        }
        Ok(r)
    }

    async fn multi_step_memory(&self, mut r: OrchestratorResult) -> Result<OrchestratorResult> {
        let Some(memory) = &self.memory else {
            return Err(SentinelError::Session("hypergraph memory is not available".to_string()));
        };
        let session = r.session_id.clone();
        let filter = SearchFilter::department(r.department);

        let step = memory.increment_step(&session).await;
        r.memory_steps_before = step.saturating_sub(1);
        r.memory_points_before = memory.memory_point_count(&session).await;

        let mut subqueries = memory.generate_subqueries(&session, &r.query).await;
        subqueries.insert(0, r.query.clone());
        r.add_reasoning_step(
            "SUBQUERIES",
            format!("Searching {} queries (original + {} generated)", subqueries.len(), subqueries.len() - 1),
        );

        let top_k = self.retrieval.multi_step_top_k;
        let searches = join_all(subqueries.iter().map(|q| self.search(q, top_k, &filter))).await;
        let mut documents = Vec::new();
        for found in searches {
            documents.extend(found?);
        }
        r.filtered_count = documents.len();
        r.used_ragpart = self.features.ragpart_enabled;

        let mut inserted = 0;
        for doc in &documents {
            let entities = self.classifier.extract_entities(&doc.document.content);
            if entities.is_empty() {
                continue;
            }
            let summary = truncate(&doc.document.content, self.summary_chars);
            if memory
                .insert_memory_point(&session, &summary, &entities, Some(&doc.document))
                .await
                .is_some()
            {
                inserted += 1;
            }
        }
        r.add_reasoning_step(
            "HGMEM",
            format!("Inserted {} memory points from {} documents", inserted, documents.len()),
        );

        let context = memory.export_memory_to_context(&session).await;
        let augmented = format!("{}\n\nPrior Context:\n{}", r.query, context);
        let pipeline = self.pipeline.execute(&augmented, r.department).await;
        apply_pipeline(&mut r, pipeline);
        r.expanded_queries = subqueries;

        let stats = memory.stats(&session).await;
        r.memory_points_after = stats.memory_points;
        r.memory_max_order = stats.max_order;
        r.used_hgmem = true;
        Ok(r)
    }
}

fn apply_pipeline(r: &mut OrchestratorResult, pipeline: PipelineResult) {
    r.add_reasoning_step(
        "HIFI",
        format!(
            "{} sections parsed, {} used, {} verified sources",
            pipeline.sections_parsed,
            pipeline.used_sections.len(),
            pipeline.citations.sources.len()
        ),
    );
    r.answer = pipeline.answer;
    r.draft_answer = Some(pipeline.draft_answer);
    r.citations = pipeline.citations.sources;
    r.documents_retrieved = pipeline.used_sections.len();
    r.expanded_queries = pipeline.expanded_queries;
    r.used_hifi = true;
    r.hifi_processing_ms = pipeline.processing_ms;
}

fn log_summary(r: &OrchestratorResult) {
    tracing::info!(
        session_id = %r.session_id,
        strategy = %r.strategy,
        complexity = %r.analysis.complexity,
        success = r.success,
        documents = r.documents_retrieved,
        filtered = r.filtered_count,
        citations = r.citations.len(),
        memory_points_before = r.memory_points_before,
        memory_points_after = r.memory_points_after,
        used_ragpart = r.used_ragpart,
        used_hifi = r.used_hifi,
        used_hgmem = r.used_hgmem,
        elapsed_ms = r.elapsed_ms,
        "Execution summary"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::embedding::HashingEmbedder;
    use crate::llm::LlmError;
    use crate::store::{InMemoryVectorStore, SearchRequest, StoreError};
    use async_trait::async_trait;

    struct Silent;

    #[async_trait]
    impl LlmClient for Silent {
        async fn complete(&self, _system: &str, _user: &str) -> std::result::Result<String, LlmError> {
            Err(LlmError::Other("offline".to_string()))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl VectorStore for BrokenStore {
        async fn similarity_search(
            &self,
            _request: &SearchRequest,
        ) -> std::result::Result<Vec<ScoredDocument>, StoreError> {
            Err(StoreError::Unavailable("index offline".to_string()))
        }

        async fn add(&self, _documents: Vec<Document>) -> std::result::Result<(), StoreError> {
            Ok(())
        }
    }

    struct HangingStore;

    #[async_trait]
    impl VectorStore for HangingStore {
        async fn similarity_search(
            &self,
            _request: &SearchRequest,
        ) -> std::result::Result<Vec<ScoredDocument>, StoreError> {
            std::future::pending().await
        }

        async fn add(&self, _documents: Vec<Document>) -> std::result::Result<(), StoreError> {
            Ok(())
        }
    }

    fn no_defense_config() -> Config {
        let mut config = Config::default();
        config.features.ragpart_enabled = false;
        config
    }

    fn orchestrator(config: &Config, store: Arc<dyn VectorStore>) -> Orchestrator {
        Orchestrator::new(config, store, Arc::new(HashingEmbedder::default()), Arc::new(Silent)).unwrap()
    }

    #[test]
    fn test_strategy_table() {
        let all_on = FeatureFlags::default();
        assert_eq!(select_strategy(QueryComplexity::Simple, &all_on, true), ProcessingStrategy::FastPath);
        assert_eq!(select_strategy(QueryComplexity::Moderate, &all_on, true), ProcessingStrategy::StandardHifi);
        assert_eq!(select_strategy(QueryComplexity::Complex, &all_on, true), ProcessingStrategy::FullPipeline);
        assert_eq!(select_strategy(QueryComplexity::MultiHop, &all_on, true), ProcessingStrategy::MultiStepMemory);
    }

    #[test]
    fn test_strategy_degrades_with_switches() {
        let mut features = FeatureFlags::default();
        features.hifi_enabled = false;
        features.hgmem_enabled = false;
        assert_eq!(select_strategy(QueryComplexity::Moderate, &features, true), ProcessingStrategy::FastPath);
        assert_eq!(select_strategy(QueryComplexity::MultiHop, &features, true), ProcessingStrategy::FullPipeline);

        // memory missing behaves like memory disabled
        let all_on = FeatureFlags::default();
        assert_eq!(select_strategy(QueryComplexity::MultiHop, &all_on, false), ProcessingStrategy::FullPipeline);
    }

    #[tokio::test]
    async fn test_memory_built_only_when_enabled() {
        let mut config = Config::default();
        config.features.hgmem_enabled = false;
        let embedder = Arc::new(HashingEmbedder::default());
        let store = Arc::new(InMemoryVectorStore::new(embedder));
        let orch = orchestrator(&config, store);
        assert!(orch.memory().is_none());

        let stats = orch.session_stats("nobody").await;
        assert!(!stats.exists);
        orch.clear_session("nobody");
    }

    #[tokio::test]
    async fn test_fast_path_answers_from_department() {
        let embedder = Arc::new(HashingEmbedder::default());
        let store = Arc::new(InMemoryVectorStore::new(embedder));
        store
            .add(vec![
                Document::new("The budget is four million dollars for the coming fiscal year.")
                    .with_source("budget.txt")
                    .with_department(Department::Finance),
                Document::new("The budget is classified and held by the legal office only.")
                    .with_source("legal.txt")
                    .with_department(Department::Legal),
            ])
            .await
            .unwrap();

        let mut config = no_defense_config();
        config.retrieval.base_similarity = 0.1;
        let orch = orchestrator(&config, store);

        let result = orch.execute("What is the budget?", "s1", Department::Finance).await;
        assert!(result.success);
        assert_eq!(result.strategy, ProcessingStrategy::FastPath);
        assert_eq!(result.citations, vec!["budget.txt"]);
        assert!(result.answer.starts_with("Based on available intelligence:"));
        assert!(!result.used_ragpart);
        assert_eq!(result.reasoning.first().map(|s| s.phase.as_str()), Some("ANALYSIS"));
    }

    #[tokio::test]
    async fn test_store_failure_becomes_degraded_result() {
        let orch = orchestrator(&no_defense_config(), Arc::new(BrokenStore));
        let result = orch.execute("What is the budget?", "s1", Department::Finance).await;

        assert!(!result.success);
        let error = result.error.clone().unwrap();
        assert!(error.contains("index offline"));
        assert_eq!(result.answer, format!("{} ({})", FAILURE_ANSWER, error));
        assert!(result.answer.starts_with("I apologize"));
        assert!(result.citations.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_request() {
        let orch = orchestrator(&no_defense_config(), Arc::new(HangingStore));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = orch
            .execute_with_cancel("What is the budget?", "s1", Department::Finance, cancel)
            .await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn test_request_deadline() {
        let mut config = no_defense_config();
        config.orchestrator.request_timeout_secs = 1;
        let orch = orchestrator(&config, Arc::new(HangingStore));

        let result = orch.execute("What is the budget?", "s1", Department::Finance).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("timed out"));
        assert!(result.answer.starts_with(FAILURE_ANSWER));
        assert!(result.answer.ends_with("(timed out)"));
    }
}
