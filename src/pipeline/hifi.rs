//! Hierarchical filtering and two-pass generation
//!
//! formulate -> retrieve + fuse -> sections -> LLM ranking -> draft -> refine -> verify.
//! Every LLM stage has a fallback, so `execute` always produces a result.

use super::parsing::{parse_lines, ResponseParser};
use super::prompts;
use super::sections::{ContentSection, SectionParser};
use crate::config::PipelineConfig;
use crate::document::{truncate, Department, Document, SearchFilter};
use crate::llm::LlmClient;
use crate::retrieval::{reciprocal_rank_fusion, FusionConfig, RankedList};
use crate::store::{SearchRequest, VectorStore};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

const MIN_QUERY_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoPassResult {
    pub final_answer: String,
    pub draft_answer: String,
    /// `[name.ext]` citations found in the final answer
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationVerification {
    /// True when the verifier call succeeded, even if it matched nothing
    pub verified: bool,
    pub sources: Vec<String>,
    pub match_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub answer: String,
    pub draft_answer: String,
    pub used_sections: Vec<ContentSection>,
    pub citations: CitationVerification,
    pub expanded_queries: Vec<String>,
    pub documents_retrieved: usize,
    pub sections_parsed: usize,
    pub processing_ms: u64,
}

pub struct HierarchicalPipeline {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn VectorStore>,
    config: PipelineConfig,
    parser: ResponseParser,
    sections: SectionParser,
}

impl HierarchicalPipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn VectorStore>,
        config: PipelineConfig,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            llm,
            store,
            config,
            parser: ResponseParser::new()?,
            sections: SectionParser::new()?,
        })
    }

    pub fn parser(&self) -> &ResponseParser {
        &self.parser
    }

    /// Stage 1: up to N concise queries from the LLM, original query first.
    /// Falls back to the original query alone.
    pub async fn formulate_queries(&self, user_query: &str) -> Vec<String> {
        let (system, user) = prompts::formulation(user_query, self.config.max_formulated_queries);

        match self.llm.complete(&system, &user).await {
            Ok(response) => {
                let mut queries =
                    parse_lines(&response, MIN_QUERY_CHARS, self.config.max_formulated_queries);
                if !queries.iter().any(|q| q == user_query) {
                    queries.insert(0, user_query.to_string());
                }
                tracing::info!(
                    "Query formulation: {} -> {} queries",
                    truncate(user_query, 30),
                    queries.len()
                );
                queries
            }
            Err(e) => {
                tracing::warn!("Query formulation failed, using original query: {}", e);
                vec![user_query.to_string()]
            }
        }
    }

    /// Stage 2: one search per query, fused with weight `1 - i * decay`
    pub async fn initial_retrieval(
        &self,
        queries: &[String],
        filter: Option<&SearchFilter>,
    ) -> Vec<Document> {
        let requests: Vec<SearchRequest> = queries
            .iter()
            .map(|q| {
                SearchRequest::new(q.as_str())
                    .with_top_k(self.config.initial_retrieval_k)
                    .with_min_similarity(self.config.retrieval_similarity)
                    .with_filter(filter.cloned())
            })
            .collect();

        let outcomes = join_all(requests.iter().map(|r| self.store.similarity_search(r))).await;

        let mut lists = Vec::with_capacity(outcomes.len());
        for (i, outcome) in outcomes.into_iter().enumerate() {
            let weight = 1.0 - i as f32 * self.config.query_weight_decay;
            match outcome {
                Ok(docs) => lists.push(RankedList::new(weight, docs)),
                Err(e) => tracing::warn!("Retrieval failed for query '{}': {}", truncate(&queries[i], 30), e),
            }
        }

        let documents: Vec<Document> = match reciprocal_rank_fusion(lists, &FusionConfig::default()) {
            Ok(fused) => fused.into_iter().map(|f| f.document).collect(),
            Err(e) => {
                tracing::warn!("Fusion of formulated queries failed: {}", e);
                Vec::new()
            }
        };

        tracing::info!(
            "Initial retrieval: {} unique documents from {} queries",
            documents.len(),
            queries.len()
        );
        documents
    }

    pub fn parse_into_sections(&self, document: &Document) -> Vec<ContentSection> {
        self.sections.parse(document)
    }

    /// Stage 3: LLM picks and orders the helpful sections
    ///
    /// Score is `1 - rank * 0.1`. An unusable answer keeps the first few sections
    /// unranked; a failed call keeps a few more.
    pub async fn filter_and_rank_sections(
        &self,
        sections: Vec<ContentSection>,
        user_query: &str,
    ) -> Vec<ContentSection> {
        if sections.is_empty() {
            return sections;
        }

        let (system, user) =
            prompts::section_ranking(user_query, &sections, self.config.preview_chars);

        match self.llm.complete(&system, &user).await {
            Ok(response) => {
                let ranked: Vec<ContentSection> = self
                    .parser
                    .parse_distinct_indices(&response, sections.len())
                    .into_iter()
                    .enumerate()
                    .map(|(rank, idx)| {
                        let mut section = sections[idx].clone();
                        section.relevance_score = 1.0 - rank as f32 * 0.1;
                        section
                    })
                    .collect();

                tracing::info!(
                    "Section filtering: {} -> {} sections ({}% reduction)",
                    sections.len(),
                    ranked.len(),
                    100 - ranked.len() * 100 / sections.len()
                );

                if ranked.is_empty() {
                    take_first(sections, self.config.fallback_sections_on_empty)
                } else {
                    ranked
                }
            }
            Err(e) => {
                tracing::warn!("Section filtering failed, keeping leading sections: {}", e);
                take_first(sections, self.config.fallback_sections_on_error)
            }
        }
    }

    /// Stage 4: draft strictly from context, then compress
    pub async fn two_pass_generation(
        &self,
        user_query: &str,
        sections: &[ContentSection],
        department: Department,
    ) -> TwoPassResult {
        let (system, user) = prompts::draft(user_query, sections, department);
        let draft = match self.llm.complete(&system, &user).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Draft generation failed: {}", e);
                return TwoPassResult {
                    final_answer: format!("Generation failed: {}", e),
                    draft_answer: String::new(),
                    citations: Vec::new(),
                };
            }
        };

        let (system, user) = prompts::refine(&draft);
        let refined = match self.llm.complete(&system, &user).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Refinement failed, using draft: {}", e);
                draft.clone()
            }
        };

        let citations = self.parser.extract_citations(&refined);
        tracing::info!(
            "Two-pass generation: draft {} chars -> refined {} chars, {} citations",
            draft.len(),
            refined.len(),
            citations.len()
        );

        TwoPassResult {
            final_answer: refined,
            draft_answer: draft,
            citations,
        }
    }

    /// Stage 5: ask which excerpts support the answer; regex citations on failure
    pub async fn verify_citations(
        &self,
        answer: &str,
        sections: &[ContentSection],
    ) -> CitationVerification {
        let (system, user) =
            prompts::verification(answer, sections, self.config.verification_excerpt_chars);

        match self.llm.complete(&system, &user).await {
            Ok(response) => {
                let indices = self.parser.parse_indices(&response, sections.len());
                let mut sources: Vec<String> = Vec::new();
                for &i in &indices {
                    if !sources.contains(&sections[i].source) {
                        sources.push(sections[i].source.clone());
                    }
                }
                CitationVerification {
                    verified: true,
                    sources,
                    match_count: indices.len(),
                }
            }
            Err(e) => {
                tracing::warn!("Citation verification failed: {}", e);
                let sources = self.parser.extract_citations(answer);
                CitationVerification {
                    verified: false,
                    match_count: sources.len(),
                    sources,
                }
            }
        }
    }

    /// Run every stage. Never fails; collaborator errors degrade to stage fallbacks.
    pub async fn execute(&self, user_query: &str, department: Department) -> PipelineResult {
        let start = Instant::now();
        tracing::info!("Pipeline starting for query '{}'", truncate(user_query, 50));

        let filter = SearchFilter::department(department);

        let queries = self.formulate_queries(user_query).await;
        let documents = self.initial_retrieval(&queries, Some(&filter)).await;

        let all_sections: Vec<ContentSection> = documents
            .iter()
            .flat_map(|d| self.parse_into_sections(d))
            .collect();
        let sections_parsed = all_sections.len();

        let mut filtered = self.filter_and_rank_sections(all_sections, user_query).await;
        filtered.truncate(self.config.filtered_top_k);

        let generation = self.two_pass_generation(user_query, &filtered, department).await;
        let verification = self.verify_citations(&generation.final_answer, &filtered).await;

        let processing_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            elapsed_ms = processing_ms,
            "Pipeline complete | docs: {} -> sections: {} -> filtered: {} | citations: {}",
            documents.len(),
            sections_parsed,
            filtered.len(),
            verification.sources.len()
        );

        PipelineResult {
            answer: generation.final_answer,
            draft_answer: generation.draft_answer,
            used_sections: filtered,
            citations: verification,
            expanded_queries: queries,
            documents_retrieved: documents.len(),
            sections_parsed,
            processing_ms,
        }
    }
}

fn take_first(mut sections: Vec<ContentSection>, n: usize) -> Vec<ContentSection> {
    sections.truncate(n);
    sections
}
