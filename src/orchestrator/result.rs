//! Orchestrator output types

use crate::analysis::{QueryAnalysis, QueryComplexity};
use crate::document::Department;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStrategy {
    /// Defended search + template answer
    FastPath,
    /// Hierarchical pipeline once
    StandardHifi,
    /// Defended pre-filter + hierarchical pipeline + memory update
    FullPipeline,
    /// Memory-driven sub-queries, then the pipeline over accumulated context
    MultiStepMemory,
}

impl ProcessingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStrategy::FastPath => "FAST_PATH",
            ProcessingStrategy::StandardHifi => "STANDARD_HIFI",
            ProcessingStrategy::FullPipeline => "FULL_PIPELINE",
            ProcessingStrategy::MultiStepMemory => "MULTI_STEP_MEMORY",
        }
    }
}

impl fmt::Display for ProcessingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub phase: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything one request produced. Built once per request, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorResult {
    pub session_id: String,
    pub query: String,
    pub department: Department,
    pub analysis: QueryAnalysis,
    pub strategy: ProcessingStrategy,

    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_answer: Option<String>,
    /// Ordered, de-duplicated sources
    pub citations: Vec<String>,
    pub expanded_queries: Vec<String>,

    pub documents_retrieved: usize,
    pub filtered_count: usize,
    pub memory_steps_before: u32,
    pub memory_points_before: usize,
    pub memory_points_after: usize,
    pub memory_max_order: u32,

    pub used_ragpart: bool,
    pub used_hifi: bool,
    pub used_hgmem: bool,
    pub hifi_processing_ms: u64,
    pub elapsed_ms: u64,

    pub reasoning: Vec<ReasoningStep>,
}

impl OrchestratorResult {
    pub(crate) fn new(
        session_id: &str,
        query: &str,
        department: Department,
        analysis: QueryAnalysis,
        strategy: ProcessingStrategy,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            query: query.to_string(),
            department,
            analysis,
            strategy,
            success: false,
            error: None,
            answer: String::new(),
            draft_answer: None,
            citations: Vec::new(),
            expanded_queries: Vec::new(),
            documents_retrieved: 0,
            filtered_count: 0,
            memory_steps_before: 0,
            memory_points_before: 0,
            memory_points_after: 0,
            memory_max_order: 0,
            used_ragpart: false,
            used_hifi: false,
            used_hgmem: false,
            hifi_processing_ms: 0,
            elapsed_ms: 0,
            reasoning: Vec::new(),
        }
    }

    pub fn complexity(&self) -> QueryComplexity {
        self.analysis.complexity
    }

    pub(crate) fn add_reasoning_step(&mut self, phase: &str, description: impl Into<String>) {
        self.reasoning.push(ReasoningStep {
            phase: phase.to_string(),
            description: description.into(),
            timestamp: Utc::now(),
        });
    }
}
