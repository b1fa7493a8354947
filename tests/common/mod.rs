//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use sentinel_rag::document::{Document, ScoredDocument};
use sentinel_rag::embedding::{EmbeddingError, EmbeddingProvider};
use sentinel_rag::llm::{LlmClient, LlmError};
use sentinel_rag::store::{SearchRequest, StoreError, VectorStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// LLM that answers by matching a needle in the system prompt; unmatched prompts fail
pub struct ScriptedLlm {
    rules: Vec<(String, String)>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(rules: &[(&str, &str)]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|(needle, reply)| (needle.to_string(), reply.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call
    pub fn offline() -> Self {
        Self::new(&[])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, system: &str, _user: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(system.to_string());
        self.rules
            .iter()
            .find(|(needle, _)| system.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .ok_or_else(|| LlmError::Other("no scripted reply".to_string()))
    }
}

/// LLM whose every call fails with the same network error
pub struct UnreachableLlm {
    pub message: String,
}

#[async_trait]
impl LlmClient for UnreachableLlm {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        Err(LlmError::Network(self.message.clone()))
    }
}

/// Embeds known texts to fixed vectors, everything else to `fallback`
pub struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
}

impl TableEmbedder {
    pub fn new(entries: &[(&str, Vec<f32>)], fallback: Vec<f32>) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
            fallback,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for TableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.table.get(text).cloned().unwrap_or_else(|| self.fallback.clone()))
    }

    fn dimension(&self) -> usize {
        self.fallback.len()
    }

    fn model_name(&self) -> &str {
        "table"
    }
}

/// Fixed result list; searches at the listed similarity floors fail
pub struct FlakyStore {
    results: Vec<ScoredDocument>,
    failing_floors: Vec<f32>,
    pub searches: AtomicUsize,
}

impl FlakyStore {
    pub fn new(results: Vec<ScoredDocument>, failing_floors: Vec<f32>) -> Self {
        Self {
            results,
            failing_floors,
            searches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VectorStore for FlakyStore {
    async fn similarity_search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<ScoredDocument>, StoreError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_floors
            .iter()
            .any(|f| (f - request.min_similarity).abs() < 1e-4)
        {
            return Err(StoreError::Unavailable(format!(
                "pass at {:.2} failed",
                request.min_similarity
            )));
        }
        let mut out: Vec<ScoredDocument> = self
            .results
            .iter()
            .filter(|d| d.score >= request.min_similarity)
            .cloned()
            .collect();
        out.truncate(request.top_k);
        Ok(out)
    }

    async fn add(&self, _documents: Vec<Document>) -> Result<(), StoreError> {
        Ok(())
    }
}
