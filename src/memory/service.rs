//! Session-scoped hypergraph memory operations

use super::graph::{edge_id, jaccard, HyperEdge, HyperGraph, Vertex};
use super::store::SessionStore;
use crate::config::MemoryConfig;
use crate::document::{truncate, Document};
use crate::llm::LlmClient;
use crate::pipeline::parse_lines;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

pub const EMPTY_MEMORY_CONTEXT: &str = "No memory points available.";
const CONSOLIDATION_QUERY: &str = "consolidation";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub exists: bool,
    pub vertices: usize,
    pub memory_points: usize,
    pub interaction_steps: u32,
    pub max_order: u32,
}

pub struct HyperGraphMemory {
    sessions: SessionStore,
    llm: Arc<dyn LlmClient>,
    config: MemoryConfig,
}

impl HyperGraphMemory {
    pub fn new(llm: Arc<dyn LlmClient>, config: MemoryConfig) -> Self {
        tracing::info!(
            max_memory_points = config.max_memory_points,
            merge_threshold = config.merge_similarity_threshold,
            "Hypergraph memory initialized"
        );
        Self {
            sessions: SessionStore::new(),
            llm,
            config,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Create a memory point connecting one vertex per entity
    ///
    /// Consolidates before returning when the edge count passes the ceiling. Returns
    /// `None` when there is no entity to connect.
    pub async fn insert_memory_point(
        &self,
        session_id: &str,
        description: &str,
        entities: &BTreeSet<String>,
        source: Option<&Document>,
    ) -> Option<HyperEdge> {
        if entities.is_empty() {
            tracing::warn!("Memory insert skipped: no entities to connect");
            return None;
        }

        let source_id = source.and_then(|d| d.source());
        let graph = self.sessions.get_or_create(session_id);

        let (edge, over_ceiling) = {
            let mut g = graph.lock().await;
            let vertex_ids: BTreeSet<String> = entities
                .iter()
                .map(|name| g.upsert_vertex(name, source_id.as_deref()))
                .collect();
            let edge = HyperEdge::new(edge_id("he_"), description, vertex_ids);
            g.add_edge(edge.clone());
            (edge, g.edge_count() > self.config.max_memory_points)
        };

        tracing::info!(
            session_id,
            "Memory insert: created '{}' connecting {} entities",
            edge.id,
            edge.vertex_ids.len()
        );

        if over_ceiling {
            self.consolidate_memory(session_id).await;
        }

        Some(edge)
    }

    /// Replace an edge's description; unknown ids are logged and ignored
    pub async fn update_memory_point(&self, session_id: &str, edge_id: &str, description: &str) -> bool {
        let Some(graph) = self.sessions.get(session_id) else {
            tracing::warn!("Memory update: session '{}' not found", session_id);
            return false;
        };
        let mut g = graph.lock().await;
        let old = g.edge(edge_id).map(|e| e.description.clone());
        match old {
            Some(old) => {
                g.set_edge_description(edge_id, description);
                tracing::info!(
                    "Memory update: '{}': '{}' -> '{}'",
                    edge_id,
                    truncate(&old, 30),
                    truncate(description, 30)
                );
                true
            }
            None => {
                tracing::warn!("Memory update: memory point '{}' not found", edge_id);
                false
            }
        }
    }

    /// Replace two edges by one covering both
    ///
    /// The description is synthesized by the LLM without holding the graph lock; the
    /// merge applies only if both edges are still present afterwards.
    pub async fn merge_memory_points(
        &self,
        session_id: &str,
        edge_id_1: &str,
        edge_id_2: &str,
        target_query: &str,
    ) -> Option<HyperEdge> {
        if edge_id_1 == edge_id_2 {
            tracing::warn!("Memory merge: refusing to merge '{}' with itself", edge_id_1);
            return None;
        }
        let graph = self.sessions.get(session_id)?;

        let (a, b) = {
            let g = graph.lock().await;
            match (g.edge(edge_id_1), g.edge(edge_id_2)) {
                (Some(a), Some(b)) => (a.clone(), b.clone()),
                _ => {
                    tracing::warn!(
                        "Memory merge: one or both edges not found: {}, {}",
                        edge_id_1,
                        edge_id_2
                    );
                    return None;
                }
            }
        };

        let description = self
            .merged_description(&a.description, &b.description, target_query)
            .await;
        let merged = HyperEdge::merged(edge_id("he_merged_"), &a, &b, description);

        let mut g = graph.lock().await;
        if g.edge(&a.id).is_none() || g.edge(&b.id).is_none() {
            tracing::warn!(
                "Memory merge: '{}' or '{}' changed during synthesis, skipping",
                a.id,
                b.id
            );
            return None;
        }
        g.remove_edge(&a.id);
        g.remove_edge(&b.id);
        g.add_edge(merged.clone());

        tracing::info!(
            "Memory merge: '{}' + '{}' -> '{}' (order: {})",
            a.id,
            b.id,
            merged.id,
            merged.order
        );
        Some(merged)
    }

    async fn merged_description(&self, first: &str, second: &str, target_query: &str) -> String {
        let system = format!(
            "You are a knowledge synthesis assistant. Given two related facts and a target query,\n\
             create a single coherent description that combines both facts.\n\
             Keep the merged description concise (1-2 sentences) but comprehensive.\n\
             Focus on information relevant to the query.\n\n\
             Fact 1: {}\n\
             Fact 2: {}\n\
             Target Query: {}\n\n\
             Merged Description:",
            first, second, target_query
        );

        match self.llm.complete(&system, "Generate the merged description:").await {
            Ok(response) => response.trim().to_string(),
            Err(e) => {
                tracing::warn!("Merged description synthesis failed: {}", e);
                format!("{} Additionally, {}", first, second)
            }
        }
    }

    /// Pairs to merge in one consolidation pass
    ///
    /// Scans edges in insertion order; each edge merges with the first later unmerged edge
    /// at or above the threshold, and an edge takes part in at most one merge per pass.
    pub fn consolidation_pairs(graph: &HyperGraph, threshold: f64) -> Vec<(String, String)> {
        let edges = graph.edges();
        let mut merged: BTreeSet<&str> = BTreeSet::new();
        let mut pairs = Vec::new();

        for (i, e1) in edges.iter().enumerate() {
            if merged.contains(e1.id.as_str()) {
                continue;
            }
            for e2 in &edges[i + 1..] {
                if merged.contains(e2.id.as_str()) {
                    continue;
                }
                if jaccard(&e1.vertex_ids, &e2.vertex_ids) >= threshold {
                    merged.insert(e1.id.as_str());
                    merged.insert(e2.id.as_str());
                    pairs.push((e1.id.clone(), e2.id.clone()));
                    break;
                }
            }
        }
        pairs
    }

    /// Merge every sufficiently overlapping pair of edges once
    pub async fn consolidate_memory(&self, session_id: &str) {
        let Some(graph) = self.sessions.get(session_id) else {
            return;
        };

        let (before, pairs) = {
            let g = graph.lock().await;
            (
                g.edge_count(),
                Self::consolidation_pairs(&g, self.config.merge_similarity_threshold),
            )
        };
        tracing::info!(session_id, "Consolidating memory (current size: {})", before);

        for (a, b) in pairs {
            self.merge_memory_points(session_id, &a, &b, CONSOLIDATION_QUERY)
                .await;
        }

        let after = graph.lock().await.edge_count();
        tracing::info!(session_id, "Consolidation complete (new size: {})", after);
    }

    /// Vertices of an edge plus those of every edge sharing a vertex with it
    pub async fn local_investigation(&self, session_id: &str, edge_id: &str) -> Vec<Vertex> {
        let Some(graph) = self.sessions.get(session_id) else {
            return Vec::new();
        };
        let g = graph.lock().await;
        let Some(edge) = g.edge(edge_id) else {
            return Vec::new();
        };

        let mut ids: BTreeSet<&String> = edge.vertex_ids.iter().collect();
        for other in g.edges() {
            if other.id != edge.id && other.shares_vertex_with(edge) {
                ids.extend(other.vertex_ids.iter());
            }
        }

        let neighborhood: Vec<Vertex> = ids.into_iter().filter_map(|id| g.vertex(id).cloned()).collect();
        tracing::debug!(
            "Local investigation: {} vertices around '{}'",
            neighborhood.len(),
            edge_id
        );
        neighborhood
    }

    /// Candidates whose lower-cased name is not yet a vertex name in the session
    pub async fn unexplored_entities(
        &self,
        session_id: &str,
        candidates: &BTreeSet<String>,
    ) -> BTreeSet<String> {
        let known: BTreeSet<String> = match self.sessions.get(session_id) {
            Some(graph) => graph
                .lock()
                .await
                .vertices()
                .map(|v| v.name.to_lowercase())
                .collect(),
            None => BTreeSet::new(),
        };

        candidates
            .iter()
            .filter(|c| !known.contains(&c.to_lowercase()))
            .cloned()
            .collect()
    }

    /// Flat text rendering of the memory, highest-order edges first
    pub async fn export_memory_to_context(&self, session_id: &str) -> String {
        match self.sessions.get(session_id) {
            Some(graph) => render_context(&*graph.lock().await),
            None => EMPTY_MEMORY_CONTEXT.to_string(),
        }
    }

    /// Follow-up queries that fill gaps relative to `target_query`; empty on failure
    pub async fn generate_subqueries(&self, session_id: &str, target_query: &str) -> Vec<String> {
        let memory = self.export_memory_to_context(session_id).await;
        let system = format!(
            "You are analyzing a knowledge retrieval task. Based on the current memory state \
             and the target query, generate 2-3 specific subqueries that would help gather \
             additional relevant information.\n\n\
             Current Memory State:\n{}\n\n\
             Target Query: {}\n\n\
             Generate subqueries that:\n\
             1. Explore gaps in current knowledge\n\
             2. Deepen understanding of existing memory points\n\
             3. Connect related concepts\n\n\
             Return each subquery on a new line, nothing else.",
            memory, target_query
        );

        match self.llm.complete(&system, "Generate subqueries:").await {
            Ok(response) => parse_lines(&response, 0, self.config.max_subqueries),
            Err(e) => {
                tracing::warn!("Subquery generation failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Advance the session's interaction step, creating the session if needed
    pub async fn increment_step(&self, session_id: &str) -> u32 {
        self.sessions
            .get_or_create(session_id)
            .lock()
            .await
            .increment_step()
    }

    pub async fn memory_point_count(&self, session_id: &str) -> usize {
        match self.sessions.get(session_id) {
            Some(graph) => graph.lock().await.edge_count(),
            None => 0,
        }
    }

    pub async fn stats(&self, session_id: &str) -> MemoryStats {
        let Some(graph) = self.sessions.get(session_id) else {
            return MemoryStats::default();
        };
        let g = graph.lock().await;
        MemoryStats {
            exists: true,
            vertices: g.vertex_count(),
            memory_points: g.edge_count(),
            interaction_steps: g.interaction_step(),
            max_order: g.max_order(),
        }
    }

    pub fn clear(&self, session_id: &str) {
        self.sessions.remove(session_id);
        tracing::info!("Cleared memory for session '{}'", session_id);
    }

    /// Snapshot of a session's graph, if it exists
    pub async fn snapshot(&self, session_id: &str) -> Option<HyperGraph> {
        let graph = self.sessions.get(session_id)?;
        let g = graph.lock().await;
        Some(g.clone())
    }
}

fn render_context(graph: &HyperGraph) -> String {
    if graph.edge_count() == 0 {
        return EMPTY_MEMORY_CONTEXT.to_string();
    }

    let mut out = String::from("=== HYPERGRAPH MEMORY STATE ===\n\n");
    for edge in graph.edges_by_order() {
        let _ = writeln!(
            out,
            "• Memory Point [{}] (Order: {}, Confidence: {:.2})",
            edge.id, edge.order, edge.confidence
        );
        let _ = writeln!(out, "  Entities: {}", graph.entity_names(edge).join(", "));
        let _ = writeln!(out, "  Description: {}\n", edge.description);
    }
    out.push_str("=== END MEMORY STATE ===\n");
    out
}
