//! Hypergraph data model
//!
//! Vertices are entities; hyperedges are memory points connecting any number of them.
//! All mutation goes through [`HyperGraph`] so an edge never references a missing vertex.

use ahash::{HashMap, HashMapExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Deterministic vertex id: `v_` + lower-cased name, whitespace runs as `_`,
/// anything outside `[a-z0-9_]` dropped
pub fn vertex_id(entity_name: &str) -> String {
    let underscored = entity_name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    let mut id = String::with_capacity(underscored.len() + 2);
    id.push_str("v_");
    id.extend(
        underscored
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_'),
    );
    id
}

/// Random edge id with the given prefix
pub fn edge_id(prefix: &str) -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &uuid[..8])
}

/// Jaccard similarity of two id sets; 0 when both are empty
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: String,
    pub name: String,
    pub description: String,
    pub source_chunks: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vertex {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: vertex_id(&name),
            name,
            description: String::new(),
            source_chunks: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperEdge {
    pub id: String,
    pub description: String,
    pub vertex_ids: BTreeSet<String>,
    pub confidence: f64,
    /// Merge generations behind this edge; 1 for a primitive fact
    pub order: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HyperEdge {
    pub fn new(id: impl Into<String>, description: impl Into<String>, vertex_ids: BTreeSet<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            description: description.into(),
            vertex_ids,
            confidence: 1.0,
            order: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Edge covering both inputs: vertex union, order `max + 1`, mean confidence
    pub fn merged(id: impl Into<String>, a: &HyperEdge, b: &HyperEdge, description: impl Into<String>) -> Self {
        let vertex_ids = a.vertex_ids.union(&b.vertex_ids).cloned().collect();
        let mut edge = Self::new(id, description, vertex_ids);
        edge.order = a.order.max(b.order) + 1;
        edge.confidence = (a.confidence + b.confidence) / 2.0;
        edge
    }

    pub fn shares_vertex_with(&self, other: &HyperEdge) -> bool {
        !self.vertex_ids.is_disjoint(&other.vertex_ids)
    }
}

/// One session's memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperGraph {
    pub session_id: String,
    vertices: HashMap<String, Vertex>,
    /// Insertion order; consolidation scans in this order
    edges: Vec<HyperEdge>,
    interaction_step: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HyperGraph {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            vertices: HashMap::new(),
            edges: Vec::new(),
            interaction_step: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn vertex(&self, id: &str) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Find or create the vertex for an entity, recording `source` against it
    pub fn upsert_vertex(&mut self, entity_name: &str, source: Option<&str>) -> String {
        let id = vertex_id(entity_name);
        let vertex = self
            .vertices
            .entry(id.clone())
            .or_insert_with(|| Vertex::new(entity_name));
        if let Some(source) = source {
            if vertex.source_chunks.insert(source.to_string()) {
                vertex.updated_at = Utc::now();
            }
        }
        self.touch();
        id
    }

    pub fn edge(&self, id: &str) -> Option<&HyperEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn edges(&self) -> &[HyperEdge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Add an edge. Returns false, leaving the graph unchanged, if any of its
    /// vertices is missing.
    pub fn add_edge(&mut self, edge: HyperEdge) -> bool {
        if !edge.vertex_ids.iter().all(|v| self.vertices.contains_key(v)) {
            return false;
        }
        self.edges.push(edge);
        self.touch();
        true
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<HyperEdge> {
        let pos = self.edges.iter().position(|e| e.id == id)?;
        self.touch();
        Some(self.edges.remove(pos))
    }

    /// Replace an edge's description; false if the id is unknown
    pub fn set_edge_description(&mut self, id: &str, description: impl Into<String>) -> bool {
        match self.edges.iter_mut().find(|e| e.id == id) {
            Some(edge) => {
                edge.description = description.into();
                edge.updated_at = Utc::now();
                self.touch();
                true
            }
            None => false,
        }
    }

    pub fn interaction_step(&self) -> u32 {
        self.interaction_step
    }

    /// Advance the step counter, returning the new value
    pub fn increment_step(&mut self) -> u32 {
        self.interaction_step += 1;
        self.touch();
        self.interaction_step
    }

    pub fn max_order(&self) -> u32 {
        self.edges.iter().map(|e| e.order).max().unwrap_or(0)
    }

    /// Edges sorted by descending order; equal orders keep insertion order
    pub fn edges_by_order(&self) -> Vec<&HyperEdge> {
        let mut sorted: Vec<&HyperEdge> = self.edges.iter().collect();
        sorted.sort_by(|a, b| b.order.cmp(&a.order));
        sorted
    }

    /// Display names of an edge's vertices, in vertex-id order
    pub fn entity_names(&self, edge: &HyperEdge) -> Vec<String> {
        edge.vertex_ids
            .iter()
            .filter_map(|id| self.vertices.get(id))
            .map(|v| v.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_vertex_id_normalization() {
        assert_eq!(vertex_id("Acme Corp"), "v_acme_corp");
        assert_eq!(vertex_id("  O'Hara   Group "), "v_ohara_group");
        assert_eq!(vertex_id("Q3-2024"), "v_q32024");
    }

    #[test]
    fn test_edge_id_prefix() {
        let id = edge_id("he_");
        assert!(id.starts_with("he_"));
        assert_eq!(id.len(), 11);
    }

    #[test]
    fn test_jaccard() {
        assert!((jaccard(&ids(&["a", "b"]), &ids(&["a", "b", "c"])) - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(jaccard(&ids(&[]), &ids(&[])), 0.0);
        assert_eq!(jaccard(&ids(&["a"]), &ids(&["a"])), 1.0);
    }

    #[test]
    fn test_merged_edge_arithmetic() {
        let mut a = HyperEdge::new("a", "x", ids(&["v_1"]));
        a.order = 2;
        a.confidence = 0.6;
        let b = HyperEdge::new("b", "y", ids(&["v_2"]));
        let m = HyperEdge::merged("m", &a, &b, "xy");
        assert_eq!(m.order, 3);
        assert!((m.confidence - 0.8).abs() < 1e-9);
        assert_eq!(m.vertex_ids, ids(&["v_1", "v_2"]));
    }

    #[test]
    fn test_add_edge_requires_vertices() {
        let mut graph = HyperGraph::new("s");
        assert!(!graph.add_edge(HyperEdge::new("e", "d", ids(&["v_ghost"]))));

        let v = graph.upsert_vertex("Ghost", Some("doc.txt"));
        assert!(graph.add_edge(HyperEdge::new("e", "d", ids(&[v.as_str()]))));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.vertex("v_ghost").unwrap().source_chunks.contains("doc.txt"));
    }

    #[test]
    fn test_edges_by_order() {
        let mut graph = HyperGraph::new("s");
        graph.upsert_vertex("A", None);
        let mut high = HyperEdge::new("high", "d", ids(&["v_a"]));
        high.order = 3;
        graph.add_edge(HyperEdge::new("first", "d", ids(&["v_a"])));
        graph.add_edge(high);
        graph.add_edge(HyperEdge::new("second", "d", ids(&["v_a"])));

        let order: Vec<&str> = graph.edges_by_order().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(order, vec!["high", "first", "second"]);
        assert_eq!(graph.max_order(), 3);
    }
}
