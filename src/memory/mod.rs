//! Hypergraph working memory
//!
//! - `graph`: vertices (entities), hyperedges (memory points), per-session graph
//! - `store`: concurrent session map with per-graph locking
//! - `service`: insert / update / merge / consolidate / export operations

mod graph;
mod service;
mod store;

pub use graph::{edge_id, jaccard, vertex_id, HyperEdge, HyperGraph, Vertex};
pub use service::{HyperGraphMemory, MemoryStats, EMPTY_MEMORY_CONTEXT};
pub use store::{SessionStore, SharedGraph};
