//! Sentinel RAG - defended, memory-aware retrieval-augmented generation
//!
//! Queries are classified by complexity and routed through one of four strategies that
//! combine defended retrieval (multi-pass RRF + RAGMask suspicion filtering), hierarchical
//! section filtering with two-pass generation, and per-session hypergraph memory.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod pipeline;
pub mod retrieval;
pub mod store;

pub use error::{Result, SentinelError};
