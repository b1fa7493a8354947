//! Defended retrieval
//!
//! Multi-pass Reciprocal Rank Fusion, fragment partitioning and RAGMask suspicion
//! filtering, composed into [`DefendedRetriever::secure_search`].

mod defended;
mod fusion;
mod partition;
mod suspicion;

pub use defended::{
    DefendedRetriever, RAGPART_INDEX_KEY, RAGPART_PARTITIONS_KEY, RAGPART_TOTAL_KEY,
    RAGPART_TYPE_KEY,
};
pub use fusion::{reciprocal_rank_fusion, rrf_score, FusedDocument, FusionConfig, FusionError, RankedList};
pub use partition::{combination_text, generate_combinations, partition_document, split_sentences};
pub use suspicion::{mask_terms, maskable_terms, suspicion_from_similarities, MASK_TOKEN};
