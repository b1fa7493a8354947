//! Reciprocal Rank Fusion over any number of weighted ranked lists

use crate::document::{Document, ScoredDocument};
use ahash::{HashMap, HashMapExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Invalid RRF constant: must be positive, got {0}")]
    InvalidK(f32),

    #[error("Invalid list weight: must be positive, got {0}")]
    InvalidWeight(f32),
}

/// One ranked result list and the weight its ranks contribute with
#[derive(Debug, Clone)]
pub struct RankedList {
    pub weight: f32,
    pub documents: Vec<ScoredDocument>,
}

impl RankedList {
    pub fn new(weight: f32, documents: Vec<ScoredDocument>) -> Self {
        Self { weight, documents }
    }

    pub fn unweighted(documents: Vec<ScoredDocument>) -> Self {
        Self::new(1.0, documents)
    }
}

/// A document with its fused score
#[derive(Debug, Clone)]
pub struct FusedDocument {
    pub id: String,
    pub document: Document,
    pub score: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct FusionConfig {
    /// RRF K constant (typically 60)
    pub rrf_k: f32,
}

impl FusionConfig {
    pub fn new(rrf_k: f32) -> Result<Self, FusionError> {
        if rrf_k <= 0.0 {
            return Err(FusionError::InvalidK(rrf_k));
        }
        Ok(Self { rrf_k })
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { rrf_k: 60.0 }
    }
}

/// Contribution of one appearance at 0-based `rank`
pub fn rrf_score(weight: f32, rank: usize, rrf_k: f32) -> f32 {
    weight / (rrf_k + rank as f32)
}

/// Apply Reciprocal Rank Fusion to combine ranked lists
///
/// RRF formula: score(id) = sum over all lists of: weight / (k + rank), rank 0-based.
/// Identity is [`Document::document_id`]; the first-seen copy of a document is kept.
///
/// # Returns
/// Fused documents sorted by score descending; equal scores keep first-seen order.
/// Fails with [`FusionError::InvalidWeight`] if any list weight is not a positive finite number.
pub fn reciprocal_rank_fusion(
    lists: Vec<RankedList>,
    config: &FusionConfig,
) -> Result<Vec<FusedDocument>, FusionError> {
    if let Some(bad) = lists.iter().find(|l| !(l.weight.is_finite() && l.weight > 0.0)) {
        return Err(FusionError::InvalidWeight(bad.weight));
    }

    let mut fused: Vec<FusedDocument> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for list in lists {
        for (rank, scored) in list.documents.into_iter().enumerate() {
            let contribution = rrf_score(list.weight, rank, config.rrf_k);
            let id = scored.document.document_id();
            match index.get(&id) {
                Some(&slot) => fused[slot].score += contribution,
                None => {
                    index.insert(id.clone(), fused.len());
                    fused.push(FusedDocument {
                        id,
                        document: scored.document,
                        score: contribution,
                    });
                }
            }
        }
    }

    // Stable sort keeps first-seen order for ties
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    Ok(fused)
}
