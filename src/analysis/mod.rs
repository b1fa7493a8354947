//! Query analysis
//!
//! - `QueryClassifier` routes each query to a complexity class
//! - `EntityExtractor` pulls candidate entity names for memory tracking

mod classifier;
mod entities;

pub use classifier::{QueryAnalysis, QueryClassifier, QueryComplexity};
pub use entities::EntityExtractor;
