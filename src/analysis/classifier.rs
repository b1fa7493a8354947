//! Rule-based query complexity classification

use super::entities::EntityExtractor;
use crate::config::ClassifierConfig;
use crate::document::truncate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryComplexity {
    /// Direct factual lookup
    Simple,
    /// Standard retrieval + generation
    Moderate,
    /// Analysis or synthesis across documents
    Complex,
    /// Chained reasoning over several sub-questions
    MultiHop,
}

impl QueryComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryComplexity::Simple => "SIMPLE",
            QueryComplexity::Moderate => "MODERATE",
            QueryComplexity::Complex => "COMPLEX",
            QueryComplexity::MultiHop => "MULTI_HOP",
        }
    }
}

impl fmt::Display for QueryComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier verdict for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub original: String,
    pub word_count: usize,
    pub complexity: QueryComplexity,
    pub requires_multi_step: bool,
    pub entities: BTreeSet<String>,
}

pub struct QueryClassifier {
    config: ClassifierConfig,
    lookup: Regex,
    analytical: Regex,
    conjunctive: Regex,
    extractor: EntityExtractor,
}

impl QueryClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            config,
            lookup: Regex::new(r"what is|who is|when did|where is|how many")?,
            analytical: Regex::new(r"compare|analyze|explain why|relationship|how does.*affect")?,
            conjunctive: Regex::new(r"and also|in addition|furthermore|both.*and")?,
            extractor: EntityExtractor::new()?,
        })
    }

    /// Classify a query. Rules are checked in order; the first match wins.
    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        let word_count = query.split_whitespace().count();
        let lower = query.to_lowercase();

        let complexity = if self.lookup.is_match(&lower)
            && word_count < self.config.simple_word_threshold
        {
            QueryComplexity::Simple
        } else if self.analytical.is_match(&lower) || word_count > self.config.complex_word_threshold
        {
            QueryComplexity::Complex
        } else if self.conjunctive.is_match(&lower) || query.matches('?').count() > 1 {
            QueryComplexity::MultiHop
        } else {
            QueryComplexity::Moderate
        };

        let requires_multi_step = matches!(
            complexity,
            QueryComplexity::Complex | QueryComplexity::MultiHop
        );
        let entities = self.extractor.extract(query);

        tracing::info!(
            complexity = %complexity,
            multi_step = requires_multi_step,
            entities = entities.len(),
            "Query analyzed: {}",
            truncate(query, 50)
        );

        QueryAnalysis {
            original: query.to_string(),
            word_count,
            complexity,
            requires_multi_step,
            entities,
        }
    }

    pub fn extract_entities(&self, text: &str) -> BTreeSet<String> {
        self.extractor.extract(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> QueryClassifier {
        QueryClassifier::new(ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn test_simple_lookup() {
        let analysis = classifier().analyze("What is the budget?");
        assert_eq!(analysis.complexity, QueryComplexity::Simple);
        assert_eq!(analysis.word_count, 4);
        assert!(!analysis.requires_multi_step);
    }

    #[test]
    fn test_long_lookup_is_not_simple() {
        let analysis =
            classifier().analyze("What is the budget for the logistics team across all the regions");
        assert_ne!(analysis.complexity, QueryComplexity::Simple);
    }

    #[test]
    fn test_complex_by_keyword() {
        let analysis = classifier().analyze("Compare the two vendor proposals");
        assert_eq!(analysis.complexity, QueryComplexity::Complex);
        assert!(analysis.requires_multi_step);
    }

    #[test]
    fn test_complex_by_length() {
        let query = "word ".repeat(26);
        assert_eq!(classifier().analyze(&query).complexity, QueryComplexity::Complex);
    }

    #[test]
    fn test_multi_hop() {
        let c = classifier();
        assert_eq!(
            c.analyze("List the suppliers and also their contract terms").complexity,
            QueryComplexity::MultiHop
        );
        assert_eq!(
            c.analyze("Who signed it? When was it renewed?").complexity,
            QueryComplexity::MultiHop
        );
    }

    #[test]
    fn test_moderate_default() {
        let analysis = classifier().analyze("Summarize the quarterly logistics report");
        assert_eq!(analysis.complexity, QueryComplexity::Moderate);
    }

    #[test]
    fn test_simple_checked_before_complex() {
        // lookup phrasing wins even though "relationship" is analytical
        let analysis = classifier().analyze("What is the relationship?");
        assert_eq!(analysis.complexity, QueryComplexity::Simple);
    }
}
