//! RAGMask: suspicious-token detection
//!
//! A document whose similarity to the query collapses once the query's own terms are
//! masked out was likely stuffed with those terms.

use regex::RegexBuilder;

pub const MASK_TOKEN: &str = "[MASK]";

/// Query terms worth masking: lower-cased, edge punctuation trimmed, longer than `min_len`
pub fn maskable_terms(query: &str, min_len: usize) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for raw in query.to_lowercase().split_whitespace() {
        let term = raw.trim_matches(|c: char| !c.is_alphanumeric());
        if term.chars().count() > min_len && !terms.iter().any(|t| t == term) {
            terms.push(term.to_string());
        }
    }
    terms
}

/// Replace whole-word, case-insensitive occurrences of each term with [`MASK_TOKEN`]
pub fn mask_terms(content: &str, terms: &[String]) -> String {
    let mut masked = content.to_string();
    for term in terms {
        let pattern = format!(r"\b{}\b", regex::escape(term));
        match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(re) => masked = re.replace_all(&masked, MASK_TOKEN).into_owned(),
            Err(e) => tracing::debug!("Skipping unmaskable term '{}': {}", term, e),
        }
    }
    masked
}

/// Normalized similarity drop, clamped to [0, 1]. Zero when the original similarity is
/// not positive.
pub fn suspicion_from_similarities(original: f32, masked: f32) -> f32 {
    if original.is_nan() || original <= 0.0 {
        return 0.0;
    }
    ((original - masked) / original).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maskable_terms() {
        let terms = maskable_terms("What is the Budget? budget allocation", 3);
        assert_eq!(terms, vec!["what", "budget", "allocation"]);
    }

    #[test]
    fn test_mask_whole_words_only() {
        let terms = vec!["budget".to_string()];
        let masked = mask_terms("Budget and budgets. BUDGET!", &terms);
        assert_eq!(masked, "[MASK] and budgets. [MASK]!");
    }

    #[test]
    fn test_terms_are_escaped() {
        let terms = vec!["c++".to_string(), "a.b".to_string()];
        let masked = mask_terms("axb stays", &terms);
        assert_eq!(masked, "axb stays");
    }

    #[test]
    fn test_suspicion_range() {
        assert_eq!(suspicion_from_similarities(0.0, 0.5), 0.0);
        assert_eq!(suspicion_from_similarities(-0.2, 0.5), 0.0);
        assert_eq!(suspicion_from_similarities(0.8, 0.9), 0.0);
        assert!((suspicion_from_similarities(0.8, 0.4) - 0.5).abs() < 1e-6);
        assert_eq!(suspicion_from_similarities(0.5, -0.5), 1.0);
    }
}
