//! Template answer for the fast path: no LLM involved

use crate::document::ScoredDocument;

pub const NO_RECORDS_MESSAGE: &str = "No relevant records found in the intelligence database.";

const MAX_SENTENCES: usize = 3;
const MIN_SENTENCE_CHARS: usize = 20;

/// Unique sources in retrieval order; documents without one count as "unknown"
pub fn unique_sources(documents: &[ScoredDocument]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for doc in documents {
        let source = doc.document.source_or_unknown();
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
    sources
}

/// Up to three substantive sentences as bullets, followed by the source list
pub fn build_simple_response(documents: &[ScoredDocument], sources: &[String]) -> String {
    if documents.is_empty() {
        return NO_RECORDS_MESSAGE.to_string();
    }

    let context: String = documents
        .iter()
        .map(|d| format!("{}\n\n", d.document.content))
        .collect();

    let mut response = String::from("Based on available intelligence:\n\n");
    let sentences = context
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .take(MAX_SENTENCES);
    for sentence in sentences {
        response.push_str("• ");
        response.push_str(sentence);
        response.push_str(".\n");
    }

    if !sources.is_empty() {
        response.push_str("\nSources: ");
        response.push_str(&sources.join(", "));
    }
    response
}
