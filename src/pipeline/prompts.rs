//! Prompt templates for each pipeline stage
//!
//! Each builder returns `(system, user)` for [`LlmClient::complete`](crate::llm::LlmClient::complete).

use super::sections::ContentSection;
use crate::document::{truncate, Department};

pub const NO_RECORDS_ANSWER: &str = "No relevant records found.";

pub fn formulation(user_query: &str, max_queries: usize) -> (String, String) {
    let system = format!(
        "Create effective and concise search queries for this question.\n\
         Extract core intent and distinct search terms.\n\n\
         User Question: {}\n\n\
         Return 1-{} search queries, one per line. No explanations or numbering.",
        user_query, max_queries
    );
    (system, "Generate search queries:".to_string())
}

pub fn section_ranking(
    user_query: &str,
    sections: &[ContentSection],
    preview_chars: usize,
) -> (String, String) {
    let previews: String = sections
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] Title: {} | Preview: {}\n", i, s.title, s.preview(preview_chars)))
        .collect();

    let system = format!(
        "Given a user question and section previews, identify which sections are \
         helpful for answering the question.\n\n\
         User Question: {}\n\n\
         Section Previews:\n{}\n\
         Return a comma-separated list of section indices, sorted by relevance \
         (most relevant first). Only include sections that directly help answer \
         the question. Return just the numbers, nothing else.\n\
         Example: 2,0,5,3",
        user_query, previews
    );
    (system, "Relevant section indices:".to_string())
}

/// Section context as fed to the drafting pass
pub fn section_context(sections: &[ContentSection]) -> String {
    sections
        .iter()
        .map(|s| format!("=== [{}] {} ===\n{}\n\n", s.source, s.title, s.content))
        .collect()
}

pub fn draft(user_query: &str, sections: &[ContentSection], department: Department) -> (String, String) {
    let system = format!(
        "You are SENTINEL, an advanced intelligence agent assigned to {} sector ({}).\n\n\
         Answer the user question based ONLY on the provided context.\n\
         Include ONLY information that can be directly supported by the context.\n\
         For each fact, note the source in brackets [filename].\n\
         If the context doesn't contain the answer, say \"{}\"\n\n\
         Context:\n{}\n\
         Question: {}",
        department.as_str(),
        department.label(),
        NO_RECORDS_ANSWER,
        section_context(sections),
        user_query
    );
    (system, "Provide your answer:".to_string())
}

pub fn refine(draft: &str) -> (String, String) {
    let system = format!(
        "You are refining an intelligence response for clarity and professionalism.\n\n\
         Revise the following answer to:\n\
         1. Be concise (1-3 sentences if possible)\n\
         2. Maintain all factual claims with their citations\n\
         3. Use professional, authoritative tone\n\
         4. Remove any hedging language unless uncertainty is warranted\n\n\
         Original Answer:\n{}\n\n\
         Refined Answer:",
        draft
    );
    (system, "Provide refined answer:".to_string())
}

pub fn verification(
    answer: &str,
    sections: &[ContentSection],
    excerpt_chars: usize,
) -> (String, String) {
    let sources: String = sections
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] {}: {}\n", i, s.source, truncate(&s.content, excerpt_chars)))
        .collect();

    let system = format!(
        "Read the ANSWER and identify which SOURCES directly support the information.\n\
         Only list indices of sources that directly support claims in the answer.\n\
         If no sources match, return empty list.\n\n\
         ANSWER: {}\n\n\
         SOURCES:\n{}\n\
         Return comma-separated source indices only. Example: 0,2,3",
        answer, sources
    );
    (system, "Verified source indices:".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranking_prompt_lists_previews() {
        let sections = vec![
            ContentSection::new("Budget", "a".repeat(300), 2, "plan.md"),
            ContentSection::new("Staff", "twelve hires", 2, "plan.md"),
        ];
        let (system, user) = section_ranking("budget?", &sections, 150);
        assert!(system.contains(&format!("[0] Title: Budget | Preview: {}...", "a".repeat(150))));
        assert!(system.contains("[1] Title: Staff | Preview: twelve hires"));
        assert_eq!(user, "Relevant section indices:");
    }

    #[test]
    fn test_draft_prompt_names_department_and_sources() {
        let sections = vec![ContentSection::new("Budget", "Funds total $4M.", 2, "plan.md")];
        let (system, _) = draft("What is the budget?", &sections, Department::Finance);
        assert!(system.contains("assigned to FINANCE sector (Financial Intelligence)"));
        assert!(system.contains("=== [plan.md] Budget ===\nFunds total $4M."));
        assert!(system.contains(NO_RECORDS_ANSWER));
    }
}
