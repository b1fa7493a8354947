//! Parsing of free-text LLM responses
//!
//! Models answer in loosely structured text. Everything that turns that text into
//! indices, lines or citations lives here so the stages above stay prompt-agnostic.

use regex::Regex;

pub struct ResponseParser {
    index_separator: Regex,
    citation: Regex,
}

impl ResponseParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            index_separator: Regex::new(r"[,\s]+")?,
            citation: Regex::new(r"\[([^\]]+\.[a-zA-Z]+)\]")?,
        })
    }

    /// Integer tokens below `bound`, in response order, duplicates kept.
    /// Tokens that are not plain non-negative integers are ignored.
    pub fn parse_indices(&self, response: &str, bound: usize) -> Vec<usize> {
        self.index_separator
            .split(response.trim())
            .filter(|tok| !tok.is_empty() && tok.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|tok| tok.parse::<usize>().ok())
            .filter(|&i| i < bound)
            .collect()
    }

    /// Like [`parse_indices`](Self::parse_indices) with only the first occurrence of each index
    pub fn parse_distinct_indices(&self, response: &str, bound: usize) -> Vec<usize> {
        let mut out: Vec<usize> = Vec::new();
        for i in self.parse_indices(response, bound) {
            if !out.contains(&i) {
                out.push(i);
            }
        }
        out
    }

    /// `[name.ext]` citations in order of first appearance
    pub fn extract_citations(&self, text: &str) -> Vec<String> {
        let mut citations: Vec<String> = Vec::new();
        for cap in self.citation.captures_iter(text) {
            if let Some(m) = cap.get(1) {
                let citation = m.as_str().to_string();
                if !citations.contains(&citation) {
                    citations.push(citation);
                }
            }
        }
        citations
    }
}

/// Trimmed lines longer than `min_chars`, at most `limit` of them
pub fn parse_lines(response: &str, min_chars: usize, limit: usize) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|l| l.chars().count() > min_chars)
        .take(limit)
        .map(String::from)
        .collect()
}
