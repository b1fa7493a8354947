//! Heuristic entity extraction
//!
//! Capitalized tokens and quoted phrases stand in for a real NER model. Expect false
//! positives ("What", "The"): consumers treat the set as a noisy hint.

use regex::Regex;
use std::collections::BTreeSet;

/// Extracts candidate entity names from free text
pub struct EntityExtractor {
    quoted: Regex,
    min_token_len: usize,
}

impl EntityExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            quoted: Regex::new(r#""([^"]+)""#)?,
            min_token_len: 3,
        })
    }

    /// Capitalized words (after stripping non-alphanumerics) plus quoted substrings.
    /// Never fails; returns an empty set when nothing qualifies.
    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        let mut entities = BTreeSet::new();

        for word in text.split_whitespace() {
            let cleaned: String = word.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
            let starts_upper = cleaned
                .chars()
                .next()
                .map(|c| c.is_ascii_uppercase())
                .unwrap_or(false);
            if cleaned.len() >= self.min_token_len && starts_upper {
                entities.insert(cleaned);
            }
        }

        for cap in self.quoted.captures_iter(text) {
            if let Some(phrase) = cap.get(1) {
                entities.insert(phrase.as_str().to_string());
            }
        }

        entities
    }
}
