//! Splitting retrieved documents into titled sections

use crate::document::{truncate, Document};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A titled slice of one retrieved document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub title: String,
    pub content: String,
    /// Header nesting, 1-4
    pub level: u8,
    pub source: String,
    /// Assigned by ranking; 0 until then
    pub relevance_score: f32,
}

impl ContentSection {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        level: u8,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            level,
            source: source.into(),
            relevance_score: 0.0,
        }
    }

    pub fn preview(&self, max_chars: usize) -> String {
        truncate(&self.content, max_chars)
    }
}

const MAX_HEADER_CHARS: usize = 100;

pub struct SectionParser {
    paragraph_break: Regex,
    header: Regex,
}

impl SectionParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            paragraph_break: Regex::new(r"\n\n+")?,
            header: Regex::new(r"^(#{1,4}\s+.+|[A-Z][A-Za-z\s]+:)$")?,
        })
    }

    fn is_header(&self, line: &str) -> bool {
        line.chars().count() < MAX_HEADER_CHARS && self.header.is_match(line)
    }

    /// Split a document on blank lines; a paragraph whose first line looks like a header
    /// opens a new section, and its remaining lines belong to that section.
    /// Unstructured documents become a single "Content" section.
    pub fn parse(&self, document: &Document) -> Vec<ContentSection> {
        let content = &document.content;
        let source = document.source_or_unknown();
        let paragraphs: Vec<&str> = self.paragraph_break.split(content).collect();

        let mut sections = Vec::new();

        if paragraphs.len() <= 1 {
            sections.push(ContentSection::new("Content", content.as_str(), 1, &source));
            return sections;
        }

        let mut title = "Introduction".to_string();
        let mut level: u8 = 1;
        let mut body: Vec<&str> = Vec::new();

        for para in paragraphs.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            let (first, rest) = match para.split_once('\n') {
                Some((first, rest)) => (first.trim(), rest.trim()),
                None => (para, ""),
            };
            if self.is_header(first) {
                if !body.is_empty() {
                    sections.push(ContentSection::new(&title, body.join("\n\n"), level, &source));
                    body.clear();
                }
                title = first.trim_start_matches('#').replace(':', "").trim().to_string();
                let hashes = first.chars().take_while(|&c| c == '#').count();
                level = if hashes == 0 { 2 } else { hashes.min(4) as u8 };
                if !rest.is_empty() {
                    body.push(rest);
                }
            } else {
                body.push(para);
            }
        }

        if !body.is_empty() {
            sections.push(ContentSection::new(&title, body.join("\n\n"), level, &source));
        }

        if sections.is_empty() {
            sections.push(ContentSection::new("Full Content", content.as_str(), 1, &source));
        }

        sections
    }
}
