//! Documents, department scoping and search filters shared by every stage

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const SOURCE_KEY: &str = "source";
pub const ID_KEY: &str = "id";
pub const DEPARTMENT_KEY: &str = "department";

/// A retrievable unit of text with free-form metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Builder-style metadata insert
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_source(self, source: impl Into<String>) -> Self {
        self.with_metadata(SOURCE_KEY, source.into())
    }

    pub fn with_department(self, department: Department) -> Self {
        self.with_metadata(DEPARTMENT_KEY, department.as_str())
    }

    /// The `source` metadata field, if present
    pub fn source(&self) -> Option<String> {
        self.metadata.get(SOURCE_KEY).map(value_to_string)
    }

    /// Identity used for fusion and de-duplication: `source`, then `id`, then a content hash
    pub fn document_id(&self) -> String {
        if let Some(source) = self.metadata.get(SOURCE_KEY) {
            return value_to_string(source);
        }
        if let Some(id) = self.metadata.get(ID_KEY) {
            return value_to_string(id);
        }
        blake3::hash(self.content.as_bytes()).to_hex().to_string()
    }

    /// Source name for display, `"unknown"` when the document carries none
    pub fn source_or_unknown(&self) -> String {
        self.source().unwrap_or_else(|| "unknown".to_string())
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A document returned by a similarity search, with the store's score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

impl ScoredDocument {
    pub fn new(document: Document, score: f32) -> Self {
        Self { document, score }
    }
}

/// Department / sector that scopes a corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Department {
    Operations,
    Finance,
    Legal,
    Medical,
    Defense,
    Enterprise,
}

impl Department {
    pub const ALL: [Department; 6] = [
        Department::Operations,
        Department::Finance,
        Department::Legal,
        Department::Medical,
        Department::Defense,
        Department::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Operations => "OPERATIONS",
            Department::Finance => "FINANCE",
            Department::Legal => "LEGAL",
            Department::Medical => "MEDICAL",
            Department::Defense => "DEFENSE",
            Department::Enterprise => "ENTERPRISE",
        }
    }

    /// Human-readable sector label
    pub fn label(&self) -> &'static str {
        match self {
            Department::Operations => "General Operations",
            Department::Finance => "Financial Intelligence",
            Department::Legal => "Legal/Contracts",
            Department::Medical => "Medical/Clinical",
            Department::Defense => "Defense/Military",
            Department::Enterprise => "Enterprise",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Department::ALL
            .iter()
            .copied()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown department: {}", s))
    }
}

/// Metadata equality filter applied by the vector store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub equals: HashMap<String, String>,
}

impl SearchFilter {
    pub fn department(department: Department) -> Self {
        let mut equals = HashMap::new();
        equals.insert(DEPARTMENT_KEY.to_string(), department.as_str().to_string());
        Self { equals }
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.equals.iter().all(|(key, expected)| {
            document
                .metadata
                .get(key)
                .map(|v| value_to_string(v) == *expected)
                .unwrap_or(false)
        })
    }
}

/// Truncate to at most `max_chars` characters, appending "..." when cut
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_prefers_source() {
        let doc = Document::new("body")
            .with_metadata(ID_KEY, "doc-7")
            .with_source("budget.pdf");
        assert_eq!(doc.document_id(), "budget.pdf");
    }

    #[test]
    fn test_document_id_falls_back_to_id_then_hash() {
        let with_id = Document::new("body").with_metadata(ID_KEY, 42);
        assert_eq!(with_id.document_id(), "42");

        let bare_a = Document::new("same body");
        let bare_b = Document::new("same body");
        assert_eq!(bare_a.document_id(), bare_b.document_id());
        assert_ne!(bare_a.document_id(), Document::new("other").document_id());
    }

    #[test]
    fn test_department_filter() {
        let filter = SearchFilter::department(Department::Finance);
        let finance = Document::new("x").with_department(Department::Finance);
        let legal = Document::new("x").with_department(Department::Legal);
        let untagged = Document::new("x");

        assert!(filter.matches(&finance));
        assert!(!filter.matches(&legal));
        assert!(!filter.matches(&untagged));
    }

    #[test]
    fn test_department_parse() {
        assert_eq!("finance".parse::<Department>(), Ok(Department::Finance));
        assert!("marketing".parse::<Department>().is_err());
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
        assert_eq!(truncate("short", 10), "short");
    }
}
