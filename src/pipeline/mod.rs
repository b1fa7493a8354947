//! Hierarchical filtering and two-pass generation pipeline

mod hifi;
mod parsing;
pub mod prompts;
mod sections;

pub use hifi::{CitationVerification, HierarchicalPipeline, PipelineResult, TwoPassResult};
pub use parsing::{parse_lines, ResponseParser};
pub use sections::{ContentSection, SectionParser};
