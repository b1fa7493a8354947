//! CLI command definitions and parsing
use crate::document::Department;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sentinel-rag",
    version,
    author = "neur0map",
    about = "Defended, memory-aware retrieval-augmented question answering",
    long_about = "Sentinel RAG classifies each question, retrieves from a department-scoped corpus \
                  with poisoning defenses, filters and ranks document sections with an LLM, and keeps \
                  per-session hypergraph memory for multi-hop questions."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/sentinel-rag/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile to apply on top of the config (e.g., "fast", "offline")
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question from a directory of .txt/.md documents
    Ask {
        /// Question to ask
        question: String,

        /// Directory holding the corpus
        #[arg(long, value_name = "DIR")]
        corpus: PathBuf,

        /// Session ID for hypergraph memory (defaults to a fresh one)
        #[arg(short, long)]
        session: Option<String>,

        /// Department the corpus belongs to
        #[arg(short, long, default_value = "OPERATIONS")]
        department: Department,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how a query would be classified and routed
    Classify {
        /// Query text
        query: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_parses_department() {
        let cli = Cli::try_parse_from([
            "sentinel-rag",
            "ask",
            "What is the budget?",
            "--corpus",
            "docs",
            "--department",
            "finance",
        ])
        .unwrap();

        match cli.command {
            Commands::Ask { department, json, session, .. } => {
                assert_eq!(department, Department::Finance);
                assert!(!json);
                assert!(session.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_department_rejected() {
        let parsed = Cli::try_parse_from([
            "sentinel-rag",
            "ask",
            "q",
            "--corpus",
            "docs",
            "--department",
            "marketing",
        ]);
        assert!(parsed.is_err());
    }
}
