use anyhow::Context;
use sentinel_rag::cli::{Cli, Commands, ConfigAction};
use sentinel_rag::config::Config;
use sentinel_rag::document::{Department, Document};
use sentinel_rag::embedding::provider_from_config;
use sentinel_rag::error::{Result, SentinelError};
use sentinel_rag::llm::OpenAiCompatibleClient;
use sentinel_rag::orchestrator::Orchestrator;
use sentinel_rag::store::{InMemoryVectorStore, VectorStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const CORPUS_EXTENSIONS: [&str; 2] = ["txt", "md"];

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Ask {
            question,
            corpus,
            session,
            department,
            json,
        } => {
            let config = load_config(cli.config, cli.profile)?;
            let runtime = tokio::runtime::Runtime::new().map_err(|e| SentinelError::Io {
                source: e,
                context: "Failed to create tokio runtime".to_string(),
            })?;
            runtime.block_on(cmd_ask(config, &question, &corpus, session, department, json))?;
        }
        Commands::Classify { query } => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_classify(&config, &query)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "sentinel_rag=debug" } else { "sentinel_rag=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn cmd_ask(
    config: Config,
    question: &str,
    corpus: &Path,
    session: Option<String>,
    department: Department,
    json: bool,
) -> Result<()> {
    let embedder = provider_from_config(&config.embedding)?;
    let store = Arc::new(InMemoryVectorStore::new(embedder.clone()));

    let documents = load_corpus(corpus, department)?;
    tracing::info!("Loaded {} documents from {}", documents.len(), corpus.display());
    store.add(documents).await?;

    let llm = Arc::new(OpenAiCompatibleClient::from_config(&config.llm)?);
    let orchestrator = Orchestrator::new(&config, store, embedder, llm)?;

    let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let result = orchestrator.execute(question, &session_id, department).await;

    if json {
        let out = serde_json::to_string_pretty(&result).map_err(|e| SentinelError::Json {
            source: e,
            context: "Failed to serialize result".to_string(),
        })?;
        println!("{}", out);
        return Ok(());
    }

    println!("{}", result.answer);
    if !result.citations.is_empty() {
        println!("\nCitations:");
        for citation in &result.citations {
            println!("  - {}", citation);
        }
    }

    println!(
        "\n[{} | {} | {} docs | {} ms]",
        result.strategy, result.analysis.complexity, result.documents_retrieved, result.elapsed_ms
    );
    if result.used_hgmem {
        let stats = orchestrator.session_stats(&session_id).await;
        println!(
            "[session {} | {} memory points | max order {} | step {}]",
            session_id, stats.memory_points, stats.max_order, stats.interaction_steps
        );
    }
    if let Some(error) = result.error {
        println!("✗ {}", error);
    }

    Ok(())
}

fn cmd_classify(config: &Config, query: &str) -> Result<()> {
    let classifier = sentinel_rag::analysis::QueryClassifier::new(config.classifier.clone())
        .map_err(|e| SentinelError::Config(format!("Invalid classifier pattern: {}", e)))?;
    let analysis = classifier.analyze(query);
    let memory_available = config.features.hgmem_enabled;
    let strategy = sentinel_rag::orchestrator::select_strategy(
        analysis.complexity,
        &config.features,
        memory_available,
    );

    println!("Complexity: {}", analysis.complexity);
    println!("Strategy:   {}", strategy);
    println!("Words:      {}", analysis.word_count);
    println!("Multi-step: {}", analysis.requires_multi_step);
    if !analysis.entities.is_empty() {
        let entities: Vec<&str> = analysis.entities.iter().map(String::as_str).collect();
        println!("Entities:   {}", entities.join(", "));
    }
    Ok(())
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, profile)?;
            let out = toml::to_string_pretty(&config)?;
            println!("{}", out);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SentinelError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    let mut config = if path.exists() {
        Config::load(&path)?
    } else {
        tracing::warn!(
            "Config file not found, using defaults. Run 'sentinel-rag config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    };

    if let Some(profile) = profile {
        config.apply_profile(&profile)?;
    }
    Ok(config)
}

/// Every .txt/.md file directly under `dir`, tagged with its file name and department
fn load_corpus(dir: &Path, department: Department) -> Result<Vec<Document>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read corpus directory {}", dir.display()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| CORPUS_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        documents.push(
            Document::new(content)
                .with_source(name)
                .with_department(department),
        );
    }
    Ok(documents)
}
