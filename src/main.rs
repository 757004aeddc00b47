use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use opsrag::backends::EmbeddingBackend;
use opsrag::backends::GenerationBackend;
use opsrag::backends::OllamaEmbeddings;
use opsrag::backends::OllamaGenerator;
use opsrag::config::AppConfig;
use opsrag::ingest::DocumentProcessor;
use opsrag::models::AdditionalContext;
use opsrag::pipeline::IntegratedPipeline;
use opsrag::store::VectorStore;
use opsrag::Result;
use tracing::info;

#[derive(Parser)]
#[command(name = "opsrag")]
#[command(about = "RAG assistant CLI for IT incident resolution")]
#[command(version)]
struct Cli {
    /// Log to the console only, skipping the rolling log file
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector store from incident data files
    Init {
        /// Directory of incident .txt files (defaults to config)
        #[arg(long)]
        data_dir: Option<String>,
        /// Chunk size in characters (defaults to config)
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Chunk overlap in characters (defaults to config)
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },
    /// Process a query through the retrieval pipeline
    Query {
        /// The incident query to process
        query: String,
        /// Number of context documents to retrieve
        #[arg(short, long)]
        num_docs: Option<usize>,
        /// Additional context as key=value pairs
        #[arg(short, long)]
        context: Vec<String>,
        /// Bypass the cache and recompute
        #[arg(long)]
        force_refresh: bool,
    },
    /// Cache maintenance commands
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Remove all cached query payloads
    Clear,
    /// Remove the cached payload for a specific query
    Invalidate {
        /// The query whose cache entry should be removed
        query: String,
        /// Additional context as key=value pairs
        #[arg(short, long)]
        context: Vec<String>,
    },
}

fn parse_context(pairs: &[String]) -> Option<AdditionalContext> {
    if pairs.is_empty() {
        return None;
    }
    let mut map = AdditionalContext::new();
    for pair in pairs {
        let (key, value) = pair.split_once('=').unwrap_or((pair.as_str(), ""));
        map.insert(
            key.to_string(),
            serde_json::Value::String(value.to_string()),
        );
    }
    Some(map)
}

async fn run_init(
    config: &AppConfig,
    data_dir: Option<String>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
) -> Result<()> {
    let data_dir = data_dir.unwrap_or_else(|| config.data_dir().to_string());
    let chunk_size = chunk_size.unwrap_or_else(|| config.chunk_size());
    let chunk_overlap = chunk_overlap.unwrap_or_else(|| config.chunk_overlap());

    info!(
        "Initializing vector store with chunk_size={}, overlap={}",
        chunk_size, chunk_overlap
    );

    let processor = DocumentProcessor::new(chunk_size, chunk_overlap)?;
    let documents = processor.load_documents(&data_dir)?;
    println!("Found {} document chunks", documents.len());

    let embedder: Arc<dyn EmbeddingBackend> = Arc::new(OllamaEmbeddings::new(
        config.embeddings_endpoint(),
        config.embedding_model(),
    )?);
    let store = VectorStore::new(embedder, config.embedding_dimension());

    println!("Adding documents to vector store...");
    store.add(documents).await?;

    println!("Saving vector store to {}...", config.artifacts_dir());
    store.save(config.artifacts_dir()).await?;
    println!("Vector store initialized successfully!");
    Ok(())
}

async fn run_query(
    config: &AppConfig,
    query: &str,
    num_docs: Option<usize>,
    context: Option<AdditionalContext>,
    force_refresh: bool,
) -> Result<()> {
    let pipeline = match num_docs {
        None => IntegratedPipeline::new(config)?,
        Some(k) => {
            let embedder: Arc<dyn EmbeddingBackend> = Arc::new(OllamaEmbeddings::new(
                config.embeddings_endpoint(),
                config.embedding_model(),
            )?);
            let generator: Arc<dyn GenerationBackend> = Arc::new(OllamaGenerator::new(
                config.llm_endpoint(),
                config.llm_model(),
                config.llm.temperature,
            )?);
            let store = Arc::new(VectorStore::load(embedder, config.artifacts_dir())?);
            IntegratedPipeline::from_parts(
                store,
                generator,
                config.cache_enabled(),
                config.cache_namespace().to_string(),
                std::time::Duration::from_secs(config.cache_ttl_secs()),
                k,
            )
        }
    };

    let payload = pipeline
        .process_query(query, context.as_ref(), force_refresh)
        .await?;

    println!("Response:\n{}\n", payload.response);
    println!("Sources ({} documents):", payload.context.metadata.len());
    for (i, metadata) in payload.context.metadata.iter().enumerate() {
        println!(
            "  {}. {} (relevance: {:.4})",
            i + 1,
            metadata.source,
            metadata.relevance_score
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    if cli.verbose {
        opsrag::logging::init_simple_logging()?;
    } else {
        opsrag::logging::init_logging_with_config(Some(&config))?;
    }

    match cli.command {
        Commands::Init {
            data_dir,
            chunk_size,
            chunk_overlap,
        } => run_init(&config, data_dir, chunk_size, chunk_overlap).await?,
        Commands::Query {
            query,
            num_docs,
            context,
            force_refresh,
        } => {
            run_query(
                &config,
                &query,
                num_docs,
                parse_context(&context),
                force_refresh,
            )
            .await?;
        }
        Commands::Cache(command) => {
            let pipeline = IntegratedPipeline::new(&config)?;
            match command {
                CacheCommands::Clear => {
                    let cleared = pipeline.clear_all_cache().await;
                    println!("Cache cleared: {cleared}");
                }
                CacheCommands::Invalidate { query, context } => {
                    let invalidated = pipeline
                        .invalidate_cache(&query, parse_context(&context).as_ref())
                        .await;
                    println!("Cache invalidated: {invalidated}");
                }
            }
        }
    }

    Ok(())
}
