use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use simvec_core::Document;
use simvec_index::Metric;
use simvec_store::{
    EmbeddingProvider, HashEmbedder, PersistentVectorStore, SearchQuery, VectorStore,
    DEFAULT_TOP_K,
};

#[cfg(feature = "http-embeddings")]
use simvec_store::HttpEmbedder;

const CONFIG_TEMPLATE: &str = r#"# simvec configuration

[store]
# Snapshot file every mutation is persisted to.
path = "./data/vectors.svec"
# Similarity metric: "cosine", "euclidean", or "dot".
metric = "cosine"

[embedding]
# "hash" runs locally with no network. "http" targets an OpenAI-compatible
# /v1/embeddings endpoint and needs a binary built with http-embeddings.
provider = "hash"
dimension = 256
# base_url = "https://api.openai.com"
# model = "text-embedding-3-small"
# api_key_env = "OPENAI_API_KEY"
"#;

#[derive(Parser)]
#[command(name = "simvec", about = "simvec — vector similarity search over a local snapshot")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "simvec.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file
    InitConfig,
    /// Ingest JSONL documents, one {"content": ...} object per line
    Ingest {
        /// File to ingest
        file: PathBuf,
    },
    /// Search the store for the most similar records
    Search {
        /// Query text
        query: String,
        /// How many results to return
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        /// Minimum score a result must reach
        #[arg(long)]
        threshold: Option<f64>,
        /// Print results as JSON instead of a ranked list
        #[arg(long)]
        json: bool,
    },
    /// Show snapshot statistics
    Stats,
}

#[derive(Deserialize, Default)]
struct SimvecConfig {
    #[serde(default)]
    store: StoreConfig,
    #[serde(default)]
    embedding: EmbeddingConfig,
}

#[derive(Deserialize)]
struct StoreConfig {
    #[serde(default = "default_store_path")]
    path: PathBuf,
    #[serde(default)]
    metric: Metric,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            metric: Metric::default(),
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    provider: String,
    #[serde(default = "default_dimension")]
    dimension: usize,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    api_key_env: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            dimension: default_dimension(),
            base_url: None,
            model: None,
            api_key_env: None,
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./data/vectors.svec")
}
fn default_provider() -> String {
    "hash".to_string()
}
fn default_dimension() -> usize {
    256
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitConfig => init_config(&cli.config).await,
        Commands::Ingest { file } => {
            let config = load_config(&cli.config).await?;
            ingest(&config, &file).await
        }
        Commands::Search {
            query,
            top_k,
            threshold,
            json,
        } => {
            let config = load_config(&cli.config).await?;
            search(&config, &query, top_k, threshold, json).await
        }
        Commands::Stats => {
            let config = load_config(&cli.config).await?;
            stats(&config).await
        }
    }
}

async fn init_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("refusing to overwrite existing config '{}'", path.display());
    }
    tokio::fs::write(path, CONFIG_TEMPLATE)
        .await
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    println!("Wrote starter config to {}", path.display());
    Ok(())
}

async fn load_config(path: &Path) -> anyhow::Result<SimvecConfig> {
    let raw = tokio::fs::read_to_string(path).await.with_context(|| {
        format!(
            "failed to read config file '{}' (run `simvec init-config` to create one)",
            path.display()
        )
    })?;
    toml::from_str(&raw).with_context(|| format!("invalid config file '{}'", path.display()))
}

fn build_embedder(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hash" => Ok(Arc::new(HashEmbedder::new(config.dimension))),
        #[cfg(feature = "http-embeddings")]
        "http" => {
            let base_url = config
                .base_url
                .clone()
                .context("embedding.base_url is required for the http provider")?;
            let model = config
                .model
                .clone()
                .context("embedding.model is required for the http provider")?;
            let mut embedder = HttpEmbedder::new(base_url, model, config.dimension)?;
            if let Some(var) = &config.api_key_env {
                let key = std::env::var(var)
                    .with_context(|| format!("environment variable '{var}' is not set"))?;
                embedder = embedder.with_api_key(key);
            }
            Ok(Arc::new(embedder))
        }
        #[cfg(not(feature = "http-embeddings"))]
        "http" => {
            anyhow::bail!("this binary was built without the http-embeddings feature")
        }
        other => anyhow::bail!("unknown embedding provider '{other}' (expected hash or http)"),
    }
}

async fn open_store(config: &SimvecConfig) -> anyhow::Result<PersistentVectorStore> {
    let embedder = build_embedder(&config.embedding)?;
    let store =
        PersistentVectorStore::open(&config.store.path, embedder, config.store.metric).await?;
    Ok(store)
}

fn parse_jsonl(raw: &str) -> anyhow::Result<Vec<Document>> {
    let mut documents = Vec::new();
    for (number, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let document: Document = serde_json::from_str(line)
            .with_context(|| format!("invalid document on line {}", number + 1))?;
        documents.push(document);
    }
    Ok(documents)
}

async fn ingest(config: &SimvecConfig, file: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read '{}'", file.display()))?;
    let documents = parse_jsonl(&raw)?;
    if documents.is_empty() {
        println!("Nothing to ingest: '{}' contains no documents", file.display());
        return Ok(());
    }

    let store = open_store(config).await?;
    let ids = store.add(documents).await?;
    println!(
        "Ingested {} document(s) into {} ({} total)",
        ids.len(),
        config.store.path.display(),
        store.count().await?
    );
    Ok(())
}

async fn search(
    config: &SimvecConfig,
    query: &str,
    top_k: usize,
    threshold: Option<f64>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    let mut request = SearchQuery::new(query).top_k(top_k);
    if let Some(threshold) = threshold {
        request = request.threshold(threshold);
    }
    let results = store.similarity_search(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("No matches.");
        return Ok(());
    }
    for (rank, result) in results.iter().enumerate() {
        let text = preview(&result.record.content, 80);
        let ellipsis = if text.len() < result.record.content.len() {
            "…"
        } else {
            ""
        };
        println!(
            "{:>2}. {:.4}  {}  {text}{ellipsis}",
            rank + 1,
            result.score,
            result.record.id,
        );
    }
    Ok(())
}

async fn stats(config: &SimvecConfig) -> anyhow::Result<()> {
    if !config.store.path.exists() {
        println!("No snapshot at {} yet", config.store.path.display());
        return Ok(());
    }
    let store = open_store(config).await?;
    println!("Snapshot:  {}", config.store.path.display());
    println!("Metric:    {}", store.metric().await);
    println!("Records:   {}", store.count().await?);
    match store.dimension().await {
        Some(dimension) => println!("Dimension: {dimension}"),
        None => println!("Dimension: unset (store is empty)"),
    }
    let meta = tokio::fs::metadata(&config.store.path).await?;
    println!("Size:      {} bytes", meta.len());
    Ok(())
}

fn preview(content: &str, limit: usize) -> &str {
    match content.char_indices().nth(limit) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}
