use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use doc_similarity_core::{
    ChunkStrategy, Chunker, CorpusIndex, Document, EmbeddingConfig, FileTextExtractor,
    IngestionPipeline, OpenAiEmbedder, OverlapParams, QueryService, SearchError, TextExtractor,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-similarity", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct StrategyArgs {
    /// Chunking strategy: sentence, paragraph or overlap.
    #[arg(long, default_value = "sentence")]
    strategy: String,

    /// Words per window for the overlap strategy.
    #[arg(long, default_value_t = OverlapParams::default().window_size)]
    window_size: usize,

    /// Words shared by consecutive windows for the overlap strategy.
    #[arg(long, default_value_t = OverlapParams::default().overlap)]
    overlap: usize,
}

impl StrategyArgs {
    fn resolve(&self) -> anyhow::Result<ChunkStrategy> {
        let params = OverlapParams {
            window_size: self.window_size,
            overlap: self.overlap,
        };
        Ok(ChunkStrategy::from_name(&self.strategy, params)?)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the chunks a document splits into, without embedding them.
    Chunk {
        /// PDF or DOCX file.
        #[arg(long)]
        file: PathBuf,

        #[command(flatten)]
        strategy: StrategyArgs,
    },
    /// Ingest documents, then print the chunk closest to each query.
    Search {
        /// PDF or DOCX file to ingest. Repeatable.
        #[arg(long)]
        file: Vec<PathBuf>,

        /// Folder scanned recursively for PDF and DOCX files.
        #[arg(long)]
        folder: Option<PathBuf>,

        #[command(flatten)]
        strategy: StrategyArgs,

        /// Query text. Repeatable; queries are read from stdin when omitted.
        #[arg(long)]
        query: Vec<String>,

        /// Number of chunks to print per query.
        #[arg(long, default_value = "1")]
        top_k: usize,

        /// Embedding service API key. Falls back to OPENAI_API_KEY from the environment or --env-file.
        #[arg(long)]
        api_key: Option<String>,

        /// Dotenv file consulted for variables missing from the environment.
        #[arg(long, default_value = ".env")]
        env_file: PathBuf,

        /// Embedding service base URL. Falls back to OPENAI_BASE_URL, then the OpenAI API.
        #[arg(long)]
        base_url: Option<String>,

        /// Timeout for each embedding request, in seconds.
        #[arg(long, default_value = "30")]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "doc-similarity boot"
    );

    match cli.command {
        Command::Chunk { file, strategy } => {
            let strategy = strategy.resolve()?;
            let chunks = tokio::task::spawn_blocking(move || {
                let document = Document::from_path(&file)?;
                let text = FileTextExtractor.extract(&document)?;
                Chunker::default().chunk(&text, &strategy)
            })
            .await
            .context("chunking task panicked")??;

            for (index, chunk) in chunks.iter().enumerate() {
                println!("[{index}] {chunk}");
            }
            println!("{} chunks ({strategy})", chunks.len());
        }
        Command::Search {
            file,
            folder,
            strategy,
            query,
            top_k,
            api_key,
            env_file,
            base_url,
            timeout_secs,
        } => {
            let strategy = strategy.resolve()?;

            let mut config = match api_key {
                Some(api_key) => EmbeddingConfig::new(api_key),
                None => EmbeddingConfig::from_env_file(&env_file).with_context(|| {
                    format!(
                        "set OPENAI_API_KEY in the environment or {}, or pass --api-key",
                        env_file.display()
                    )
                })?,
            };
            if let Some(base_url) = base_url {
                config = config.with_base_url(base_url);
            }
            let config = config.with_timeout(Duration::from_secs(timeout_secs));
            let embedder = Arc::new(OpenAiEmbedder::new(config)?);
            info!(model = embedder.model(), "embedding client ready");

            let index = CorpusIndex::new();
            let pipeline = IngestionPipeline::new(Arc::clone(&embedder), index.clone());
            let service = QueryService::new(embedder, index.clone());

            if let Some(folder) = folder {
                let report = pipeline.ingest_folder(&folder, strategy).await?;
                for skipped in &report.skipped_files {
                    warn!(
                        path = %skipped.path.display(),
                        reason = %skipped.reason,
                        "skipped document"
                    );
                }
                println!(
                    "{} chunks ingested from {} ({} skipped)",
                    report.chunks_added(),
                    folder.display(),
                    report.skipped_files.len()
                );
            }

            // One upload at a time: each task is awaited before the next starts.
            for path in file {
                let outcome = pipeline
                    .spawn_ingest(path.clone(), strategy)
                    .await
                    .context("ingestion task panicked")?;

                match outcome {
                    Ok(report) => println!(
                        "{} chunks ingested from {}",
                        report.chunks_added,
                        path.display()
                    ),
                    Err(error) => eprintln!("Error: {}: {error}", path.display()),
                }
            }

            info!(corpus_len = index.len().await, "corpus ready");

            if query.is_empty() {
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
                    answer(&service, &line, top_k).await;
                }
            } else {
                for text in &query {
                    answer(&service, text, top_k).await;
                }
            }
        }
    }

    Ok(())
}

async fn answer(service: &QueryService<OpenAiEmbedder>, text: &str, top_k: usize) {
    match service.query_top_k(text, top_k).await {
        Ok(hits) => {
            for hit in hits {
                println!("{hit}");
            }
        }
        Err(SearchError::EmptyQuery) => eprintln!("Warning: please enter a search query"),
        Err(error) => eprintln!("Search failed: {error}"),
    }
}
