//! # corpusqa CLI (`cqa`)
//!
//! Thin calling layer over the answer pipeline. All commands accept a
//! `--config` flag pointing to a TOML configuration file; the provider
//! credential is read from `OPENAI_API_KEY` (without it, the pipeline runs
//! on its deterministic offline paths).
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cqa init` | Create the schema (idempotent) |
//! | `cqa ingest <paths...>` | Ingest PDF files or directories of PDFs |
//! | `cqa ask "<question>"` | Ask a question, print preview + answer id |
//! | `cqa answer <id>` | Print the full cached answer text |

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use corpusqa::app::AppContext;
use corpusqa::config;
use corpusqa::error::QaError;
use corpusqa::models::IngestEntry;
use corpusqa::{db, ingest, migrate, qa};

#[derive(Parser)]
#[command(
    name = "cqa",
    about = "corpusqa: retrieval-augmented question answering over private PDF document sets",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the pgvector extension, the documents/chunks/answers tables,
    /// and the similarity index. Idempotent, safe to run repeatedly.
    Init,

    /// Ingest PDF files into the corpus.
    ///
    /// Accepts file paths and directories; directories are walked for
    /// `*.pdf` files. Each document is chunked, embedded, and persisted
    /// atomically.
    Ingest {
        /// PDF files or directories containing them.
        paths: Vec<PathBuf>,
    },

    /// Ask a question against the ingested corpus.
    Ask {
        question: String,

        /// Number of chunks to retrieve.
        #[arg(long)]
        top_k: Option<i64>,
    },

    /// Print the full cached answer for an id returned by `ask`.
    Answer { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corpusqa=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&config).await?;
            migrate::run_migrations(&pool, config.embedding.dims).await?;
            pool.close().await;
            println!("database initialized");
        }

        Commands::Ingest { paths } => {
            if paths.is_empty() {
                anyhow::bail!("provide at least one PDF file or directory");
            }
            let entries = collect_entries(&paths)?;

            let ctx = AppContext::init(config).await?;
            let summaries = ingest::ingest_batch(&ctx, &entries).await?;
            ctx.close().await;

            println!("ingested {} document(s)", summaries.len());
            for s in &summaries {
                let pages = s
                    .pages
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!("  {}: {} pages, {} chunks", s.title, pages, s.chunks);
            }
        }

        Commands::Ask { question, top_k } => {
            let ctx = AppContext::init(config).await?;
            let response = qa::ask(&ctx, &question, top_k).await?;
            ctx.close().await;

            println!("{}", response.answer_preview);
            println!();
            println!("answer id: {}", response.answer_id);
            if response.is_truncated {
                println!(
                    "(truncated; run `cqa answer {}` for the full text)",
                    response.answer_id
                );
            }
        }

        Commands::Answer { id } => {
            let ctx = AppContext::init(config).await?;
            let result = qa::get_answer(&ctx, &id).await;
            ctx.close().await;

            match result {
                Ok(text) => println!("{}", text),
                Err(QaError::AnswerNotFound) => {
                    eprintln!("Error: answer expired or not found");
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

/// Expand files and directories into ingestion entries. Directories are
/// walked recursively for `*.pdf`; explicit file paths are passed through
/// and filtered by the orchestrator's eligibility check.
fn collect_entries(paths: &[PathBuf]) -> Result<Vec<IngestEntry>> {
    let mut entries = Vec::new();

    for path in paths {
        if path.is_dir() {
            for item in walkdir::WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if item
                    .path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
                {
                    entries.push(read_entry(item.path())?);
                }
            }
        } else {
            entries.push(read_entry(path)?);
        }
    }

    Ok(entries)
}

fn read_entry(path: &Path) -> Result<IngestEntry> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(IngestEntry { name, bytes })
}
