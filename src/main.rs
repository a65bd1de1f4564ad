use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mindgap::{
    api::{self, AppState},
    config, logging,
    processing::{DocumentKind, RetrievalEngine},
    progress::ProgressStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "mindgap",
    version,
    about = "Retrieval backend for the MindGap study assistant"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve {
        /// Port to bind; overrides SERVER_PORT.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Ingest documents into a fresh engine, then print the best matching chunks.
    Ask {
        query: String,
        /// Document to ingest; may be repeated.
        #[arg(long = "file")]
        files: Vec<PathBuf>,
        /// Directory whose supported documents are ingested recursively.
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Text file with OCR output prepended to every `--file` document.
        #[arg(long)]
        ocr_text: Option<PathBuf>,
        /// Number of chunks to print; defaults to SEARCH_TOP_K.
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    logging::init_tracing();
    config::init_config().context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(port).await,
        Command::Ask {
            query,
            files,
            dir,
            ocr_text,
            top_k,
        } => ask(&query, &files, dir.as_deref(), ocr_text.as_deref(), top_k).await,
    }
}

async fn serve(port: Option<u16>) -> Result<()> {
    let config = config::get_config();
    let engine = RetrievalEngine::from_config(config)
        .await
        .context("failed to initialize retrieval engine")?;
    let progress = ProgressStore::open(&config.progress_path)
        .with_context(|| format!("failed to open progress ledger at {}", config.progress_path))?;
    let app = api::create_router(AppState::new(Arc::new(engine), Arc::new(progress)));

    let (listener, port) = bind_listener(port.or(config.server_port))
        .await
        .context("failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn ask(
    query: &str,
    files: &[PathBuf],
    dir: Option<&Path>,
    ocr_text: Option<&Path>,
    top_k: Option<usize>,
) -> Result<()> {
    let config = config::get_config();
    let engine = RetrievalEngine::from_config(config)
        .await
        .context("failed to initialize retrieval engine")?;

    let precomputed = match ocr_text {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read OCR text at {}", path.display()))?,
        None => String::new(),
    };

    let mut ingested = 0usize;
    for file in files {
        ingested += engine
            .ingest(file, &precomputed)
            .await
            .with_context(|| format!("failed to ingest {}", file.display()))?;
    }
    if let Some(dir) = dir {
        for path in collect_documents(dir)? {
            ingested += engine
                .ingest(&path, "")
                .await
                .with_context(|| format!("failed to ingest {}", path.display()))?;
        }
    }
    if ingested == 0 {
        bail!("no chunks were indexed; pass --file or --dir with readable documents");
    }

    let top_k = top_k.unwrap_or(engine.default_top_k());
    let results = engine.search(query, top_k).await.context("search failed")?;
    for (rank, text) in results.iter().enumerate() {
        println!("[{}] {}", rank + 1, text);
    }
    Ok(())
}

/// Walk `dir` for files the extractor understands, sorted for stable ingestion order.
fn collect_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if DocumentKind::from_path(&path).is_some() {
            documents.push(path);
        } else {
            tracing::warn!(path = %path.display(), "Skipping unsupported document");
        }
    }
    documents.sort();
    Ok(documents)
}

async fn bind_listener(port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4100-4199",
    ))
}
