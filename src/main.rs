//! # RFI Assistant CLI (`rfia`)
//!
//! ## Usage
//!
//! ```bash
//! rfia --config ./config/rfia.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rfia serve` | Start the HTTP server (requires `MISTRAL_API_KEY`) |
//! | `rfia extract <file.pdf>` | Dry-run extraction: page/char/chunk counts, no LLM calls |
//!
//! The config file is optional; built-in defaults apply when it is absent,
//! and `PORT`, `RATE_LIMIT_WINDOW_MS`, and `RATE_LIMIT_MAX_REQUESTS` in the
//! environment override it.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use rfi_assistant::chunk::chunk_document;
use rfi_assistant::config;
use rfi_assistant::extract;
use rfi_assistant::mistral::MistralClient;
use rfi_assistant::server;

#[derive(Parser)]
#[command(
    name = "rfia",
    about = "RFI Assistant — document question answering for RFI PDFs",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./config/rfia.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` (or `PORT`). Aborts at startup when
    /// `MISTRAL_API_KEY` is not set.
    Serve,

    /// Extract a local PDF and report page, character, and chunk counts
    /// without calling the LLM. Useful for checking a document before
    /// uploading it.
    Extract {
        /// Path to a PDF file.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            let api_key = std::env::var("MISTRAL_API_KEY")
                .context("MISTRAL_API_KEY environment variable not set")?;
            let llm = Arc::new(MistralClient::new(&cfg.mistral, api_key)?);
            server::run_server(cfg, llm).await?;
        }
        Commands::Extract { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read file: {}", file.display()))?;
            let pages = extract::extract_pages(&bytes, extract::MIME_PDF)?;
            let text = extract::join_pages(&pages);
            let chunks = chunk_document(
                &pages,
                cfg.chunking.max_chars,
                cfg.chunking.overlap_chars,
            );

            println!("extract {} (dry-run)", file.display());
            println!("  pages: {}", pages.len());
            println!("  characters: {}", text.chars().count());
            println!("  chunks: {}", chunks.len());
        }
    }

    Ok(())
}
