//! Tabula offline console.
//!
//! Edits boards in an archive file through the mutator, with undo/redo.
//!
//! Usage:
//!   # Ephemeral session
//!   cargo run -p tabula-cli
//!
//!   # Edit an archive file (created on first save)
//!   cargo run -p tabula-cli -- --archive boards.jsonl
//!
//!   # Custom history depth etc.
//!   cargo run -p tabula-cli -- --archive boards.jsonl --config tabula.ron

mod command;
mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tabula_client::MemoryStore;
use tabula_core::CoreConfig;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::console::{Console, Outcome};

/// Offline console for Tabula boards.
#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(about = "Edit Tabula boards from the terminal, with undo/redo")]
struct Args {
    /// Archive file (JSONL) to load and save
    #[arg(short, long)]
    archive: Option<PathBuf>,

    /// RON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Don't write the archive on exit
    #[arg(long)]
    no_save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout is the console
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CoreConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CoreConfig::default(),
    };

    let store = match &args.archive {
        Some(path) => {
            MemoryStore::open(path).with_context(|| format!("opening {}", path.display()))?
        }
        None => MemoryStore::new(),
    };
    let store = Arc::new(store);
    tracing::info!(blocks = store.len(), archive = ?args.archive, "console starting");

    let console = Console::new(store.clone(), config);
    run(&console).await?;
    tracing::info!(depth = console.mutator().history().state().depth, "console exiting");

    if args.archive.is_some() && !args.no_save {
        store.save()?;
    }
    Ok(())
}

async fn run(console: &Console) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"tabula> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match console.run_line(&line).await {
            Ok(Outcome::Continue(out)) => {
                if !out.is_empty() {
                    stdout.write_all(out.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                }
            }
            Ok(Outcome::Quit) => break,
            Err(e) => {
                tracing::debug!(error = ?e, "command failed");
                stdout.write_all(format!("error: {e:#}\n").as_bytes()).await?;
            }
        }
    }
    Ok(())
}
