//! Snapshelf CLI: batch image uploads, semantic search and the gallery.
//!
//! Configuration comes from the environment (see `snapshelf_core::config`). The
//! signed-in user is passed with `--user` or `SNAPSHELF_USER`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use snapshelf_cli::{build_record_store, init_tracing, read_selection, require_user};
use snapshelf_core::{AppError, Config, ErrorMetadata, LogLevel};
use snapshelf_db::ImageRecordStore;
use snapshelf_index::IndexClient;
use snapshelf_storage::create_storage;
use snapshelf_upload::BatchOrchestrator;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "snapshelf", about = "Snapshelf image uploader")]
struct Cli {
    /// Id of the signed-in user
    #[arg(long, env = "SNAPSHELF_USER", global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a batch of images
    Upload {
        /// Paths of the files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Semantic search over uploaded images
    Search {
        /// Search text
        text: String,
        /// Maximum number of results
        #[arg(long)]
        k: Option<u32>,
    },
    /// List uploaded images, newest first
    Gallery,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Log a pipeline error at the level its kind calls for.
fn report(err: &AppError) {
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(code = err.error_code(), error = %err, "Request rejected"),
        LogLevel::Warn => tracing::warn!(code = err.error_code(), error = %err, "Request failed"),
        LogLevel::Error => tracing::error!(code = err.error_code(), error = %err, "Request failed"),
    }
}

async fn upload(config: &Config, user: Option<&str>, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    let (user, files) = read_selection(user, &paths).await?;

    let selection = config.file_validator().validate(files);
    if let Some(err) = selection.error() {
        let err = AppError::from(err);
        report(&err);
        eprintln!("{}", err);
    }
    if selection.accepted.is_empty() {
        return Ok(());
    }

    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage")?;
    let records = build_record_store(config).await?;
    let notifier = IndexClient::from_config(config).context("Failed to build index client")?;

    let orchestrator =
        BatchOrchestrator::new(storage, records.clone()).with_notifier(std::sync::Arc::new(notifier));
    let batch = orchestrator.prepare(Some(&user), selection.accepted)?;
    let gallery = records
        .subscribe(&user.uid)
        .await
        .map_err(AppError::from)?;

    let mut reporter = batch.reporter();
    eprint!("{}", reporter.current());
    let render = async {
        while let Some(progress) = reporter.changed().await {
            eprint!("{}", progress);
        }
    };
    let (outcome, _) = tokio::join!(orchestrator.run_batch(&batch), render);

    print_json(&outcome.urls)?;
    tracing::info!(images = gallery.current().len(), "Gallery updated");

    if let Some(notification) = outcome.notification {
        notification
            .await
            .context("Indexing notification task panicked")?;
    }

    let released = batch.dismiss()?;
    tracing::debug!(released, "Previews released");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Upload { files } => {
            upload(&config, cli.user.as_deref(), files).await?;
        }
        Commands::Search { text, k } => {
            let user = require_user(cli.user.as_deref())?;
            let client =
                IndexClient::from_config(&config).context("Failed to build index client")?;
            let hits = client
                .search(&user.uid, &text, k.unwrap_or_else(|| config.search_result_limit()))
                .await
                .map_err(AppError::from)
                .inspect_err(report)?;
            print_json(&hits)?;
        }
        Commands::Gallery => {
            let user = require_user(cli.user.as_deref())?;
            let records = build_record_store(&config).await?;
            let images = records
                .list(&user.uid)
                .await
                .map_err(AppError::from)
                .inspect_err(report)?;
            print_json(&images)?;
        }
    }

    Ok(())
}
