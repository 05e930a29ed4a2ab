//! songbook-import - Spreadsheet pitch import
//!
//! Reads singer/song/pitch rows, reconciles them against the songbook
//! catalog and commits the pitch records.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use songbook_common::config::{default_config_path, TomlConfig};
use songbook_import::client::{MemoryStore, RestClient, SongbookStore};
use songbook_import::config::{init_config_file, load_config, resolve_api_token, resolve_api_url};
use songbook_import::models::{ImportSummary, PreviewItem};
use songbook_import::services::parse_import_text;
use songbook_import::ReconciliationSession;

/// Command-line arguments for songbook-import
#[derive(Parser, Debug)]
#[command(name = "songbook-import")]
#[command(about = "Reconcile and import singer pitches from a spreadsheet export")]
#[command(version)]
struct Args {
    /// Songbook API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// TOML config file (defaults to <config dir>/songbook/import.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Work against an in-memory catalog instead of the API
    #[arg(long, global = true)]
    offline: bool,

    /// TOML file with [[songs]] and [[singers]] for --offline
    #[arg(long, global = true, requires = "offline")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the sorted preview with status counts
    Preview {
        file: PathBuf,

        /// Print preview items as JSON
        #[arg(long)]
        json: bool,
    },

    /// Preview, then auto-match every row still needing a song
    AutoMatch { file: PathBuf },

    /// Preview and commit every ready row
    Commit {
        file: PathBuf,

        /// Run auto-match before committing
        #[arg(long)]
        auto_match: bool,
    },

    /// Write unresolved rows as CSV
    ExportUnmatched {
        file: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a config file with the resolved API URL (to --config or the default path)
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Command {
    fn file(&self) -> Option<&Path> {
        match self {
            Command::Preview { file, .. }
            | Command::AutoMatch { file }
            | Command::Commit { file, .. }
            | Command::ExportUnmatched { file, .. } => Some(file),
            Command::InitConfig { .. } => None,
        }
    }
}

fn init_config(args: &Args, force: bool) -> Result<()> {
    let path = args
        .config
        .clone()
        .or_else(default_config_path)
        .context("No config directory available, pass --config")?;
    let config = init_config_file(&path, args.api_url.as_deref(), force)
        .with_context(|| format!("Failed to write config {}", path.display()))?;
    println!(
        "Wrote {} (api_url = {})",
        path.display(),
        config.api_url.as_deref().unwrap_or_default()
    );
    Ok(())
}

fn build_store(args: &Args, config: &TomlConfig) -> Result<Arc<dyn SongbookStore>> {
    if args.offline {
        let store = match &args.catalog {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read catalog {}", path.display()))?;
                MemoryStore::from_toml_str(&content).context("Invalid catalog file")?
            }
            None => MemoryStore::new(),
        };
        info!("Running offline against in-memory catalog");
        return Ok(Arc::new(store));
    }

    let api_url = resolve_api_url(args.api_url.as_deref(), config);
    let client = RestClient::new(
        &api_url,
        resolve_api_token(config),
        Duration::from_secs(config.request_timeout_secs()),
    )
    .context("Failed to create API client")?;
    Ok(Arc::new(client))
}

fn print_preview(session: &ReconciliationSession) {
    for item in session.items() {
        println!("{}", preview_line(item));
    }

    let counts = session.status_counts();
    println!();
    println!(
        "{} rows: {} ready, {} need a song, {} need a pitch, {} dropped",
        counts.total(),
        counts.ready,
        counts.needs_song,
        counts.needs_pitch,
        counts.dropped
    );
}

fn preview_line(item: &PreviewItem) -> String {
    let matched = match (&item.song_name, item.song_similarity) {
        (Some(name), Some(score)) if score < 100 => format!(" -> {name} ({score}%)"),
        (Some(name), _) => format!(" -> {name}"),
        (None, _) => String::new(),
    };
    let singer = if item.singer_exists {
        item.row.singer_name.clone()
    } else {
        format!("{} (new)", item.row.singer_name)
    };
    let mut line = format!(
        "{:<12} {} | {} | {}{}",
        item.status.as_str(),
        item.row.song_name,
        singer,
        item.display_pitch(),
        matched
    );
    if let Some(message) = &item.error_message {
        line.push_str(&format!("  [{message}]"));
    }
    line
}

fn print_summary(summary: &ImportSummary) {
    println!(
        "Import complete in {} ms: {} singers created, {} pitches created, {} updated, {} unchanged, {} failed",
        summary.duration_ms,
        summary.singers_created,
        summary.pitches_created,
        summary.pitches_updated,
        summary.pitches_unchanged,
        summary.failed()
    );
    for failure in &summary.failures {
        println!(
            "  FAILED {} / {}: {}",
            failure.singer_name, failure.song_name, failure.message
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let loaded = load_config(args.config.as_deref()).context("Failed to load config")?;
    let config = &loaded.config;

    // Initialize tracing
    let default_filter = format!("songbook_import={}", config.logging.level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting songbook-import {}", env!("CARGO_PKG_VERSION"));
    loaded.log_source();

    if let Command::InitConfig { force } = &args.command {
        return init_config(&args, *force);
    }

    let input = args.command.file().context("No import file given")?;
    let text = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let parsed = parse_import_text(&text).context("Failed to parse import text")?;
    info!(
        rows = parsed.rows.len(),
        skipped = parsed.skipped_lines,
        "Parsed import text"
    );

    let store = build_store(&args, config)?;
    let mut session = ReconciliationSession::start(store, parsed.rows)
        .await
        .context("Import aborted")?;

    match &args.command {
        Command::Preview { json, .. } => {
            if *json {
                let rendered = serde_json::to_string_pretty(session.items())
                    .context("Failed to serialize preview")?;
                println!("{rendered}");
            } else {
                print_preview(&session);
            }
        }
        Command::AutoMatch { .. } => {
            let outcome = session.auto_match_all();
            print_preview(&session);
            println!(
                "Auto-match: {} of {} rows matched",
                outcome.matched, outcome.examined
            );
        }
        Command::Commit { auto_match, .. } => {
            if *auto_match {
                let outcome = session.auto_match_all();
                info!(matched = outcome.matched, "Auto-match before commit");
            }
            let summary = session.commit().await;
            print_summary(&summary);
        }
        Command::ExportUnmatched { output, .. } => {
            let csv = session
                .export_unmatched()
                .context("Failed to render unmatched rows")?;
            match output {
                Some(path) => {
                    tokio::fs::write(path, csv)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "Wrote unmatched rows");
                }
                None => print!("{csv}"),
            }
        }
        Command::InitConfig { .. } => {}
    }

    Ok(())
}
