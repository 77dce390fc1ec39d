//! dashsync: mirror Grafana dashboards into a GitLab repository.
//!
//! Every run exports all dashboards, compares them with the history file
//! stored in the repository, and commits the differences (new, changed,
//! moved and deleted dashboards plus the updated history) as one commit.
//!
//! # Usage
//!
//! ```bash
//! # Sync all dashboards
//! dashsync sync --grafana-api https://grafana.example.com --grafana-token $GF \
//!     --git-api https://gitlab.example.com --git-token $GL --git-pid 42
//!
//! # Show what would be committed
//! dashsync sync --dry-run
//!
//! # Show the history recorded in the repository
//! dashsync status
//! ```
//!
//! Settings not given on the command line are read from `config.toml`.

mod config;
mod gitlab;
mod grafana;
#[cfg(test)]
mod test_server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dashsync_core::{HistoryStore, SyncOptions, SyncReport, Synchronizer};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use config::{ConnectionArgs, FileConfig, DEFAULT_CONFIG_FILE};
use gitlab::GitlabClient;
use grafana::GrafanaClient;

/// Log filter when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "dashsync_cli=info,dashsync_core=info";
const DEBUG_LOG_FILTER: &str = "dashsync_cli=debug,dashsync_core=debug";

#[derive(Parser, Debug)]
#[command(name = "dashsync")]
#[command(author = "dashsync Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Mirror Grafana dashboards into a GitLab repository")]
struct Cli {
    /// Config file (TOML) [default: config.toml, optional]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export all dashboards and commit the changes
    Sync {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// Compute the changes without committing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Display the history recorded in the repository
    Status {
        #[command(flatten)]
        conn: ConnectionArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = if cli.debug {
        EnvFilter::new(DEBUG_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let file = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync { conn, dry_run } => cmd_sync(&conn, &file, dry_run).await,
        Commands::Status { conn } => cmd_status(&conn, &file).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<FileConfig> {
    let explicit = path.is_some();
    let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    let config = FileConfig::load(path, explicit)?;
    if config.is_some() {
        tracing::debug!("Loaded config from {}", path.display());
    }
    Ok(config.unwrap_or_default())
}

async fn cmd_sync(conn: &ConnectionArgs, file: &FileConfig, dry_run: bool) -> Result<()> {
    let grafana_settings = conn.resolve_grafana(file)?;
    let git_settings = conn.resolve_git(file)?;

    let grafana = GrafanaClient::from_settings(&grafana_settings)?;
    let gitlab = GitlabClient::from_settings(&git_settings)?;

    let options = SyncOptions {
        history_path: git_settings.history_file.clone(),
        message: git_settings.message.clone(),
        dry_run,
    };

    println!("Starting sync...");
    println!("  Grafana: {}", grafana_settings.api);
    println!(
        "  GitLab:  {} (project {}, branch {})",
        git_settings.api,
        git_settings.project_id,
        gitlab.branch()
    );

    let report = Synchronizer::new(&grafana, &gitlab, options)
        .run()
        .await
        .context("Sync failed")?;

    print!("{}", format_report(&report, dry_run));
    Ok(())
}

async fn cmd_status(conn: &ConnectionArgs, file: &FileConfig) -> Result<()> {
    let settings = conn.resolve_git(file)?;
    let gitlab = GitlabClient::from_settings(&settings)?;

    let history = HistoryStore::load(&gitlab, &settings.history_file)
        .await
        .with_context(|| format!("Failed to load {}", settings.history_file))?;

    println!("Project:  {}", settings.project_id);
    println!("Branch:   {}", settings.branch);
    println!("History:  {}", settings.history_file);

    if !history.existed() {
        println!("\nNo history found (first sync will create it).");
        return Ok(());
    }

    println!("\nTracked dashboards ({}):", history.len());
    for record in history.iter() {
        let short = record.fingerprint.get(..12).unwrap_or(&record.fingerprint);
        println!("  {:<24} {}  {}", record.id, short, record.path);
    }
    Ok(())
}

fn format_report(report: &SyncReport, dry_run: bool) -> String {
    let mut out = String::new();

    for skipped in &report.skipped {
        out.push_str(&format!(
            "  Skipped {:?} ({}): {}\n",
            skipped.title, skipped.uid, skipped.error
        ));
    }

    if report.up_to_date {
        out.push_str(&format!(
            "Already up to date ({} dashboards).\n",
            report.listed
        ));
        return out;
    }

    if dry_run {
        out.push_str("\nDry run, would commit:\n");
        if let Some(message) = &report.message {
            out.push_str(&format!("  Message:   {}\n", message));
        }
        for action in &report.actions {
            out.push_str(&format!("  {}\n", action));
        }
        return out;
    }

    out.push_str("\nSync completed:\n");
    out.push_str(&format!("  Dashboards: {}\n", report.listed));
    out.push_str(&format!("  Created:    {}\n", report.summary.created));
    out.push_str(&format!("  Updated:    {}\n", report.summary.updated));
    out.push_str(&format!("  Moved:      {}\n", report.summary.moved));
    out.push_str(&format!("  Deleted:    {}\n", report.summary.deleted));
    out.push_str(&format!("  Unchanged:  {}\n", report.unchanged));
    out.push_str(&format!("  Skipped:    {}\n", report.skipped.len()));
    out.push_str(&format!("  Time:       {}ms\n", report.duration_ms));
    out.push_str(&format!(
        "  Finished:   {}\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out
}
