//! Sync run driver.
//!
//! Wires a [`DashboardSource`] and a [`RemoteRepository`] together for one
//! run: load history, fetch every dashboard, reconcile, then commit the
//! resulting batch in a single atomic commit.

use std::time::Instant;
use tracing::{info, warn};

use crate::action::{Action, ChangeSummary};
use crate::error::Result;
use crate::history::{HistoryStore, DEFAULT_HISTORY_FILE};
use crate::reconcile::{Outcome, Reconciler};
use crate::remote::{DashboardSource, RemoteRepository};

/// Commit message used when none is configured.
pub const DEFAULT_COMMIT_MESSAGE: &str = "dashsync: backup done.";

/// Settings for one run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Path of the history file in the target repository
    pub history_path: String,
    /// Commit message prefix; a change summary is appended
    pub message: String,
    /// Compute actions without committing
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            history_path: DEFAULT_HISTORY_FILE.to_string(),
            message: DEFAULT_COMMIT_MESSAGE.to_string(),
            dry_run: false,
        }
    }
}

/// A dashboard that could not be fetched and was left out of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDashboard {
    pub uid: String,
    pub title: String,
    pub error: String,
}

/// Result of a sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Dashboards listed by the source
    pub listed: usize,
    /// Dashboards whose content did not change
    pub unchanged: usize,
    pub skipped: Vec<SkippedDashboard>,
    /// Counts of dashboard actions
    pub summary: ChangeSummary,
    /// Full batch, history write included (empty when up to date)
    pub actions: Vec<Action>,
    /// Commit message used (or that would have been used in a dry run)
    pub message: Option<String>,
    pub committed: bool,
    pub up_to_date: bool,
    pub duration_ms: u64,
}

/// Runs one synchronization from a dashboard source into a repository.
pub struct Synchronizer<'a, S: ?Sized, R: ?Sized> {
    source: &'a S,
    remote: &'a R,
    options: SyncOptions,
}

impl<'a, S, R> Synchronizer<'a, S, R>
where
    S: DashboardSource + ?Sized,
    R: RemoteRepository + ?Sized,
{
    pub fn new(source: &'a S, remote: &'a R, options: SyncOptions) -> Self {
        Self {
            source,
            remote,
            options,
        }
    }

    /// Perform the run.
    ///
    /// History load, listing and commit failures abort the run and are
    /// returned unchanged. Per-dashboard fetch failures are logged and the
    /// dashboard is skipped.
    pub async fn run(&self) -> Result<SyncReport> {
        let start_time = Instant::now();
        let mut report = SyncReport::default();

        let history = HistoryStore::load(self.remote, &self.options.history_path).await?;
        let entries = self.source.list().await?;
        report.listed = entries.len();
        info!("Found {} dashboards", entries.len());

        let mut reconciler = Reconciler::with_history_path(history, &self.options.history_path);

        for entry in &entries {
            let blob = match self.source.fetch(entry).await {
                Ok(blob) => blob,
                Err(e) => {
                    warn!(
                        "Skipping dashboard {:?} ({}): {}",
                        entry.title, entry.uid, e
                    );
                    report.skipped.push(SkippedDashboard {
                        uid: entry.uid.clone(),
                        title: entry.title.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if reconciler.add(blob) == Outcome::Unchanged {
                report.unchanged += 1;
            }
        }

        let Some(batch) = reconciler.finalize()? else {
            info!("Already up to date, nothing to commit");
            report.up_to_date = true;
            report.duration_ms = start_time.elapsed().as_millis() as u64;
            return Ok(report);
        };

        let message = format!("{} ({})", self.options.message, batch.summary);
        report.summary = batch.summary;

        if self.options.dry_run {
            info!("Dry run: {} actions not committed", batch.actions.len());
        } else {
            self.remote.commit(&message, &batch.actions).await?;
            report.committed = true;
            info!("Committed {} actions: {}", batch.actions.len(), batch.summary);
        }

        report.actions = batch.actions;
        report.message = Some(message);
        report.duration_ms = start_time.elapsed().as_millis() as u64;
        Ok(report)
    }
}
