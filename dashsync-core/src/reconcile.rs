//! Reconciliation of observed dashboards against the history store.
//!
//! The [`Reconciler`] is fed one [`Blob`] at a time and decides, per blob,
//! whether the repository needs a create, update or move. Once every blob
//! has been added, [`Reconciler::finalize`] sweeps history records that were
//! not observed (deleted dashboards) and appends the history write-back.
//!
//! Decision table for a blob whose id is already in history:
//!
//! | path    | fingerprint | action    |
//! |---------|-------------|-----------|
//! | same    | same        | none      |
//! | changed | same        | none      |
//! | same    | changed     | `Update`  |
//! | changed | changed     | `Move`    |
//!
//! A rename without a content change is not propagated.
//!
//! Orphan deletions follow the dashboard actions. When a dashboard of this
//! run lands on an orphan's path, the file is freed before it is claimed:
//! a `Create` onto it becomes an `Update`, and a `Move` onto it is preceded
//! by the `Delete`.

use std::collections::HashSet;
use tracing::debug;

use crate::action::{Action, ActionKind, ChangeSummary};
use crate::blob::Blob;
use crate::error::Result;
use crate::history::{HistoryRecord, HistoryStore, DEFAULT_HISTORY_FILE};

/// What [`Reconciler::add`] decided for a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Moved,
    Unchanged,
}

/// The actions of one run, ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitBatch {
    /// Dashboard actions followed by the history write
    pub actions: Vec<Action>,
    /// Counts of dashboard actions
    pub summary: ChangeSummary,
}

/// Computes repository actions for one sync run.
///
/// One instance per run; it owns the in-memory history for the duration.
pub struct Reconciler {
    history: HistoryStore,
    history_path: String,
    /// Ids reconciled in this run
    touched: HashSet<String>,
    actions: Vec<Action>,
    summary: ChangeSummary,
}

impl Reconciler {
    /// Create a reconciler writing history back to [`DEFAULT_HISTORY_FILE`].
    pub fn new(history: HistoryStore) -> Self {
        Self::with_history_path(history, DEFAULT_HISTORY_FILE)
    }

    pub fn with_history_path(history: HistoryStore, history_path: impl Into<String>) -> Self {
        Self {
            history,
            history_path: history_path.into(),
            touched: HashSet::new(),
            actions: Vec::new(),
            summary: ChangeSummary::default(),
        }
    }

    /// Reconcile one observed blob.
    pub fn add(&mut self, blob: Blob) -> Outcome {
        if !self.touched.insert(blob.id.clone()) {
            debug!("Dashboard {} observed more than once, last one wins", blob.id);
        }

        let Some(hf) = self.history.get(&blob.id) else {
            self.history.set(HistoryRecord::from_blob(&blob));
            self.push(Action::Create {
                path: blob.path,
                content: blob.content,
            });
            return Outcome::Created;
        };

        if hf.fingerprint == blob.fingerprint {
            return Outcome::Unchanged;
        }

        let (action, outcome) = if hf.path != blob.path {
            (
                Action::Move {
                    from_path: hf.path.clone(),
                    to_path: blob.path.clone(),
                    content: blob.content.clone(),
                },
                Outcome::Moved,
            )
        } else {
            (
                Action::Update {
                    path: blob.path.clone(),
                    content: blob.content.clone(),
                },
                Outcome::Updated,
            )
        };

        self.history.set(HistoryRecord::from_blob(&blob));
        self.push(action);
        outcome
    }

    /// Sweep orphans and append the history write-back.
    ///
    /// Returns `Ok(None)` when there is nothing to commit; in that case the
    /// history file is left alone as well. Pending actions are drained, so
    /// a second call without further `add`s also returns `Ok(None)`.
    pub fn finalize(&mut self) -> Result<Option<CommitBatch>> {
        let orphans: Vec<String> = self
            .history
            .iter()
            .filter(|record| !self.touched.contains(&record.id))
            .map(|record| record.id.clone())
            .collect();

        for id in orphans {
            if let Some(record) = self.history.delete(&id) {
                self.sweep(record.path);
            }
        }

        if self.actions.is_empty() {
            debug!("Nothing to commit");
            return Ok(None);
        }

        let write = self.history.write_action(&self.history_path)?;
        debug!("{}", write);

        let mut actions = std::mem::take(&mut self.actions);
        actions.push(write);

        Ok(Some(CommitBatch {
            actions,
            summary: std::mem::take(&mut self.summary),
        }))
    }

    /// Actions accumulated so far, in the order they were produced.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn into_history(self) -> HistoryStore {
        self.history
    }

    /// Delete the file of an orphaned record.
    ///
    /// The repository rejects a create or move onto an occupied path, so
    /// a path already claimed in this run is handed over instead of being
    /// deleted after the claim.
    fn sweep(&mut self, path: String) {
        let claimed = self
            .actions
            .iter()
            .position(|a| a.kind() != ActionKind::Delete && a.path() == path);

        let Some(index) = claimed else {
            self.push(Action::Delete { path });
            return;
        };

        match &self.actions[index] {
            Action::Create { content, .. } => {
                debug!("{} replaces an orphaned file, updating instead", path);
                let content = content.clone();
                self.actions[index] = Action::Update { path, content };
                self.summary.created -= 1;
                self.summary.record(ActionKind::Update);
            }
            Action::Move { .. } => {
                let delete = Action::Delete { path };
                debug!("{}", delete);
                self.summary.record(ActionKind::Delete);
                self.actions.insert(index, delete);
            }
            _ => debug!("{} is rewritten in this run, not deleting", path),
        }
    }

    fn push(&mut self, action: Action) {
        debug!("{}", action);
        self.summary.record(action.kind());
        self.actions.push(action);
    }
}

impl CommitBatch {
    /// Number of actions of the given kind, history write included.
    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind() == kind).count()
    }
}
