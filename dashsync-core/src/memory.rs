//! In-memory repository implementation
//!
//! Holds a flat path → content map and applies commits all-or-nothing, the
//! same way the hosted commit endpoint does. Used by tests and anywhere a
//! throwaway target repository is needed.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::action::Action;
use crate::error::{Result, SyncError};
use crate::remote::RemoteRepository;

/// A commit applied to a [`MemoryRepository`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub message: String,
    pub actions: Vec<Action>,
}

/// In-memory repository
#[derive(Clone, Default)]
pub struct MemoryRepository {
    /// Path → content at the head of the branch
    files: Arc<RwLock<BTreeMap<String, Bytes>>>,

    /// Commits in application order
    commits: Arc<RwLock<Vec<CommitRecord>>>,

    /// When set, reads fail with this transport error
    read_failure: Arc<RwLock<Option<String>>>,

    /// When set, commits fail with this error
    commit_failure: Arc<RwLock<Option<String>>>,
}

impl MemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-populated with files
    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<Bytes>,
    {
        let files = files
            .into_iter()
            .map(|(path, content)| (path.into(), content.into()))
            .collect();
        Self {
            files: Arc::new(RwLock::new(files)),
            ..Self::default()
        }
    }

    /// Get file content at the head of the branch
    pub async fn file(&self, path: &str) -> Option<Bytes> {
        self.files.read().await.get(path).cloned()
    }

    /// Snapshot of all paths at the head of the branch
    pub async fn paths(&self) -> Vec<String> {
        self.files.read().await.keys().cloned().collect()
    }

    pub async fn commits(&self) -> Vec<CommitRecord> {
        self.commits.read().await.clone()
    }

    pub async fn commit_count(&self) -> usize {
        self.commits.read().await.len()
    }

    /// Make every subsequent read fail with a transport error
    pub async fn fail_reads(&self, message: &str) {
        *self.read_failure.write().await = Some(message.to_string());
    }

    /// Make every subsequent commit fail; `None` restores normal behavior
    pub async fn fail_commits(&self, message: Option<&str>) {
        *self.commit_failure.write().await = message.map(str::to_string);
    }
}

/// Apply `actions` to `files`, rejecting the first inconsistent one.
fn apply(files: &mut BTreeMap<String, Bytes>, actions: &[Action]) -> Result<()> {
    for action in actions {
        match action {
            Action::Create { path, content } => {
                if files.contains_key(path) {
                    return Err(SyncError::Rejected(format!(
                        "A file with this name already exists: {}",
                        path
                    )));
                }
                files.insert(path.clone(), content.clone());
            }
            Action::Update { path, content } => match files.get_mut(path) {
                Some(existing) => *existing = content.clone(),
                None => {
                    return Err(SyncError::Rejected(format!(
                        "A file with this name doesn't exist: {}",
                        path
                    )));
                }
            },
            Action::Move {
                from_path,
                to_path,
                content,
            } => {
                if files.contains_key(to_path) {
                    return Err(SyncError::Rejected(format!(
                        "A file with this name already exists: {}",
                        to_path
                    )));
                }
                if files.remove(from_path).is_none() {
                    return Err(SyncError::Rejected(format!(
                        "A file with this name doesn't exist: {}",
                        from_path
                    )));
                }
                files.insert(to_path.clone(), content.clone());
            }
            Action::Delete { path } => {
                if files.remove(path).is_none() {
                    return Err(SyncError::Rejected(format!(
                        "A file with this name doesn't exist: {}",
                        path
                    )));
                }
            }
        }
    }
    Ok(())
}

#[async_trait]
impl RemoteRepository for MemoryRepository {
    async fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        if let Some(message) = self.read_failure.read().await.as_ref() {
            return Err(SyncError::Transport(message.clone()));
        }
        Ok(self.files.read().await.get(path).map(|c| c.to_vec()))
    }

    async fn commit(&self, message: &str, actions: &[Action]) -> Result<()> {
        if let Some(failure) = self.commit_failure.read().await.as_ref() {
            return Err(SyncError::Commit(failure.clone()));
        }
        if actions.is_empty() {
            return Err(SyncError::Rejected("commit has no actions".to_string()));
        }

        let mut files = self.files.write().await;
        let mut staged = files.clone();
        apply(&mut staged, actions)?;
        *files = staged;

        self.commits.write().await.push(CommitRecord {
            message: message.to_string(),
            actions: actions.to_vec(),
        });
        Ok(())
    }
}
