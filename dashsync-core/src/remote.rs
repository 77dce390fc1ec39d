//! Boundaries to the outside world
//!
//! The reconciler itself never performs I/O. Everything that talks to the
//! monitoring system or to the target repository goes through these traits.

use async_trait::async_trait;

use crate::action::Action;
use crate::blob::{dashboard_path, Blob};
use crate::error::Result;

/// Target repository that stores exported dashboards and the history file
///
/// All implementations must apply a commit atomically: either every action
/// lands in one new version, or nothing changes.
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Read a file at the tracked ref.
    ///
    /// Returns `Ok(None)` if the file does not exist. Every other failure
    /// is an error.
    async fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Apply all actions as a single commit.
    async fn commit(&self, message: &str, actions: &[Action]) -> Result<()>;
}

/// A dashboard as listed by the monitoring system, before its content is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardEntry {
    pub uid: String,
    pub title: String,
    pub folder_title: String,
}

impl DashboardEntry {
    pub fn new(
        uid: impl Into<String>,
        title: impl Into<String>,
        folder_title: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            title: title.into(),
            folder_title: folder_title.into(),
        }
    }

    /// Repository path the dashboard is exported to.
    pub fn path(&self) -> String {
        dashboard_path(&self.folder_title, &self.title)
    }
}

/// Source of live dashboards
#[async_trait]
pub trait DashboardSource: Send + Sync {
    /// List all dashboards. A failure here aborts the run.
    async fn list(&self) -> Result<Vec<DashboardEntry>>;

    /// Fetch and export one dashboard. A failure skips only this dashboard.
    async fn fetch(&self, entry: &DashboardEntry) -> Result<Blob>;
}
