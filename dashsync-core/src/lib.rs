//! dashsync Core Library
//!
//! Core functionality for mirroring monitoring dashboards into a
//! version-controlled repository:
//! - Content fingerprinting (SHA-256)
//! - History store (last-synced id/path/fingerprint per dashboard)
//! - Reconciler deriving create/update/move/delete actions
//! - Remote repository and dashboard source abstractions
//! - In-memory repository with all-or-nothing commits
//! - Synchronizer driving one complete run

pub mod action;
pub mod blob;
pub mod error;
pub mod fingerprint;
pub mod history;
pub mod memory;
pub mod reconcile;
pub mod remote;
pub mod sync;

pub use action::{Action, ActionKind, ChangeSummary};
pub use blob::{dashboard_path, Blob};
pub use error::{Result, SyncError};
pub use fingerprint::fingerprint;
pub use history::{HistoryRecord, HistoryStore, DEFAULT_HISTORY_FILE};
pub use memory::{CommitRecord, MemoryRepository};
pub use reconcile::{CommitBatch, Outcome, Reconciler};
pub use remote::{DashboardEntry, DashboardSource, RemoteRepository};
pub use sync::{SkippedDashboard, SyncOptions, SyncReport, Synchronizer, DEFAULT_COMMIT_MESSAGE};
