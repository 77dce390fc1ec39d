//! History store for dashboard synchronization.
//!
//! Remembers, per dashboard id, the path and fingerprint that were last
//! committed to the target repository. The store lives in the repository
//! itself as a JSON object keyed by id:
//!
//! ```json
//! { "go1": { "uid": "go1", "path": "/Ops/CPU.json", "sha256": "…" } }
//! ```
//!
//! A missing file is not an error: it yields an empty store whose eventual
//! write-back is a `Create` instead of an `Update`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::action::Action;
use crate::blob::Blob;
use crate::error::{Result, SyncError};
use crate::remote::RemoteRepository;

/// Default location of the history file in the target repository.
pub const DEFAULT_HISTORY_FILE: &str = "history.json";

/// Last-synced state of one dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "uid")]
    pub id: String,
    pub path: String,
    #[serde(rename = "sha256")]
    pub fingerprint: String,
}

impl HistoryRecord {
    pub fn new(
        id: impl Into<String>,
        path: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            fingerprint: fingerprint.into(),
        }
    }

    /// Project a blob onto its persisted triple.
    pub fn from_blob(blob: &Blob) -> Self {
        Self::new(blob.id.clone(), blob.path.clone(), blob.fingerprint.clone())
    }
}

/// Mapping from dashboard id to its [`HistoryRecord`].
///
/// Records are kept ordered by id so serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStore {
    records: BTreeMap<String, HistoryRecord>,
    /// Whether the history file existed remotely when loaded.
    existed: bool,
}

impl HistoryStore {
    /// Create an empty store that does not exist remotely yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the history file from the remote repository.
    ///
    /// A missing file yields an empty store. Transport and decode failures
    /// are returned unchanged; the caller must abort the run.
    pub async fn load<R>(repo: &R, path: &str) -> Result<Self>
    where
        R: RemoteRepository + ?Sized,
    {
        match repo.read_file(path).await? {
            None => {
                info!("No history file at {}, starting with empty history", path);
                Ok(Self::new())
            }
            Some(data) => {
                let mut store = Self::deserialize(&data).map_err(|source| {
                    SyncError::HistoryDecode {
                        path: path.to_string(),
                        source,
                    }
                })?;
                store.existed = true;
                info!("Loaded {} history records from {}", store.len(), path);
                Ok(store)
            }
        }
    }

    /// Parse a serialized history file.
    ///
    /// The returned store is not marked as existing remotely; [`load`](Self::load)
    /// does that. A JSON `null` decodes to an empty store. Records whose
    /// `uid` disagrees with their key are re-keyed to the key.
    pub fn deserialize(data: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        let parsed: Option<BTreeMap<String, HistoryRecord>> = serde_json::from_slice(data)?;
        let mut records = parsed.unwrap_or_default();
        for (key, record) in records.iter_mut() {
            if record.id != *key {
                warn!(
                    "History record {} carries uid {:?}, using the key",
                    key, record.id
                );
                record.id = key.clone();
            }
        }
        Ok(Self {
            records,
            existed: false,
        })
    }

    /// Encode the full mapping as pretty-printed UTF-8 JSON, sorted by id.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.records).map_err(SyncError::HistoryEncode)
    }

    pub fn get(&self, id: &str) -> Option<&HistoryRecord> {
        self.records.get(id)
    }

    /// Insert or replace the record for `record.id`.
    pub fn set(&mut self, record: HistoryRecord) -> Option<HistoryRecord> {
        self.records.insert(record.id.clone(), record)
    }

    pub fn delete(&mut self, id: &str) -> Option<HistoryRecord> {
        self.records.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.values()
    }

    /// Whether the history file existed remotely at load time.
    pub fn existed(&self) -> bool {
        self.existed
    }

    /// Record that the history file now exists remotely.
    pub fn mark_existing(&mut self) {
        self.existed = true;
    }

    /// Build the action that writes this store to `path`.
    pub fn write_action(&self, path: &str) -> Result<Action> {
        let content = self.serialize()?.into();
        let path = path.to_string();
        Ok(if self.existed {
            Action::Update { path, content }
        } else {
            Action::Create { path, content }
        })
    }
}

impl FromIterator<HistoryRecord> for HistoryStore {
    fn from_iter<I: IntoIterator<Item = HistoryRecord>>(iter: I) -> Self {
        let mut store = Self::new();
        for record in iter {
            store.set(record);
        }
        store
    }
}
