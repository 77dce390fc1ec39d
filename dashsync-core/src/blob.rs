//! Observed dashboard content

use bytes::Bytes;

use crate::fingerprint::fingerprint;

/// Folder name used when a dashboard lives in the root folder.
pub const GENERAL_FOLDER: &str = "General";

/// One dashboard as observed in the current run.
///
/// Only the `{id, path, fingerprint}` projection is ever persisted
/// (see [`crate::HistoryRecord`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Stable identifier, unchanged across renames
    pub id: String,
    /// Repository path of the exported file
    pub path: String,
    /// SHA-256 hex digest of `content`
    pub fingerprint: String,
    /// Exported dashboard bytes
    pub content: Bytes,
}

impl Blob {
    /// Create a blob, computing its fingerprint from `content`.
    pub fn new(id: impl Into<String>, path: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            path: path.into(),
            fingerprint: fingerprint(&content),
            content,
        }
    }

    /// Create a blob with a precomputed fingerprint.
    pub fn with_fingerprint(
        id: impl Into<String>,
        path: impl Into<String>,
        fingerprint: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            fingerprint: fingerprint.into(),
            content: content.into(),
        }
    }
}

/// Repository path for a dashboard: `/{folder}/{title}.json`.
///
/// Dashboards outside any folder are placed under [`GENERAL_FOLDER`].
pub fn dashboard_path(folder_title: &str, title: &str) -> String {
    let folder = if folder_title.is_empty() {
        GENERAL_FOLDER
    } else {
        folder_title
    };
    format!("/{}/{}.json", folder, title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_new_computes_fingerprint() {
        let blob = Blob::new("go1", "/Ops/CPU.json", b"{}".to_vec());
        assert_eq!(blob.fingerprint, fingerprint(b"{}"));
        assert_eq!(blob.content, Bytes::from_static(b"{}"));
    }

    #[test]
    fn test_dashboard_path() {
        assert_eq!(dashboard_path("Ops", "CPU"), "/Ops/CPU.json");
        assert_eq!(dashboard_path("", "Home"), "/General/Home.json");
    }
}
