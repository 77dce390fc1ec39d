//! HTTP client for the Grafana dashboard API.
//!
//! - `GET /api/search?type=dash-db&limit={n}&page={p}` lists dashboards,
//!   one page at a time until a short page comes back
//! - `GET /api/dashboards/uid/{uid}` fetches one dashboard
//!
//! The fetched document is re-encoded with tab indentation so the exported
//! file (and therefore its fingerprint) is stable between runs.

use anyhow::Context;
use async_trait::async_trait;
use dashsync_core::{Blob, DashboardEntry, DashboardSource, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GrafanaSettings;

/// Hits requested per search page
const SEARCH_PAGE_SIZE: usize = 1000;

/// One hit of `/api/search`
#[derive(Debug, Deserialize)]
struct SearchHit {
    uid: String,
    title: String,
    /// Absent for dashboards in the General folder
    #[serde(rename = "folderTitle", default)]
    folder_title: String,
}

/// Grafana API client
pub struct GrafanaClient {
    base_url: String,
    token: Option<String>,
    page_size: usize,
    http: reqwest::Client,
}

impl GrafanaClient {
    /// Create a new client targeting `base_url` (e.g. `https://grafana.example.com`).
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            page_size: SEARCH_PAGE_SIZE,
            http,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn from_settings(settings: &GrafanaSettings) -> anyhow::Result<Self> {
        Self::new(&settings.api, settings.token.clone(), settings.timeout)
    }

    async fn get(&self, path: &str) -> dashsync_core::Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.get(&url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| SyncError::Transport(format!("GET {}: {}", url, e)))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Source(format!(
                "GET {} failed ({}): {}",
                path, status, body
            )));
        }
        Ok(resp)
    }

    /// GET /api/search?type=dash-db, following pages until a short one.
    ///
    /// Any failed page fails the whole listing.
    pub async fn search(&self) -> dashsync_core::Result<Vec<DashboardEntry>> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for page in 1.. {
            let hits: Vec<SearchHit> = self
                .get(&format!(
                    "/api/search?type=dash-db&limit={}&page={}",
                    self.page_size, page
                ))
                .await?
                .json()
                .await
                .map_err(|e| {
                    SyncError::Source(format!("Failed to parse search page {}: {}", page, e))
                })?;
            debug!("Search page {}: {} dashboards", page, hits.len());

            let last = hits.len() < self.page_size;
            let before = entries.len();
            for hit in hits {
                if seen.insert(hit.uid.clone()) {
                    entries.push(DashboardEntry::new(hit.uid, hit.title, hit.folder_title));
                }
            }

            if last {
                break;
            }
            if entries.len() == before {
                // A server ignoring `page` repeats the first page forever.
                warn!("Search page {} returned no new dashboards, stopping", page);
                break;
            }
        }
        Ok(entries)
    }

    /// GET /api/dashboards/uid/{uid}
    pub async fn dashboard(&self, uid: &str) -> dashsync_core::Result<serde_json::Value> {
        self.get(&format!("/api/dashboards/uid/{}", uid))
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Source(format!("Failed to parse dashboard {}: {}", uid, e)))
    }
}

/// Encode a dashboard document the way it is stored in the repository.
pub fn export(document: &serde_json::Value) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    document.serialize(&mut ser)?;
    Ok(out)
}

#[async_trait]
impl DashboardSource for GrafanaClient {
    async fn list(&self) -> dashsync_core::Result<Vec<DashboardEntry>> {
        self.search().await
    }

    async fn fetch(&self, entry: &DashboardEntry) -> dashsync_core::Result<Blob> {
        let document = self.dashboard(&entry.uid).await?;
        let content = export(&document).map_err(|e| {
            SyncError::Source(format!("Failed to encode dashboard {}: {}", entry.uid, e))
        })?;
        Ok(Blob::new(entry.uid.clone(), entry.path(), content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::TestServer;
    use dashsync_core::fingerprint;
    use serde_json::json;

    const SEARCH: &str = r#"[
        {"id":1,"uid":"go1","title":"CPU","type":"dash-db","folderTitle":"Ops"},
        {"id":2,"uid":"go2","title":"Home","type":"dash-db"}
    ]"#;

    const DASHBOARD: &str =
        r#"{"dashboard":{"uid":"go1","title":"CPU","panels":[]},"meta":{"folderTitle":"Ops"}}"#;

    async fn grafana() -> TestServer {
        TestServer::start(|req| match req.uri.as_str() {
            "/api/search?type=dash-db&limit=1000&page=1" => (200, SEARCH.to_string()),
            "/api/dashboards/uid/go1" => (200, DASHBOARD.to_string()),
            _ => (404, r#"{"message":"Dashboard not found"}"#.to_string()),
        })
        .await
    }

    fn hits(uids: &[&str]) -> String {
        let hits: Vec<serde_json::Value> = uids
            .iter()
            .map(|uid| json!({"uid": uid, "title": uid.to_uppercase(), "folderTitle": "Ops"}))
            .collect();
        serde_json::Value::Array(hits).to_string()
    }

    fn client(server: &TestServer) -> GrafanaClient {
        GrafanaClient::new(
            &format!("{}/", server.url()),
            Some("gf-token".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_export_uses_tabs_and_keeps_key_order() {
        let doc: serde_json::Value = serde_json::from_str(r#"{"z":1,"a":{"b":[true]}}"#).unwrap();
        let out = String::from_utf8(export(&doc).unwrap()).unwrap();
        assert_eq!(out, "{\n\t\"z\": 1,\n\t\"a\": {\n\t\t\"b\": [\n\t\t\ttrue\n\t\t]\n\t}\n}");
    }

    #[tokio::test]
    async fn test_list_dashboards() {
        let server = grafana().await;

        let entries = client(&server).list().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], DashboardEntry::new("go1", "CPU", "Ops"));
        assert_eq!(entries[1].path(), "/General/Home.json");

        let requests = server.requests();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].header("authorization"), Some("Bearer gf-token"));
    }

    #[tokio::test]
    async fn test_list_follows_pages() {
        let server = TestServer::start(|req| match req.uri.as_str() {
            "/api/search?type=dash-db&limit=2&page=1" => (200, hits(&["a", "b"])),
            "/api/search?type=dash-db&limit=2&page=2" => (200, hits(&["c"])),
            _ => (404, String::new()),
        })
        .await;

        let entries = client(&server).with_page_size(2).list().await.unwrap();

        let uids: Vec<&str> = entries.iter().map(|e| e.uid.as_str()).collect();
        assert_eq!(uids, vec!["a", "b", "c"]);
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_list_full_last_page_ends_on_empty_page() {
        let server = TestServer::start(|req| match req.uri.as_str() {
            "/api/search?type=dash-db&limit=2&page=1" => (200, hits(&["a", "b"])),
            "/api/search?type=dash-db&limit=2&page=2" => (200, "[]".to_string()),
            _ => (404, String::new()),
        })
        .await;

        let entries = client(&server).with_page_size(2).list().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_list_stops_when_paging_is_ignored() {
        let server = TestServer::start(|_| (200, hits(&["a", "b"]))).await;

        let entries = client(&server).with_page_size(2).list().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_list_fails_when_a_later_page_fails() {
        let server = TestServer::start(|req| match req.uri.as_str() {
            "/api/search?type=dash-db&limit=2&page=1" => (200, hits(&["a", "b"])),
            _ => (500, "boom".to_string()),
        })
        .await;

        let err = client(&server).with_page_size(2).list().await.unwrap_err();

        assert!(matches!(err, SyncError::Source(ref m) if m.contains("500")));
    }

    #[tokio::test]
    async fn test_fetch_dashboard() {
        let server = grafana().await;
        let entry = DashboardEntry::new("go1", "CPU", "Ops");

        let blob = client(&server).fetch(&entry).await.unwrap();

        let expected = export(&serde_json::from_str(DASHBOARD).unwrap()).unwrap();
        assert_eq!(blob.id, "go1");
        assert_eq!(blob.path, "/Ops/CPU.json");
        assert_eq!(blob.content.as_ref(), expected.as_slice());
        assert_eq!(blob.fingerprint, fingerprint(&expected));

        let value: serde_json::Value = serde_json::from_slice(&blob.content).unwrap();
        assert_eq!(value["dashboard"], json!({"uid":"go1","title":"CPU","panels":[]}));
    }

    #[tokio::test]
    async fn test_fetch_missing_dashboard() {
        let server = grafana().await;
        let entry = DashboardEntry::new("gone", "Old", "Ops");

        let err = client(&server).fetch(&entry).await.unwrap_err();

        assert!(matches!(err, SyncError::Source(ref m) if m.contains("404")));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Nothing listens on port 1.
        let client = GrafanaClient::new("http://127.0.0.1:1", None, Duration::from_secs(5)).unwrap();
        let err = client.list().await.unwrap_err();

        assert!(matches!(err, SyncError::Transport(_)));
    }
}
