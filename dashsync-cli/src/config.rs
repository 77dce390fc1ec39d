//! Configuration for the dashsync CLI.
//!
//! Settings come from two places: command-line arguments and an optional
//! TOML file. Command-line values win over file values.
//!
//! ```toml
//! [grafana]
//! api = "https://grafana.example.com"
//! token = "glsa_…"
//!
//! [git]
//! api = "https://gitlab.example.com"
//! token = "glpat-…"
//! pid = 42
//! branch = "main"
//! ```

use clap::Args;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use dashsync_core::{DEFAULT_COMMIT_MESSAGE, DEFAULT_HISTORY_FILE};

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Errors raised while assembling settings
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Missing required setting: {0} (pass it on the command line or in the config file)")]
    Missing(&'static str),
}

/// Contents of the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub grafana: GrafanaSection,
    #[serde(default)]
    pub git: GitSection,
}

/// `[grafana]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrafanaSection {
    pub api: Option<String>,
    pub token: Option<String>,
}

/// `[git]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitSection {
    pub api: Option<String>,
    pub token: Option<String>,
    pub pid: Option<u64>,
    pub branch: Option<String>,
    pub history_file: Option<String>,
    pub message: Option<String>,
}

impl FileConfig {
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the config file at `path`.
    ///
    /// A missing file is only an error when the path was given explicitly.
    pub fn load(path: &Path, explicit: bool) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound && !explicit => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        Self::parse(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })
    }
}

/// Connection settings accepted on the command line
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Grafana base URL
    #[arg(long, alias = "grafana.api")]
    pub grafana_api: Option<String>,

    /// Grafana API token
    #[arg(long, alias = "grafana.token")]
    pub grafana_token: Option<String>,

    /// GitLab base URL
    #[arg(long, alias = "git.api")]
    pub git_api: Option<String>,

    /// GitLab API token
    #[arg(long, alias = "git.token")]
    pub git_token: Option<String>,

    /// GitLab project ID
    #[arg(long, alias = "git.pid")]
    pub git_pid: Option<u64>,

    /// Target branch [default: main]
    #[arg(long, alias = "git.branch")]
    pub git_branch: Option<String>,

    /// Path of the history file in the repository [default: history.json]
    #[arg(long)]
    pub history_file: Option<String>,

    /// Commit message prefix
    #[arg(short, long)]
    pub message: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

impl Default for ConnectionArgs {
    fn default() -> Self {
        Self {
            grafana_api: None,
            grafana_token: None,
            git_api: None,
            git_token: None,
            git_pid: None,
            git_branch: None,
            history_file: None,
            message: None,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Resolved Grafana settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrafanaSettings {
    pub api: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

/// Resolved GitLab settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSettings {
    pub api: String,
    pub token: Option<String>,
    pub project_id: u64,
    pub branch: String,
    pub history_file: String,
    pub message: String,
    pub timeout: Duration,
}

/// Empty strings count as unset.
fn pick(arg: &Option<String>, file: &Option<String>) -> Option<String> {
    arg.iter()
        .chain(file.iter())
        .find(|v| !v.trim().is_empty())
        .cloned()
}

impl ConnectionArgs {
    pub fn resolve_grafana(&self, file: &FileConfig) -> Result<GrafanaSettings, ConfigError> {
        Ok(GrafanaSettings {
            api: pick(&self.grafana_api, &file.grafana.api)
                .ok_or(ConfigError::Missing("grafana-api"))?,
            token: pick(&self.grafana_token, &file.grafana.token),
            timeout: Duration::from_secs(self.timeout),
        })
    }

    pub fn resolve_git(&self, file: &FileConfig) -> Result<GitSettings, ConfigError> {
        let git = &file.git;
        Ok(GitSettings {
            api: pick(&self.git_api, &git.api).ok_or(ConfigError::Missing("git-api"))?,
            token: pick(&self.git_token, &git.token),
            project_id: self
                .git_pid
                .or(git.pid)
                .ok_or(ConfigError::Missing("git-pid"))?,
            branch: pick(&self.git_branch, &git.branch)
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            history_file: pick(&self.history_file, &git.history_file)
                .unwrap_or_else(|| DEFAULT_HISTORY_FILE.to_string()),
            message: pick(&self.message, &git.message)
                .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
            timeout: Duration::from_secs(self.timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[grafana]
api = "https://grafana.example.com"
token = "gf-token"

[git]
api = "https://gitlab.example.com"
token = "git-token"
pid = 42
branch = "backup"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = FileConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.grafana.api.as_deref(), Some("https://grafana.example.com"));
        assert_eq!(config.git.pid, Some(42));
        assert_eq!(config.git.branch.as_deref(), Some("backup"));
        assert!(config.git.history_file.is_none());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(FileConfig::parse("[git]\nproject = 1\n").is_err());
    }

    #[test]
    fn test_load_missing_default_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);

        assert!(FileConfig::load(&path, false).unwrap().is_none());
        assert!(matches!(
            FileConfig::load(&path, true),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_load_from_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("dashsync.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = FileConfig::load(&path, true).unwrap().unwrap();
        assert_eq!(config.git.token.as_deref(), Some("git-token"));

        std::fs::write(&path, "[git\n").unwrap();
        assert!(matches!(
            FileConfig::load(&path, true),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_args_override_file() {
        let file = FileConfig::parse(SAMPLE).unwrap();
        let args = ConnectionArgs {
            git_pid: Some(7),
            git_token: Some("cli-token".to_string()),
            grafana_api: Some(String::new()),
            timeout: 5,
            ..ConnectionArgs::default()
        };

        let git = args.resolve_git(&file).unwrap();
        assert_eq!(git.project_id, 7);
        assert_eq!(git.token.as_deref(), Some("cli-token"));
        assert_eq!(git.branch, "backup");
        assert_eq!(git.history_file, DEFAULT_HISTORY_FILE);
        assert_eq!(git.message, DEFAULT_COMMIT_MESSAGE);
        assert_eq!(git.timeout, Duration::from_secs(5));

        // An empty argument falls back to the file value.
        let grafana = args.resolve_grafana(&file).unwrap();
        assert_eq!(grafana.api, "https://grafana.example.com");
    }

    #[test]
    fn test_missing_required_settings() {
        let args = ConnectionArgs::default();
        let file = FileConfig::default();

        assert!(matches!(
            args.resolve_grafana(&file),
            Err(ConfigError::Missing("grafana-api"))
        ));
        assert!(matches!(
            args.resolve_git(&file),
            Err(ConfigError::Missing("git-api"))
        ));

        let args = ConnectionArgs {
            git_api: Some("https://gitlab.example.com".to_string()),
            ..ConnectionArgs::default()
        };
        assert!(matches!(
            args.resolve_git(&file),
            Err(ConfigError::Missing("git-pid"))
        ));
    }

    #[test]
    fn test_defaults() {
        let args = ConnectionArgs {
            git_api: Some("https://gitlab.example.com".to_string()),
            git_pid: Some(1),
            ..ConnectionArgs::default()
        };
        let git = args.resolve_git(&FileConfig::default()).unwrap();
        assert_eq!(git.branch, DEFAULT_BRANCH);
        assert!(git.token.is_none());
        assert_eq!(git.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
