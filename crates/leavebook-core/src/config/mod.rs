//! Client configuration.
//!
//! `ClientConfig` describes where the shared store lives, how its endpoints
//! are named, the sync timings, and where the local durable copy is kept.
//! Every field has a default so a partial file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::remote::{AnyRemote, HttpRemoteStore, LocalOnlyRemote, RemoteEndpoints};
use crate::sync::SyncSettings;
use crate::util::{is_http_url, normalize_text_option};

/// Environment variable overriding [`ClientConfig::remote_url`]
pub const REMOTE_URL_ENV: &str = "LEAVEBOOK_REMOTE_URL";

/// Environment variable overriding [`ClientConfig::db_path`]
pub const DB_PATH_ENV: &str = "LEAVEBOOK_DB_PATH";

const DEFAULT_PULL_TIMEOUT_SECS: u64 = 8;
const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 8;
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the shared store. `None` runs the client local-only.
    pub remote_url: Option<String>,
    pub records_path: String,
    pub tombstones_path: String,
    pub save_records_path: String,
    pub save_tombstones_path: String,
    pub pull_timeout_secs: u64,
    pub push_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    /// Local database file. Callers pick a platform default when unset.
    pub db_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            records_path: "data.json".to_string(),
            tombstones_path: "deleted_records.json".to_string(),
            save_records_path: "save_data".to_string(),
            save_tombstones_path: "save_deleted_records".to_string(),
            pull_timeout_secs: DEFAULT_PULL_TIMEOUT_SECS,
            push_timeout_secs: DEFAULT_PUSH_TIMEOUT_SECS,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            db_path: None,
        }
    }
}

impl ClientConfig {
    /// Parse a config document
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|error| Error::Config(format!("invalid config JSON: {error}")))
    }

    /// Load a config file, falling back to defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
            .map_err(|error| Error::Config(format!("{}: {error}", path.display())))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Apply environment overrides through `lookup`
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = normalize_text_option(lookup(REMOTE_URL_ENV)) {
            self.remote_url = Some(url);
        }
        if let Some(path) = normalize_text_option(lookup(DB_PATH_ENV)) {
            self.db_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Trim and check every field
    pub fn normalize(mut self) -> Result<Self> {
        self.remote_url = match normalize_text_option(self.remote_url.take()) {
            Some(url) if is_http_url(&url) => Some(url.trim_end_matches('/').to_string()),
            Some(url) => {
                return Err(Error::Config(format!(
                    "remote_url must include http:// or https://: {url}"
                )))
            }
            None => None,
        };

        for (field, value) in [
            ("records_path", &mut self.records_path),
            ("tombstones_path", &mut self.tombstones_path),
            ("save_records_path", &mut self.save_records_path),
            ("save_tombstones_path", &mut self.save_tombstones_path),
        ] {
            let trimmed = value.trim().trim_start_matches('/').to_string();
            if trimmed.is_empty() {
                return Err(Error::Config(format!("{field} must not be empty")));
            }
            *value = trimmed;
        }

        for (field, value) in [
            ("pull_timeout_secs", self.pull_timeout_secs),
            ("push_timeout_secs", self.push_timeout_secs),
            ("refresh_interval_secs", self.refresh_interval_secs),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{field} must be greater than zero")));
            }
        }

        Ok(self)
    }

    #[must_use]
    pub const fn is_remote_configured(&self) -> bool {
        self.remote_url.is_some()
    }

    /// Endpoint URLs, or `None` when running local-only
    pub fn remote_endpoints(&self) -> Result<Option<RemoteEndpoints>> {
        let Some(base_url) = self.remote_url.as_deref() else {
            return Ok(None);
        };

        RemoteEndpoints::with_paths(
            base_url,
            &self.records_path,
            &self.tombstones_path,
            &self.save_records_path,
            &self.save_tombstones_path,
        )
        .map(Some)
        .map_err(|error| Error::Config(error.to_string()))
    }

    /// Build the remote this config points at
    pub fn build_remote(&self) -> Result<AnyRemote> {
        match self.remote_endpoints()? {
            Some(endpoints) => {
                let settings = self.sync_settings();
                let remote =
                    HttpRemoteStore::new(endpoints, settings.pull_timeout, settings.push_timeout)?;
                Ok(AnyRemote::Http(remote))
            }
            None => {
                tracing::info!("Running in local-only mode (no remote configured)");
                Ok(AnyRemote::LocalOnly(LocalOnlyRemote))
            }
        }
    }

    #[must_use]
    pub const fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            pull_timeout: Duration::from_secs(self.pull_timeout_secs),
            push_timeout: Duration::from_secs(self.push_timeout_secs),
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
        }
    }
}
