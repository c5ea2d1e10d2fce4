//! Persisted target record.
//!
//! The record is a small JSON file:
//! ```json
//! { "vps_url": "https://bot.example.com", "updated_at": "2026-01-01T00:00:00Z" }
//! ```
//! Writers are serialized by a mutex and publish through write-to-temp + rename,
//! so a concurrent reader sees either the previous record or the new one.
//! Readers take no lock.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::validation::check_target_url;
use crate::target::TargetError;

/// On-disk shape of the target record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    #[serde(rename = "vps_url", alias = "url")]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Guarded access to the persisted target record.
#[derive(Debug)]
pub struct TargetStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TargetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record, returning `None` when it is missing, unreadable, or
    /// does not hold a usable URL.
    pub async fn load(&self) -> Option<TargetRecord> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Target record unreadable");
                return None;
            }
        };

        let record: TargetRecord = match serde_json::from_slice(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Target record corrupt");
                return None;
            }
        };

        if let Err(reason) = check_target_url(&record.url) {
            tracing::warn!(
                path = ?self.path,
                url = %record.url,
                reason = %reason,
                "Target record holds an unusable URL"
            );
            return None;
        }

        Some(TargetRecord {
            url: record.url.trim().to_string(),
            updated_at: record.updated_at,
        })
    }

    /// Replace the record with `new_url`.
    ///
    /// The URL is validated before anything touches the disk, so a rejected
    /// update leaves the previous record in place.
    pub async fn update(&self, new_url: &str) -> Result<TargetRecord, TargetError> {
        check_target_url(new_url).map_err(TargetError::InvalidConfig)?;

        let record = TargetRecord {
            url: new_url.trim().to_string(),
            updated_at: Some(Utc::now().to_rfc3339()),
        };
        let mut payload = serde_json::to_vec_pretty(&record)?;
        payload.push(b'\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.temp_path();
        if let Err(e) = publish(&tmp_path, &self.path, &payload).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        tracing::info!(path = ?self.path, url = %record.url, "Target record updated");
        Ok(record)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }
}

/// Write `payload` to `tmp_path`, flush it to disk, then move it over `path`.
async fn publish(tmp_path: &Path, path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut tmp = tokio::fs::File::create(tmp_path).await?;
    tmp.write_all(payload).await?;
    tmp.sync_all().await?;
    drop(tmp);
    tokio::fs::rename(tmp_path, path).await
}
