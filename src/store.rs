// src/store.rs
//! Durable per-source record of already reported item ids.
//!
//! One pretty-printed JSON file per source (`{dir}/{source_id}_state.json`).
//! Writes go to a sibling `.tmp` file which is fsynced and renamed over the
//! canonical file, so a crash mid-write leaves the previous state intact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::PersistError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceState {
    #[serde(default)]
    pub seen_ids: BTreeSet<String>,
    /// Ids observed by the latest successful fetch.
    #[serde(default)]
    pub present_ids: BTreeSet<String>,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Written by the pipeline on a failed fetch; only saved alongside a
    /// pending detector update. The detector resets it.
    #[serde(default)]
    pub last_error: Option<String>,
}

impl SourceState {
    /// No successful cycle has ever been recorded for this source.
    pub fn is_first_run(&self) -> bool {
        self.last_checked_at.is_none()
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, source_id: &str) -> PathBuf {
        self.dir.join(format!("{source_id}_state.json"))
    }

    fn tmp_path_for(&self, source_id: &str) -> PathBuf {
        self.dir.join(format!("{source_id}_state.json.tmp"))
    }

    /// Missing file yields an empty state. Stale `.tmp` files are ignored.
    ///
    /// Bytes that are not valid UTF-8 JSON are `Corrupt`. `Io` means the file
    /// could not be read at all and its content is unknown.
    pub async fn load(&self, source_id: &str) -> Result<SourceState, PersistError> {
        let path = self.path_for(source_id);
        let raw = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SourceState::default())
            }
            Err(e) => return Err(PersistError::io(path, e)),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(SourceState::default());
        }
        serde_json::from_slice(&raw).map_err(|source| PersistError::Corrupt { path, source })
    }

    pub async fn save(&self, source_id: &str, state: &SourceState) -> Result<(), PersistError> {
        let bytes = serde_json::to_vec_pretty(state)?;
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PersistError::io(&self.dir, e))?;

        let tmp = self.tmp_path_for(source_id);
        let path = self.path_for(source_id);

        let mut file = fs::File::create(&tmp)
            .await
            .map_err(|e| PersistError::io(&tmp, e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| PersistError::io(&tmp, e))?;
        file.sync_all()
            .await
            .map_err(|e| PersistError::io(&tmp, e))?;
        drop(file);

        fs::rename(&tmp, &path)
            .await
            .map_err(|e| PersistError::io(&path, e))?;

        self.sync_dir().await;
        Ok(())
    }

    /// Move an unreadable state file aside so the source can start fresh.
    pub async fn quarantine(&self, source_id: &str) -> Result<PathBuf, PersistError> {
        let path = self.path_for(source_id);
        let aside = self.dir.join(format!(
            "{source_id}_state.json.corrupt-{}",
            Utc::now().timestamp()
        ));
        fs::rename(&path, &aside)
            .await
            .map_err(|e| PersistError::io(&path, e))?;
        Ok(aside)
    }

    #[cfg(unix)]
    async fn sync_dir(&self) {
        // Makes the rename itself durable.
        match fs::File::open(&self.dir).await {
            Ok(d) => {
                if let Err(e) = d.sync_all().await {
                    tracing::debug!(dir = %self.dir.display(), error = %e, "state dir fsync failed");
                }
            }
            Err(e) => {
                tracing::debug!(dir = %self.dir.display(), error = %e, "state dir open failed")
            }
        }
    }

    #[cfg(not(unix))]
    async fn sync_dir(&self) {}
}
