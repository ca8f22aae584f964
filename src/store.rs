// src/store.rs
//! Persisted per-source snapshots.
//!
//! The whole mapping lives in one pretty-printed JSON file:
//!
//! ```json
//! {
//!   "https://example.org/news": {
//!     "hash": "<sha256 hex>",
//!     "text": "<normalized text, truncated>",
//!     "updated_at": 1760000000
//!   }
//! }
//! ```
//!
//! Loading never fails: a missing file is an empty mapping and a corrupt one
//! is logged and treated as empty. Saving goes through a sibling temp file and
//! a rename, so a reader only ever sees the old file or the new one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_STATE_PATH: &str = "snapshots.json";

/// Upper bound on stored text, in characters.
pub const MAX_STORED_CHARS: usize = 100_000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file {path} could not be decoded: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("state encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("state io on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Last successful observation of one source. Keyed by identifier in
/// [`Snapshots`]; replaced wholesale on every successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    #[serde(rename = "hash")]
    pub content_hash: String,
    #[serde(rename = "text")]
    pub truncated_text: String,
    /// Unix seconds.
    pub updated_at: i64,
}

impl SourceRecord {
    pub fn capture(content_hash: String, text: &str, max_chars: usize, updated_at: i64) -> Self {
        Self {
            content_hash,
            truncated_text: truncate_chars(text, max_chars).to_string(),
            updated_at,
        }
    }
}

/// Identifier → record. The entire persisted state of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshots(BTreeMap<String, SourceRecord>);

impl Snapshots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> Option<&SourceRecord> {
        self.0.get(identifier)
    }

    /// Replaces any existing record for `identifier`. No I/O.
    pub fn upsert(&mut self, identifier: impl Into<String>, record: SourceRecord) {
        self.0.insert(identifier.into(), record);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl FromIterator<(String, SourceRecord)> for Snapshots {
    fn from_iter<I: IntoIterator<Item = (String, SourceRecord)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// JSON file backing for [`Snapshots`].
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_STATE_PATH.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Never fails; see module docs.
    pub async fn load(&self) -> Snapshots {
        match self.try_load().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "starting from empty state");
                Snapshots::new()
            }
        }
    }

    /// Like [`load`](Self::load) but surfaces the decode/io error.
    /// A missing file is still `Ok(empty)`.
    pub async fn try_load(&self) -> Result<Snapshots, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Snapshots::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(Snapshots::new());
        }
        serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes the full mapping atomically (temp file, fsync, rename).
    pub async fn save(&self, snapshots: &Snapshots) -> Result<(), StoreError> {
        let json = snapshots.to_json()?;
        self.write_atomic(json.as_bytes()).await?;
        tracing::debug!(path = %self.path.display(), records = snapshots.len(), "state saved");
        Ok(())
    }

    /// Fails early if the state location cannot be written at all.
    pub async fn ensure_writable(&self) -> Result<(), StoreError> {
        self.create_parent().await?;
        let tmp = self.tmp_path();
        fs::write(&tmp, b"")
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        let _ = fs::remove_file(&tmp).await;
        Ok(())
    }

    async fn create_parent(&self) -> Result<(), StoreError> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                fs::create_dir_all(dir).await.map_err(|source| StoreError::Io {
                    path: dir.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }

    async fn write_atomic(&self, data: &[u8]) -> Result<(), StoreError> {
        self.create_parent().await?;
        let tmp = self.tmp_path();
        let result = Self::write_then_rename(&tmp, &self.path, data).await;
        if result.is_err() {
            let _ = fs::remove_file(&tmp).await;
        }
        result
    }

    async fn write_then_rename(tmp: &Path, dest: &Path, data: &[u8]) -> Result<(), StoreError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| StoreError::Io { path, source }
        };

        let mut f = fs::File::create(tmp).await.map_err(io_err(tmp))?;
        f.write_all(data).await.map_err(io_err(tmp))?;
        f.sync_all().await.map_err(io_err(tmp))?;
        drop(f);

        fs::rename(tmp, dest).await.map_err(io_err(dest))
    }
}

/// Prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
