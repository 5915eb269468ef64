//! # JSON snapshot source
//!
//! Reads exported record snapshots from a data directory, one file per owner.
//!
//! ```text
//! data/
//! ├── <owner_id>.json    ← JSON array of raw records, backend field names as-is
//! └── ...
//! ```
//!
//! A missing file is an owner with no records. A file that cannot be read or
//! is not a JSON array makes the backend unavailable for that owner.

use super::subscribers::{SubscriberRegistry, Subscription};
use super::traits::{RecordSource, SnapshotCallback, SourceError};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use shared::RawRecord;
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct JsonFileSource {
    data_directory: PathBuf,
    subscribers: SubscriberRegistry,
}

impl JsonFileSource {
    pub fn new<P: AsRef<Path>>(data_directory: P) -> Self {
        Self {
            data_directory: data_directory.as_ref().to_path_buf(),
            subscribers: SubscriberRegistry::new(),
        }
    }

    pub fn data_directory(&self) -> &Path {
        &self.data_directory
    }

    /// Path of an owner's snapshot file
    pub fn snapshot_path(&self, owner_id: &str) -> Result<PathBuf, SourceError> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty()
            || owner_id.contains(['/', '\\'])
            || owner_id.starts_with('.')
        {
            warn!("Rejecting owner id {:?} for snapshot lookup", owner_id);
            return Err(SourceError::Unauthorized);
        }
        Ok(self.data_directory.join(format!("{}.json", owner_id)))
    }

    /// Read a snapshot file; a missing file is an empty snapshot
    pub async fn read_snapshot_file(path: &Path) -> Result<Vec<RawRecord>, SourceError> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot at {}, treating as empty", path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(SourceError::BackendUnavailable(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Self::parse_snapshot(&contents)
            .map_err(|e| SourceError::BackendUnavailable(format!("invalid snapshot {}: {}", path.display(), e)))
    }

    /// Parse a snapshot document. Entries that are not JSON objects become
    /// empty records so the normalizer counts them as skipped.
    pub fn parse_snapshot(contents: &str) -> Result<Vec<RawRecord>, serde_json::Error> {
        let values: Vec<Value> = serde_json::from_str(contents)?;
        Ok(values.into_iter().map(RawRecord::from_value).collect())
    }

    /// Re-read an owner's file and push it to subscribers
    pub async fn notify_changed(&self, owner_id: &str) -> Result<usize, SourceError> {
        let snapshot = self.fetch_records(owner_id).await?;
        let notified = self.subscribers.notify(owner_id, &snapshot);
        info!("Pushed {} records for {} to {} subscribers", snapshot.len(), owner_id, notified);
        Ok(notified)
    }
}

#[async_trait]
impl RecordSource for JsonFileSource {
    async fn fetch_records(&self, owner_id: &str) -> Result<Vec<RawRecord>, SourceError> {
        let path = self.snapshot_path(owner_id)?;
        Self::read_snapshot_file(&path).await
    }

    fn subscribe(&self, owner_id: &str, callback: SnapshotCallback) -> Subscription {
        self.subscribers.register(owner_id, callback)
    }
}
