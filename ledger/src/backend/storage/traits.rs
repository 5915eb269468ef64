//! # Storage Traits
//!
//! The boundary between the ledger and the backend that stores records.

use super::subscribers::Subscription;
use async_trait::async_trait;
use shared::RawRecord;
use std::sync::Arc;
use thiserror::Error;

/// Failures surfaced by a record source. They are never retried here; the
/// caller decides what to show the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Not authorized to read these records")]
    Unauthorized,
}

/// Callback receiving a fresh snapshot after every change in the store
pub type SnapshotCallback = Arc<dyn Fn(Vec<RawRecord>) + Send + Sync>;

/// Trait defining the interface for record snapshot sources
///
/// Every read is scoped to an owner id; scoping is enforced by the source,
/// not by the aggregation.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Current snapshot of every record visible to `owner_id`
    async fn fetch_records(&self, owner_id: &str) -> Result<Vec<RawRecord>, SourceError>;

    /// Register a callback invoked with a fresh snapshot whenever the owner's
    /// records change. Dropping the returned `Subscription` unregisters it.
    fn subscribe(&self, owner_id: &str, callback: SnapshotCallback) -> Subscription;
}
