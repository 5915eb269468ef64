//! # In-memory record source
//!
//! Keeps raw records per owner in memory, in the same shape the hosted
//! backend returns them (`user_id`, `type`, `total`, `date`, `created_at`).
//! Every mutation pushes a fresh snapshot to the owner's subscribers, which is
//! how the real backend's change feed behaves.

use super::subscribers::{SubscriberRegistry, Subscription};
use super::traits::{RecordSource, SnapshotCallback, SourceError};
use crate::backend::domain::RecordNormalizer;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use shared::{EntryKind, NewRecord, RawRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Simulated availability of the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceStatus {
    #[default]
    Online,
    Offline,
    SignedOut,
}

#[derive(Clone, Default)]
pub struct MemoryRecordSource {
    records: Arc<Mutex<HashMap<String, Vec<RawRecord>>>>,
    status: Arc<Mutex<SourceStatus>>,
    subscribers: SubscriberRegistry,
}

impl MemoryRecordSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, Vec<RawRecord>>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_status(&self, status: SourceStatus) {
        info!("Memory record source is now {:?}", status);
        *self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = status;
    }

    fn check_status(&self) -> Result<(), SourceError> {
        match *self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) {
            SourceStatus::Online => Ok(()),
            SourceStatus::Offline => Err(SourceError::BackendUnavailable("backend is offline".to_string())),
            SourceStatus::SignedOut => Err(SourceError::Unauthorized),
        }
    }

    /// Store a validated record and return its new id
    pub fn insert(&self, owner_id: &str, record: &NewRecord) -> Result<String, SourceError> {
        let id = Uuid::new_v4().to_string();
        let raw = Self::to_raw(owner_id, record)
            .with("id", id.clone())
            .with("created_at", Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        self.insert_raw(owner_id, raw)?;
        Ok(id)
    }

    /// Store a raw record as-is, assigning an id when it has none
    pub fn insert_raw(&self, owner_id: &str, mut raw: RawRecord) -> Result<(), SourceError> {
        self.check_status()?;
        if raw.get_first(&["id"]).is_none() {
            raw.set("id", Uuid::new_v4().to_string());
        }

        let snapshot = {
            let mut records = self.records();
            let owner_records = records.entry(owner_id.to_string()).or_default();
            owner_records.push(raw);
            owner_records.clone()
        };

        self.subscribers.notify(owner_id, &snapshot);
        Ok(())
    }

    /// Replace the editable fields of a record; false when the id is unknown
    pub fn update(&self, owner_id: &str, record_id: &str, record: &NewRecord) -> Result<bool, SourceError> {
        self.check_status()?;

        let snapshot = {
            let mut records = self.records();
            let Some(owner_records) = records.get_mut(owner_id) else {
                return Ok(false);
            };
            let Some(existing) = owner_records.iter_mut().find(|raw| Self::has_id(raw, record_id)) else {
                return Ok(false);
            };

            let mut updated = Self::to_raw(owner_id, record).with("id", record_id);
            if let Some(created_at) = existing.get_first(&["created_at"]).cloned() {
                updated.set("created_at", created_at);
            }
            *existing = updated;
            owner_records.clone()
        };

        self.subscribers.notify(owner_id, &snapshot);
        Ok(true)
    }

    /// Delete a record; false when the id is unknown
    pub fn delete(&self, owner_id: &str, record_id: &str) -> Result<bool, SourceError> {
        self.check_status()?;

        let snapshot = {
            let mut records = self.records();
            let Some(owner_records) = records.get_mut(owner_id) else {
                return Ok(false);
            };
            let before = owner_records.len();
            owner_records.retain(|raw| !Self::has_id(raw, record_id));
            if owner_records.len() == before {
                warn!("Delete requested for unknown record {} of {}", record_id, owner_id);
                return Ok(false);
            }
            owner_records.clone()
        };

        self.subscribers.notify(owner_id, &snapshot);
        Ok(true)
    }

    fn has_id(raw: &RawRecord, record_id: &str) -> bool {
        raw.get_first(&["id"])
            .and_then(RecordNormalizer::value_to_string)
            .is_some_and(|id| id == record_id)
    }

    fn to_raw(owner_id: &str, record: &NewRecord) -> RawRecord {
        let direction = match record.kind {
            EntryKind::Inflow => "entradas",
            EntryKind::Outflow => "saidas",
        };

        RawRecord::new()
            .with("user_id", owner_id)
            .with("type", direction)
            .with("category", record.category.clone())
            .with("description", record.description.clone().unwrap_or_default())
            .with("total", record.amount.to_string())
            .with("date", record.occurred_on.format("%Y-%m-%d").to_string())
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn fetch_records(&self, owner_id: &str) -> Result<Vec<RawRecord>, SourceError> {
        self.check_status()?;
        Ok(self.records().get(owner_id).cloned().unwrap_or_default())
    }

    fn subscribe(&self, owner_id: &str, callback: SnapshotCallback) -> Subscription {
        self.subscribers.register(owner_id, callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create_test_record(kind: EntryKind, cents: i64, day: u32) -> NewRecord {
        NewRecord {
            kind,
            category: "Outros".to_string(),
            description: None,
            amount: Decimal::new(cents, 2),
            occurred_on: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_round_trip_through_normalizer() {
        let source = MemoryRecordSource::new();
        let id = source
            .insert("alice", &create_test_record(EntryKind::Outflow, 25050, 10))
            .unwrap();

        let snapshot = source.fetch_records("alice").await.unwrap();
        assert_eq!(snapshot.len(), 1);

        let normalized = RecordNormalizer::default().normalize(&snapshot);
        let record = &normalized.records[0];
        assert_eq!(record.id, id);
        assert_eq!(record.kind, EntryKind::Outflow);
        assert_eq!(record.amount, Decimal::new(25050, 2));
        assert_eq!(record.occurred_on, NaiveDate::from_ymd_opt(2024, 1, 10));
        assert_eq!(record.owner_id.as_deref(), Some("alice"));
        assert!(record.created_at.is_some());
    }

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let source = MemoryRecordSource::new();
        source.insert("alice", &create_test_record(EntryKind::Inflow, 100, 1)).unwrap();

        assert!(source.fetch_records("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let source = MemoryRecordSource::new();
        let id = source.insert("alice", &create_test_record(EntryKind::Inflow, 100, 1)).unwrap();

        assert!(source.update("alice", &id, &create_test_record(EntryKind::Inflow, 999, 2)).unwrap());
        let normalized = RecordNormalizer::default().normalize(&source.fetch_records("alice").await.unwrap());
        assert_eq!(normalized.records[0].amount, Decimal::new(999, 2));
        assert!(normalized.records[0].created_at.is_some());

        assert!(!source.update("alice", "missing", &create_test_record(EntryKind::Inflow, 1, 1)).unwrap());
        assert!(source.delete("alice", &id).unwrap());
        assert!(!source.delete("alice", &id).unwrap());
        assert!(source.fetch_records("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_numeric_ids_can_be_updated_and_deleted() {
        let source = MemoryRecordSource::new();
        source
            .insert_raw(
                "alice",
                RawRecord::new().with("id", 7).with("type", "entradas").with("total", 10),
            )
            .unwrap();

        assert!(source.update("alice", "7", &create_test_record(EntryKind::Outflow, 500, 3)).unwrap());
        let normalized = RecordNormalizer::default().normalize(&source.fetch_records("alice").await.unwrap());
        assert_eq!(normalized.records[0].id, "7");
        assert_eq!(normalized.records[0].kind, EntryKind::Outflow);

        assert!(source.delete("alice", "7").unwrap());
        assert!(source.fetch_records("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_notify_subscribers() {
        let source = MemoryRecordSource::new();
        let last_len = Arc::new(AtomicUsize::new(usize::MAX));

        let seen = Arc::clone(&last_len);
        let subscription = source.subscribe(
            "alice",
            Arc::new(move |snapshot: Vec<RawRecord>| seen.store(snapshot.len(), Ordering::SeqCst)),
        );

        let id = source.insert("alice", &create_test_record(EntryKind::Inflow, 100, 1)).unwrap();
        assert_eq!(last_len.load(Ordering::SeqCst), 1);
        source.insert("alice", &create_test_record(EntryKind::Inflow, 100, 2)).unwrap();
        assert_eq!(last_len.load(Ordering::SeqCst), 2);
        source.delete("alice", &id).unwrap();
        assert_eq!(last_len.load(Ordering::SeqCst), 1);

        drop(subscription);
        source.insert("alice", &create_test_record(EntryKind::Inflow, 100, 3)).unwrap();
        assert_eq!(last_len.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_status_errors() {
        let source = MemoryRecordSource::new();

        source.set_status(SourceStatus::Offline);
        assert!(matches!(
            source.fetch_records("alice").await,
            Err(SourceError::BackendUnavailable(_))
        ));
        assert!(source.insert("alice", &create_test_record(EntryKind::Inflow, 1, 1)).is_err());

        source.set_status(SourceStatus::SignedOut);
        assert_eq!(source.fetch_records("alice").await, Err(SourceError::Unauthorized));

        source.set_status(SourceStatus::Online);
        assert!(source.fetch_records("alice").await.unwrap().is_empty());
    }
}
