//! Live ledger state for one owner.
//!
//! `LedgerWatcher` ties a `RecordSource` to the aggregation: it re-runs
//! `aggregate` from scratch on every snapshot the source pushes and on every
//! explicit refresh, and keeps the most recent result for the UI. Source
//! failures never clear what is on screen; the last successful summary stays
//! in place and the failure is kept in `last_error`.

use crate::backend::domain::{AggregationService, LedgerError, LedgerResult};
use crate::backend::storage::{RecordSource, SourceError, Subscription};
use log::{info, warn};
use shared::{LedgerSummary, Period, RawRecord};
use std::sync::{Arc, Mutex, MutexGuard};

struct WatcherInner {
    selected_period: Option<Period>,
    snapshot: Vec<RawRecord>,
    summary: LedgerSummary,
    last_error: Option<SourceError>,
    recompute_count: u64,
    /// Bumped every time a snapshot replaces the current one
    generation: u64,
}

struct WatcherShared {
    owner_id: String,
    aggregation: AggregationService,
    inner: Mutex<WatcherInner>,
}

impl WatcherShared {
    fn lock(&self) -> MutexGuard<'_, WatcherInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Replace the snapshot (when given) and recompute the summary
    fn recompute(&self, snapshot: Option<Vec<RawRecord>>) -> LedgerResult<LedgerSummary> {
        let mut inner = self.lock();
        if let Some(snapshot) = snapshot {
            Self::replace_snapshot(&mut inner, snapshot);
        }
        self.summarize(inner)
    }

    fn replace_snapshot(inner: &mut WatcherInner, snapshot: Vec<RawRecord>) {
        inner.snapshot = snapshot;
        inner.last_error = None;
        inner.generation += 1;
    }

    /// Apply a fetched snapshot unless another one landed since `fetched_at`
    fn apply_fetched(&self, snapshot: Vec<RawRecord>, fetched_at: u64) -> LedgerResult<LedgerSummary> {
        let mut inner = self.lock();
        if inner.generation != fetched_at {
            info!(
                "Discarding fetched snapshot for {}: a newer one arrived while fetching",
                self.owner_id
            );
            return Ok(inner.summary.clone());
        }
        Self::replace_snapshot(&mut inner, snapshot);
        self.summarize(inner)
    }

    fn summarize(&self, mut inner: MutexGuard<'_, WatcherInner>) -> LedgerResult<LedgerSummary> {
        let summary = self
            .aggregation
            .aggregate_for_owner(&self.owner_id, &inner.snapshot, inner.selected_period)?;
        inner.summary = summary.clone();
        inner.recompute_count += 1;
        Ok(summary)
    }
}

/// Keeps an owner's ledger summary current
pub struct LedgerWatcher<S: RecordSource> {
    source: Arc<S>,
    shared: Arc<WatcherShared>,
    subscription: Mutex<Option<Subscription>>,
}

impl<S: RecordSource> LedgerWatcher<S> {
    /// Create a watcher showing an empty ledger until the first snapshot arrives
    pub fn new(source: Arc<S>, owner_id: &str, aggregation: AggregationService) -> LedgerResult<Self> {
        let summary = aggregation.aggregate_for_owner(owner_id, &[], None)?;

        Ok(Self {
            source,
            shared: Arc::new(WatcherShared {
                owner_id: owner_id.to_string(),
                aggregation,
                inner: Mutex::new(WatcherInner {
                    selected_period: None,
                    snapshot: Vec::new(),
                    summary,
                    last_error: None,
                    recompute_count: 0,
                    generation: 0,
                }),
            }),
            subscription: Mutex::new(None),
        })
    }

    pub fn owner_id(&self) -> &str {
        &self.shared.owner_id
    }

    /// Register with the source's change feed; every pushed snapshot is
    /// aggregated immediately. Calling it again replaces the registration.
    pub fn start(&self) {
        let shared = Arc::clone(&self.shared);
        let subscription = self.source.subscribe(
            &self.shared.owner_id,
            Arc::new(move |snapshot: Vec<RawRecord>| {
                info!("Received pushed snapshot of {} records for {}", snapshot.len(), shared.owner_id);
                if let Err(e) = shared.recompute(Some(snapshot)) {
                    warn!("Failed to aggregate pushed snapshot for {}: {}", shared.owner_id, e);
                }
            }),
        );

        *self.subscription.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(subscription);
    }

    /// Stop listening to the change feed
    pub fn stop(&self) {
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }

    pub fn is_listening(&self) -> bool {
        self.subscription
            .lock()
            .map(|subscription| subscription.is_some())
            .unwrap_or(false)
    }

    /// Pull a fresh snapshot from the source and recompute.
    ///
    /// On failure the previous summary is kept and the error is both
    /// recorded and returned; nothing is retried. A snapshot pushed while the
    /// fetch was in flight wins over the fetched one.
    pub async fn refresh(&self) -> LedgerResult<LedgerSummary> {
        let fetched_at = self.shared.generation();
        match self.source.fetch_records(&self.shared.owner_id).await {
            Ok(snapshot) => {
                info!("Fetched {} records for {}", snapshot.len(), self.shared.owner_id);
                self.shared.apply_fetched(snapshot, fetched_at)
            }
            Err(e) => {
                warn!("Keeping last ledger summary for {}: {}", self.shared.owner_id, e);
                self.shared.lock().last_error = Some(e.clone());
                Err(LedgerError::Source(e))
            }
        }
    }

    /// Change the selected month and recompute from the current snapshot
    pub fn select_period(&self, period: Period) -> LedgerResult<LedgerSummary> {
        if !period.is_valid() {
            return Err(LedgerError::InvalidPeriodArgument {
                year: period.year,
                month: period.month,
            });
        }
        self.shared.lock().selected_period = Some(period);
        self.shared.recompute(None)
    }

    pub fn summary(&self) -> LedgerSummary {
        self.shared.lock().summary.clone()
    }

    pub fn last_error(&self) -> Option<SourceError> {
        self.shared.lock().last_error.clone()
    }

    /// How many times the summary has been recomputed
    pub fn recompute_count(&self) -> u64 {
        self.shared.lock().recompute_count
    }
}
