//! Aggregation facade for the ledger.
//!
//! `AggregationService::aggregate` is the only entry point the presentation
//! layer should call. It normalizes a raw snapshot once and derives the
//! total balance, the balance of the selected month and the month sections
//! from it.
//!
//! The computation is synchronous and side-effect free: the same snapshot and
//! period always produce the same `LedgerSummary`, so it can be re-run on
//! every push update, pull-to-refresh or mutation acknowledgment.

use super::balance_service::BalanceService;
use super::calendar::CalendarService;
use super::device_zone::DeviceZone;
use super::errors::{LedgerError, LedgerResult};
use super::record_normalizer::{NormalizedSnapshot, RecordNormalizer};
use log::{debug, info};
use shared::{LedgerSummary, Locale, Period, RawRecord, SkipReason, SkippedRecord};

/// Composes normalization, balances and grouping into one summary
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationService {
    normalizer: RecordNormalizer,
    balance_service: BalanceService,
    calendar_service: CalendarService,
}

impl AggregationService {
    pub fn new(zone: DeviceZone, locale: Locale) -> Self {
        Self {
            normalizer: RecordNormalizer::new(zone),
            balance_service: BalanceService::new(),
            calendar_service: CalendarService::new(locale),
        }
    }

    pub fn calendar_service(&self) -> &CalendarService {
        &self.calendar_service
    }

    /// Aggregate a snapshot.
    ///
    /// `selected_period` defaults to the current month on the device. An
    /// out-of-range month is rejected instead of clamped.
    pub fn aggregate(
        &self,
        raw_records: &[RawRecord],
        selected_period: Option<Period>,
    ) -> LedgerResult<LedgerSummary> {
        let period = self.resolve_period(selected_period)?;
        let snapshot = self.normalizer.normalize(raw_records);
        Ok(self.summarize(snapshot, period))
    }

    /// Aggregate a snapshot for one owner; records of any other owner are
    /// excluded and reported as skipped. Records without an owner are kept,
    /// since not every backend variant stores one on the record itself.
    pub fn aggregate_for_owner(
        &self,
        owner_id: &str,
        raw_records: &[RawRecord],
        selected_period: Option<Period>,
    ) -> LedgerResult<LedgerSummary> {
        let period = self.resolve_period(selected_period)?;
        let mut snapshot = self.normalizer.normalize(raw_records);

        let (own, foreign): (Vec<_>, Vec<_>) = snapshot
            .records
            .into_iter()
            .partition(|record| record.owner_id.as_deref().map_or(true, |owner| owner == owner_id));

        if !foreign.is_empty() {
            debug!("Excluding {} records that do not belong to {}", foreign.len(), owner_id);
        }
        snapshot.flagged.retain(|id| own.iter().any(|record| &record.id == id));
        snapshot.skipped.extend(foreign.into_iter().map(|record| SkippedRecord {
            id: Some(record.id),
            reason: SkipReason::ForeignOwner,
        }));
        snapshot.records = own;

        Ok(self.summarize(snapshot, period))
    }

    fn resolve_period(&self, selected_period: Option<Period>) -> LedgerResult<Period> {
        let period = selected_period.unwrap_or_else(|| self.normalizer.zone().current_period());
        if !period.is_valid() {
            return Err(LedgerError::InvalidPeriodArgument {
                year: period.year,
                month: period.month,
            });
        }
        Ok(period)
    }

    fn summarize(&self, snapshot: NormalizedSnapshot, period: Period) -> LedgerSummary {
        let NormalizedSnapshot {
            records,
            mut skipped,
            flagged,
        } = snapshot;

        let total_balance = self.balance_service.compute_balance(&records);
        let period_balance = self
            .balance_service
            .compute_balance_for_period(&records, period.year, period.month)
            .unwrap_or_default();

        let grouping = self.calendar_service.group_by_month(&records);
        let period_days = self.calendar_service.group_period_by_day(&records, period);
        skipped.extend(grouping.skipped);

        info!(
            "Aggregated {} records: total {}, {} balance {}, {} sections, {} skipped",
            records.len(),
            total_balance,
            period,
            period_balance,
            grouping.sections.len(),
            skipped.len()
        );

        LedgerSummary {
            total_balance,
            period,
            period_balance,
            sections: grouping.sections,
            period_days,
            skipped_count: skipped.len(),
            skipped,
            flagged,
        }
    }
}
