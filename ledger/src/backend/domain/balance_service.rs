//! Balance calculations for the ledger.
//!
//! Balances are signed sums of normalized records: inflows add, outflows
//! subtract. All arithmetic is exact decimal; rounding to cents only happens
//! through `round_for_display`, never between intermediate sums.

use super::errors::{LedgerError, LedgerResult};
use chrono::NaiveDate;
use log::debug;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use shared::{EntryKind, FinancialRecord, Period};

/// Balance right after a dated record, in chronological order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningBalance {
    pub record_id: String,
    pub date: NaiveDate,
    pub balance: Decimal,
}

/// Service responsible for balance calculations
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceService;

impl BalanceService {
    pub fn new() -> Self {
        Self
    }

    /// Signed total of all records; exactly zero for an empty slice
    pub fn compute_balance(&self, records: &[FinancialRecord]) -> Decimal {
        records
            .iter()
            .map(FinancialRecord::signed_amount)
            .fold(Decimal::ZERO, |total, amount| total + amount)
    }

    /// Signed total of the records dated inside (year, month).
    ///
    /// `month` is 1-indexed. Undated records never belong to a period.
    pub fn compute_balance_for_period(
        &self,
        records: &[FinancialRecord],
        year: i32,
        month: u32,
    ) -> LedgerResult<Decimal> {
        let period = Period::new(year, month).ok_or(LedgerError::InvalidPeriodArgument { year, month })?;

        let in_period: Vec<FinancialRecord> = records
            .iter()
            .filter(|record| record.occurred_on.is_some_and(|date| period.contains(date)))
            .cloned()
            .collect();

        let balance = self.compute_balance(&in_period);
        debug!("Balance for {} over {} records: {}", period, in_period.len(), balance);
        Ok(balance)
    }

    /// Sum of inflow amounts
    pub fn inflow_total(&self, records: &[FinancialRecord]) -> Decimal {
        self.kind_total(records, EntryKind::Inflow)
    }

    /// Sum of outflow amounts (as a positive number)
    pub fn outflow_total(&self, records: &[FinancialRecord]) -> Decimal {
        self.kind_total(records, EntryKind::Outflow)
    }

    fn kind_total(&self, records: &[FinancialRecord], kind: EntryKind) -> Decimal {
        records
            .iter()
            .filter(|record| record.kind == kind)
            .fold(Decimal::ZERO, |total, record| total + record.amount)
    }

    /// Running balance after each dated record, oldest first.
    ///
    /// Records on the same day are applied in creation order. The starting
    /// balance is the total of the undated records, since those count toward
    /// the balance but have no position on the timeline.
    pub fn running_balances(&self, records: &[FinancialRecord]) -> Vec<RunningBalance> {
        let (dated, undated): (Vec<&FinancialRecord>, Vec<&FinancialRecord>) =
            records.iter().partition(|record| record.occurred_on.is_some());

        let mut running = undated
            .iter()
            .fold(Decimal::ZERO, |total, record| total + record.signed_amount());

        let mut chronological = dated;
        chronological.sort_by(|a, b| {
            a.occurred_on
                .cmp(&b.occurred_on)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        chronological
            .into_iter()
            .filter_map(|record| {
                let date = record.occurred_on?;
                running += record.signed_amount();
                Some(RunningBalance {
                    record_id: record.id.clone(),
                    date,
                    balance: running,
                })
            })
            .collect()
    }

    /// Round to cents for presentation (half away from zero)
    pub fn round_for_display(amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn create_test_record(id: &str, kind: EntryKind, cents: i64, date: Option<(i32, u32, u32)>) -> FinancialRecord {
        FinancialRecord {
            id: id.to_string(),
            kind,
            category: "Outros".to_string(),
            description: None,
            amount: Decimal::new(cents, 2),
            occurred_on: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            created_at: None,
            owner_id: None,
        }
    }

    #[test]
    fn test_empty_balance_is_exactly_zero() {
        let service = BalanceService::new();
        let balance = service.compute_balance(&[]);
        assert_eq!(balance, Decimal::ZERO);
        assert!(balance.is_zero());
    }

    #[test]
    fn test_all_inflow_balance_is_sum() {
        let service = BalanceService::new();
        let records = vec![
            create_test_record("a", EntryKind::Inflow, 1010, Some((2024, 1, 1))),
            create_test_record("b", EntryKind::Inflow, 2020, Some((2024, 1, 2))),
            create_test_record("c", EntryKind::Inflow, 1, None),
        ];
        assert_eq!(service.compute_balance(&records), Decimal::new(3031, 2));
        assert_eq!(service.inflow_total(&records), Decimal::new(3031, 2));
        assert_eq!(service.outflow_total(&records), Decimal::ZERO);
    }

    #[test]
    fn test_all_outflow_balance_is_negated_sum() {
        let service = BalanceService::new();
        let records = vec![
            create_test_record("a", EntryKind::Outflow, 25050, Some((2024, 1, 10))),
            create_test_record("b", EntryKind::Outflow, 9999, Some((2024, 2, 1))),
        ];
        assert_eq!(service.compute_balance(&records), Decimal::new(-35049, 2));
        assert_eq!(service.outflow_total(&records), Decimal::new(35049, 2));
    }

    #[test]
    fn test_many_small_amounts_have_no_drift() {
        let service = BalanceService::new();
        let records: Vec<FinancialRecord> = (0..1000)
            .map(|i| create_test_record(&i.to_string(), EntryKind::Inflow, 10, None))
            .collect();
        // 1000 x 0.10 is exactly 100 with decimal arithmetic
        assert_eq!(service.compute_balance(&records), Decimal::new(100, 0));
    }

    #[test]
    fn test_balance_for_period_filters_by_month() {
        let service = BalanceService::new();
        let records = vec![
            create_test_record("jan-in", EntryKind::Inflow, 100000, Some((2024, 1, 5))),
            create_test_record("jan-out", EntryKind::Outflow, 25050, Some((2024, 1, 10))),
            create_test_record("feb-out", EntryKind::Outflow, 9999, Some((2024, 2, 1))),
            create_test_record("undated", EntryKind::Inflow, 500, None),
        ];

        assert_eq!(
            service.compute_balance_for_period(&records, 2024, 1).unwrap(),
            Decimal::new(74950, 2)
        );
        assert_eq!(
            service.compute_balance_for_period(&records, 2024, 2).unwrap(),
            Decimal::new(-9999, 2)
        );
        assert_eq!(
            service.compute_balance_for_period(&records, 2023, 12).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_balance_for_period_rejects_invalid_month() {
        let service = BalanceService::new();
        let result = service.compute_balance_for_period(&[], 2024, 13);
        assert!(matches!(
            result,
            Err(LedgerError::InvalidPeriodArgument { year: 2024, month: 13 })
        ));
        assert!(service.compute_balance_for_period(&[], 2024, 0).is_err());
    }

    #[test]
    fn test_running_balances_chronological() {
        let service = BalanceService::new();
        let mut late = create_test_record("late", EntryKind::Outflow, 500, Some((2024, 1, 10)));
        late.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 10, 18, 0, 0).unwrap());
        let mut early = create_test_record("early", EntryKind::Inflow, 2000, Some((2024, 1, 10)));
        early.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap());

        let records = vec![
            late,
            create_test_record("undated", EntryKind::Inflow, 100, None),
            create_test_record("first", EntryKind::Inflow, 1000, Some((2024, 1, 1))),
            early,
        ];

        let balances = service.running_balances(&records);
        let ids: Vec<&str> = balances.iter().map(|b| b.record_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "early", "late"]);
        assert_eq!(balances[0].balance, Decimal::new(1100, 2));
        assert_eq!(balances[1].balance, Decimal::new(3100, 2));
        assert_eq!(balances[2].balance, Decimal::new(2600, 2));
        assert_eq!(balances[2].balance, service.compute_balance(&records));
    }

    #[test]
    fn test_round_for_display() {
        assert_eq!(BalanceService::round_for_display(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(BalanceService::round_for_display(Decimal::new(-12345, 3)), Decimal::new(-1235, 2));
        assert_eq!(BalanceService::round_for_display(Decimal::new(64951, 2)), Decimal::new(64951, 2));
    }
}
