//! Calendar domain logic for the ledger.
//!
//! This module buckets normalized records by calendar month or day and builds
//! the section labels the UI renders. Buckets are keyed by the underlying
//! (year, month) or date and ordered on that key, most recent first; labels
//! are derived from the key and never used for sorting.
//!
//! Buckets are sparse: a month or day only shows up when at least one record
//! falls in it. Records without a usable date are left out of every bucket
//! and reported back as skipped.

use super::balance_service::BalanceService;
use chrono::{Datelike, NaiveDate};
use log::debug;
use shared::{
    DaySection, FinancialRecord, Locale, MonthSection, Period, SkipReason, SkippedRecord,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Sections produced by a grouping pass plus the records that could not be placed
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping<S> {
    pub sections: Vec<S>,
    pub skipped: Vec<SkippedRecord>,
}

/// Calendar service that handles period bucketing and labels
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarService {
    locale: Locale,
    balance_service: BalanceService,
}

impl CalendarService {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            balance_service: BalanceService::new(),
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Get the human-readable name for a 1-indexed month number
    pub fn month_name(&self, month: u32) -> &'static str {
        match self.locale {
            Locale::PtBr => match month {
                1 => "Janeiro", 2 => "Fevereiro", 3 => "Março", 4 => "Abril",
                5 => "Maio", 6 => "Junho", 7 => "Julho", 8 => "Agosto",
                9 => "Setembro", 10 => "Outubro", 11 => "Novembro", 12 => "Dezembro",
                _ => "Mês inválido",
            },
            Locale::EnUs => match month {
                1 => "January", 2 => "February", 3 => "March", 4 => "April",
                5 => "May", 6 => "June", 7 => "July", 8 => "August",
                9 => "September", 10 => "October", 11 => "November", 12 => "December",
                _ => "Invalid Month",
            },
        }
    }

    /// "Fevereiro de 2024" / "February 2024"
    pub fn month_label(&self, period: Period) -> String {
        match self.locale {
            Locale::PtBr => format!("{} de {}", self.month_name(period.month), period.year),
            Locale::EnUs => format!("{} {}", self.month_name(period.month), period.year),
        }
    }

    /// "01/02/2024" (day first) / "02/01/2024" (month first)
    pub fn day_label(&self, date: NaiveDate) -> String {
        match self.locale {
            Locale::PtBr => format!("{:02}/{:02}/{:04}", date.day(), date.month(), date.year()),
            Locale::EnUs => format!("{:02}/{:02}/{:04}", date.month(), date.day(), date.year()),
        }
    }

    /// Display order inside a bucket: newest day first, then newest creation,
    /// then id so equal records still have a fixed order
    pub fn display_order(a: &FinancialRecord, b: &FinancialRecord) -> Ordering {
        b.occurred_on
            .cmp(&a.occurred_on)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    }

    /// Group records into month sections, most recent month first
    pub fn group_by_month(&self, records: &[FinancialRecord]) -> Grouping<MonthSection> {
        let (buckets, skipped) = Self::bucket(records, Period::from_date);

        let sections = buckets
            .into_iter()
            .rev()
            .map(|(period, records)| MonthSection {
                period,
                label: self.month_label(period),
                balance: self.balance_service.compute_balance(&records),
                records,
            })
            .collect::<Vec<_>>();

        debug!("Grouped {} records into {} month sections", records.len(), sections.len());
        Grouping { sections, skipped }
    }

    /// Group records into day sections, most recent day first
    pub fn group_by_day(&self, records: &[FinancialRecord]) -> Grouping<DaySection> {
        let (buckets, skipped) = Self::bucket(records, |date| date);

        let sections = buckets
            .into_iter()
            .rev()
            .map(|(date, records)| DaySection {
                date,
                label: self.day_label(date),
                balance: self.balance_service.compute_balance(&records),
                records,
            })
            .collect();

        Grouping { sections, skipped }
    }

    /// Day sections of a single month (the month-filter screen)
    pub fn group_period_by_day(&self, records: &[FinancialRecord], period: Period) -> Vec<DaySection> {
        let in_period: Vec<FinancialRecord> = records
            .iter()
            .filter(|record| record.occurred_on.is_some_and(|date| period.contains(date)))
            .cloned()
            .collect();

        self.group_by_day(&in_period).sections
    }

    fn bucket<K: Ord>(
        records: &[FinancialRecord],
        key_of: impl Fn(NaiveDate) -> K,
    ) -> (BTreeMap<K, Vec<FinancialRecord>>, Vec<SkippedRecord>) {
        let mut buckets: BTreeMap<K, Vec<FinancialRecord>> = BTreeMap::new();
        let mut skipped = Vec::new();

        for record in records {
            match record.occurred_on {
                Some(date) => buckets.entry(key_of(date)).or_default().push(record.clone()),
                None => skipped.push(SkippedRecord {
                    id: Some(record.id.clone()),
                    reason: SkipReason::MissingDate,
                }),
            }
        }

        for bucket in buckets.values_mut() {
            bucket.sort_by(Self::display_order);
        }

        (buckets, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use shared::EntryKind;
    use std::collections::HashSet;

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

    fn scenario_records() -> Vec<FinancialRecord> {
        vec![
            create_test_record("salary", EntryKind::Inflow, 100000, Some((2024, 1, 5))),
            create_test_record("groceries", EntryKind::Outflow, 25050, Some((2024, 1, 10))),
            create_test_record("streaming", EntryKind::Outflow, 9999, Some((2024, 2, 1))),
        ]
    }

    #[test]
    fn test_month_name() {
        let service = CalendarService::new(Locale::PtBr);
        assert_eq!(service.month_name(1), "Janeiro");
        assert_eq!(service.month_name(3), "Março");
        assert_eq!(service.month_name(12), "Dezembro");
        assert_eq!(service.month_name(13), "Mês inválido");

        let service = CalendarService::new(Locale::EnUs);
        assert_eq!(service.month_name(6), "June");
    }

    #[test]
    fn test_labels() {
        let pt = CalendarService::new(Locale::PtBr);
        let en = CalendarService::new(Locale::EnUs);
        let period = Period { year: 2024, month: 2 };
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

        assert_eq!(pt.month_label(period), "Fevereiro de 2024");
        assert_eq!(en.month_label(period), "February 2024");
        assert_eq!(pt.day_label(date), "01/02/2024");
        assert_eq!(en.day_label(date), "02/01/2024");
    }

    #[test]
    fn test_group_by_month_scenario() {
        let service = CalendarService::new(Locale::PtBr);
        let grouping = service.group_by_month(&scenario_records());

        assert!(grouping.skipped.is_empty());
        assert_eq!(grouping.sections.len(), 2);

        let february = &grouping.sections[0];
        assert_eq!(february.label, "Fevereiro de 2024");
        assert_eq!(february.records.len(), 1);
        assert_eq!(february.balance, Decimal::new(-9999, 2));

        let january = &grouping.sections[1];
        assert_eq!(january.label, "Janeiro de 2024");
        assert_eq!(january.records.len(), 2);
        assert_eq!(january.balance, Decimal::new(74950, 2));
        assert_eq!(january.records[0].id, "groceries");
        assert_eq!(january.records[1].id, "salary");
    }

    #[test]
    fn test_sections_sorted_by_period_not_label() {
        // Alphabetically "Abril" < "Dezembro" < "Janeiro"; chronologically it is reversed
        let service = CalendarService::new(Locale::PtBr);
        let records = vec![
            create_test_record("jan", EntryKind::Inflow, 100, Some((2025, 1, 15))),
            create_test_record("apr", EntryKind::Inflow, 100, Some((2023, 4, 2))),
            create_test_record("dec", EntryKind::Inflow, 100, Some((2024, 12, 31))),
        ];

        let grouping = service.group_by_month(&records);
        let periods: Vec<Period> = grouping.sections.iter().map(|s| s.period).collect();
        assert_eq!(
            periods,
            vec![
                Period { year: 2025, month: 1 },
                Period { year: 2024, month: 12 },
                Period { year: 2023, month: 4 },
            ]
        );
    }

    #[test]
    fn test_ties_broken_by_created_at_descending() {
        let service = CalendarService::new(Locale::PtBr);
        let mut first = create_test_record("first", EntryKind::Outflow, 100, Some((2024, 3, 3)));
        first.created_at = Some(Utc.with_ymd_and_hms(2024, 3, 3, 9, 0, 0).unwrap());
        let mut second = create_test_record("second", EntryKind::Outflow, 200, Some((2024, 3, 3)));
        second.created_at = Some(Utc.with_ymd_and_hms(2024, 3, 3, 21, 0, 0).unwrap());

        let records = vec![first, second];

        let by_month = service.group_by_month(&records);
        let ids: Vec<&str> = by_month.sections[0].records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["second", "first"]);

        let by_day = service.group_by_day(&records);
        assert_eq!(by_day.sections.len(), 1);
        let ids: Vec<&str> = by_day.sections[0].records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["second", "first"]);
    }

    #[test]
    fn test_missing_created_at_sorts_after_known() {
        let mut known = create_test_record("known", EntryKind::Outflow, 100, Some((2024, 3, 3)));
        known.created_at = Some(Utc.with_ymd_and_hms(2024, 3, 3, 9, 0, 0).unwrap());
        let unknown = create_test_record("unknown", EntryKind::Outflow, 100, Some((2024, 3, 3)));

        assert_eq!(CalendarService::display_order(&known, &unknown), Ordering::Less);
    }

    #[test]
    fn test_undated_records_are_skipped() {
        let service = CalendarService::new(Locale::PtBr);
        let mut records = scenario_records();
        records.push(create_test_record("undated", EntryKind::Inflow, 100, None));

        let grouping = service.group_by_month(&records);
        assert_eq!(
            grouping.skipped,
            vec![SkippedRecord { id: Some("undated".to_string()), reason: SkipReason::MissingDate }]
        );

        let grouped_ids: Vec<&str> = grouping
            .sections
            .iter()
            .flat_map(|s| s.records.iter().map(|r| r.id.as_str()))
            .collect();
        assert!(!grouped_ids.contains(&"undated"));
    }

    #[test]
    fn test_every_dated_record_in_exactly_one_section() {
        let service = CalendarService::new(Locale::PtBr);
        let records: Vec<FinancialRecord> = (0..60)
            .map(|i| {
                let date = if i % 7 == 0 { None } else { Some((2023 + (i % 3) as i32, (i % 12) as u32 + 1, 1)) };
                create_test_record(&format!("r{}", i), EntryKind::Inflow, 100, date)
            })
            .collect();

        let grouping = service.group_by_month(&records);

        let grouped: Vec<String> = grouping
            .sections
            .iter()
            .flat_map(|s| s.records.iter().map(|r| r.id.clone()))
            .collect();
        let unique: HashSet<String> = grouped.iter().cloned().collect();
        assert_eq!(grouped.len(), unique.len());

        let skipped: HashSet<String> = grouping.skipped.iter().filter_map(|s| s.id.clone()).collect();
        let expected: HashSet<String> = records
            .iter()
            .map(|r| r.id.clone())
            .filter(|id| !skipped.contains(id))
            .collect();
        assert_eq!(unique, expected);

        assert!(grouping.sections.iter().all(|s| !s.records.is_empty()));
        assert!(grouping.sections.windows(2).all(|w| w[0].period > w[1].period));
    }

    #[test]
    fn test_group_period_by_day() {
        let service = CalendarService::new(Locale::PtBr);
        let records = vec![
            create_test_record("a", EntryKind::Inflow, 1000, Some((2024, 1, 5))),
            create_test_record("b", EntryKind::Outflow, 300, Some((2024, 1, 5))),
            create_test_record("c", EntryKind::Outflow, 200, Some((2024, 1, 20))),
            create_test_record("d", EntryKind::Outflow, 200, Some((2024, 2, 20))),
            create_test_record("e", EntryKind::Outflow, 200, None),
        ];

        let days = service.group_period_by_day(&records, Period { year: 2024, month: 1 });

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].label, "20/01/2024");
        assert_eq!(days[0].balance, Decimal::new(-200, 2));
        assert_eq!(days[1].label, "05/01/2024");
        assert_eq!(days[1].records.len(), 2);
        assert_eq!(days[1].balance, Decimal::new(700, 2));
    }

    #[test]
    fn test_empty_input_has_no_sections() {
        let service = CalendarService::new(Locale::PtBr);
        let grouping = service.group_by_month(&[]);
        assert!(grouping.sections.is_empty());
        assert!(grouping.skipped.is_empty());
    }
}
