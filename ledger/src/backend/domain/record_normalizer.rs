//! Record normalization for the ledger.
//!
//! This module turns raw records, as returned by whichever backend variant
//! stored them, into the canonical `FinancialRecord` used by every other
//! domain service.
//!
//! ## Backend differences handled here
//!
//! - **Field names**: `total` vs `amount`, `created_at` vs `createdAt`,
//!   `user_id` vs `userId`, ...
//! - **Direction codes**: lowercase `entradas`/`saidas` vs capitalized
//!   `Entradas`/`Saídas` labels, plus a few English spellings
//! - **Date encodings**: RFC 3339 strings, naive dates, `DD/MM/YYYY` display
//!   strings, Firestore `{seconds, nanoseconds}` objects and epoch millis
//!
//! Instants are converted to a calendar day with the device timezone. Naive
//! dates are already local calendar days and are taken as they are.
//!
//! Malformed amounts drop the record (counted in `skipped`), unknown direction
//! codes fall back to outflow (listed in `flagged`), and a bad date leaves
//! `occurred_on` empty. Nothing here aborts the rest of the snapshot.

use super::device_zone::DeviceZone;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{debug, warn};
use rust_decimal::Decimal;
use serde_json::Value;
use shared::{EntryKind, FinancialRecord, RawRecord, SkipReason, SkippedRecord, FALLBACK_CATEGORY};

const ID_FIELDS: &[&str] = &["id", "_id", "uid"];
const KIND_FIELDS: &[&str] = &["type", "kind", "direction", "collectionPath"];
const AMOUNT_FIELDS: &[&str] = &["total", "amount", "valor", "value"];
const CATEGORY_FIELDS: &[&str] = &["category", "categoria"];
const DESCRIPTION_FIELDS: &[&str] = &["description", "descricao"];
const DATE_FIELDS: &[&str] = &["date", "occurredAt", "occurred_at", "data"];
const CREATED_FIELDS: &[&str] = &["created_at", "createdAt"];
const OWNER_FIELDS: &[&str] = &["user_id", "userId", "owner_id", "ownerId"];

/// Direction codes seen across backend variants, matched after lowercasing
const INFLOW_CODES: &[&str] = &["entradas", "entrada", "inflow", "income", "receita", "receitas", "credit"];
const OUTFLOW_CODES: &[&str] = &[
    "saidas", "saídas", "saida", "saída", "outflow", "expense", "despesa", "despesas", "debit",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Largest amount a single record may carry. Keeps every balance sum far
/// below `Decimal::MAX`.
const MAX_RECORD_AMOUNT: i64 = 1_000_000_000_000_000;

/// Result of normalizing one snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSnapshot {
    pub records: Vec<FinancialRecord>,
    /// Records excluded because they could not be normalized
    pub skipped: Vec<SkippedRecord>,
    /// Ids of records whose direction code was unknown (treated as outflow)
    pub flagged: Vec<String>,
}

/// Converts raw backend records into canonical records
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordNormalizer {
    zone: DeviceZone,
}

impl RecordNormalizer {
    pub fn new(zone: DeviceZone) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> DeviceZone {
        self.zone
    }

    /// Normalize a whole snapshot, skipping records that cannot be used
    pub fn normalize(&self, raw_records: &[RawRecord]) -> NormalizedSnapshot {
        let mut snapshot = NormalizedSnapshot::default();

        for (index, raw) in raw_records.iter().enumerate() {
            let id = Self::parse_id(raw);

            let Some(amount) = raw
                .get_first(AMOUNT_FIELDS)
                .and_then(Self::parse_amount)
                .filter(|amount| amount.abs() <= Decimal::from(MAX_RECORD_AMOUNT))
            else {
                debug!("Skipping record {:?} at position {}: missing, non-numeric or out-of-range amount", id, index);
                snapshot.skipped.push(SkippedRecord {
                    id,
                    reason: SkipReason::MalformedAmount,
                });
                continue;
            };

            let id = id.unwrap_or_else(|| {
                warn!("Record at position {} has no id, assigning a positional one", index);
                format!("unidentified-{}", index)
            });

            let kind_code = raw.get_str(KIND_FIELDS);
            let kind = match kind_code.and_then(Self::parse_kind) {
                Some(kind) => kind,
                None => {
                    warn!("Record {} has unrecognized direction {:?}, counting it as outflow", id, kind_code);
                    snapshot.flagged.push(id.clone());
                    EntryKind::Outflow
                }
            };

            let amount = if amount.is_sign_negative() {
                warn!("Record {} has negative amount {}, using its absolute value", id, amount);
                amount.abs()
            } else {
                amount
            };

            let occurred_on = raw.get_first(DATE_FIELDS).and_then(|value| self.parse_occurred_on(value));
            if occurred_on.is_none() {
                debug!("Record {} has no usable date", id);
            }

            snapshot.records.push(FinancialRecord {
                id,
                kind,
                category: raw
                    .get_str(CATEGORY_FIELDS)
                    .unwrap_or(FALLBACK_CATEGORY)
                    .to_string(),
                description: raw.get_str(DESCRIPTION_FIELDS).map(str::to_string),
                amount,
                occurred_on,
                created_at: raw.get_first(CREATED_FIELDS).and_then(Self::parse_instant),
                owner_id: raw.get_first(OWNER_FIELDS).and_then(Self::value_to_string),
            });
        }

        debug!(
            "Normalized {} records ({} skipped, {} flagged)",
            snapshot.records.len(),
            snapshot.skipped.len(),
            snapshot.flagged.len()
        );
        snapshot
    }

    /// Map a backend direction code to a kind; None when the code is unknown
    pub fn parse_kind(code: &str) -> Option<EntryKind> {
        let code = code.trim().to_lowercase();
        if INFLOW_CODES.contains(&code.as_str()) {
            Some(EntryKind::Inflow)
        } else if OUTFLOW_CODES.contains(&code.as_str()) {
            Some(EntryKind::Outflow)
        } else {
            None
        }
    }

    /// Parse an amount stored as a JSON number or as text.
    ///
    /// Text may use a comma decimal separator ("250,50") and dot thousands
    /// separators ("1.234,56"). A dot after the last comma ("1,000.50") mixes
    /// both conventions and is rejected.
    pub fn parse_amount(value: &Value) -> Option<Decimal> {
        match value {
            Value::Number(number) => Self::parse_decimal(&number.to_string()),
            Value::String(text) => {
                let text = text.trim();
                let cleaned = match text.rfind(',') {
                    Some(comma) if text[comma..].contains('.') => return None,
                    Some(_) => text.replace('.', "").replace(',', "."),
                    None => text.to_string(),
                };
                Self::parse_decimal(&cleaned)
            }
            _ => None,
        }
    }

    fn parse_decimal(text: &str) -> Option<Decimal> {
        if text.is_empty() {
            return None;
        }
        Decimal::from_str_exact(text)
            .or_else(|_| Decimal::from_scientific(text))
            .ok()
    }

    /// Calendar day a stored date refers to, on the device
    pub fn parse_occurred_on(&self, value: &Value) -> Option<NaiveDate> {
        if let Value::String(text) = value {
            let text = text.trim();
            // Naive values are already local wall-clock dates
            for format in NAIVE_DATE_FORMATS {
                if let Ok(date) = NaiveDate::parse_from_str(text, format) {
                    return Some(date);
                }
            }
            for format in NAIVE_DATETIME_FORMATS {
                if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
                    return Some(datetime.date());
                }
            }
        }

        Self::parse_instant(value).map(|instant| self.zone.local_date(instant))
    }

    /// Parse a value carrying UTC semantics into an instant.
    ///
    /// Naive date-times are read as UTC here; this is only used directly for
    /// server-assigned creation timestamps.
    pub fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::String(text) => {
                let text = text.trim();
                if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
                    return Some(datetime.with_timezone(&Utc));
                }
                for format in OFFSET_DATETIME_FORMATS {
                    if let Ok(datetime) = DateTime::parse_from_str(text, format) {
                        return Some(datetime.with_timezone(&Utc));
                    }
                }
                NAIVE_DATETIME_FORMATS
                    .iter()
                    .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                    .map(|naive| naive.and_utc())
            }
            Value::Number(number) => {
                let millis = number
                    .as_i64()
                    .or_else(|| number.as_f64().map(|millis| millis as i64))?;
                DateTime::from_timestamp_millis(millis)
            }
            Value::Object(map) => {
                // Firestore Timestamp, either live ({seconds}) or exported ({_seconds})
                let seconds = map
                    .get("seconds")
                    .or_else(|| map.get("_seconds"))
                    .and_then(Value::as_i64)?;
                let nanos = map
                    .get("nanoseconds")
                    .or_else(|| map.get("_nanoseconds"))
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
            }
            _ => None,
        }
    }

    fn parse_id(raw: &RawRecord) -> Option<String> {
        raw.get_first(ID_FIELDS).and_then(Self::value_to_string)
    }

    /// Identifier-like value as text; numbers keep their JSON spelling
    pub fn value_to_string(value: &Value) -> Option<String> {
        match value {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }
}
