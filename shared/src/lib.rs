use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Suggested categories offered by the add/edit forms for outflows
pub const OUTFLOW_CATEGORIES: &[&str] = &[
    "Alimentação",
    "Transporte",
    "Saúde",
    "Lazer",
    "Entretenimento",
    "Supermercado",
    "Assinaturas",
    "Outros",
];

/// Suggested categories offered by the add/edit forms for inflows
pub const INFLOW_CATEGORIES: &[&str] = &[
    "Salário",
    "Freelance",
    "Investimentos",
    "Venda de Produtos",
    "Outros",
];

/// Category used when a stored record carries none
pub const FALLBACK_CATEGORY: &str = "Outros";

/// Direction of a financial record for balance arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Money coming in (salary, sales, ...)
    Inflow,
    /// Money going out (groceries, subscriptions, ...)
    Outflow,
}

impl EntryKind {
    /// Apply the direction of this kind to a non-negative amount
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            EntryKind::Inflow => amount,
            EntryKind::Outflow => -amount,
        }
    }

    pub fn suggested_categories(&self) -> &'static [&'static str] {
        match self {
            EntryKind::Inflow => INFLOW_CATEGORIES,
            EntryKind::Outflow => OUTFLOW_CATEGORIES,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Inflow => write!(f, "inflow"),
            EntryKind::Outflow => write!(f, "outflow"),
        }
    }
}

/// Canonical, backend-independent financial record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    /// Identifier assigned by the storage backend
    pub id: String,
    pub kind: EntryKind,
    pub category: String,
    pub description: Option<String>,
    /// Always non-negative; the sign comes from `kind`
    pub amount: Decimal,
    /// Calendar day in the device timezone (None when the stored date was unusable)
    pub occurred_on: Option<NaiveDate>,
    /// Server-side creation time, only used to break ordering ties
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub owner_id: Option<String>,
}

impl FinancialRecord {
    /// Contribution of this record to a balance
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }
}

/// A record exactly as the storage backend returned it.
///
/// Field names and encodings differ between backend variants, so the record
/// is kept as a loose JSON object until the normalizer reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub Map<String, Value>);

impl RawRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value; anything that is not an object becomes an empty record
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::new(),
        }
    }

    /// Builder-style setter, mostly useful for sources and tests
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// First non-null value among the candidate field names
    pub fn get_first(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find(|value| !value.is_null())
    }

    /// First candidate field holding a non-empty string
    pub fn get_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A (year, month) pair; month is 1-indexed (January = 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    /// Build a period, rejecting months outside 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let period = Self { year, month };
        period.is_valid().then_some(period)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Locale used for section labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    /// "Fevereiro de 2024", "01/02/2024"
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    /// "February 2024", "02/01/2024"
    #[serde(rename = "en-US")]
    EnUs,
}

/// Records of one calendar month, ready for a sectioned list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthSection {
    pub period: Period,
    pub label: String,
    /// Signed sum of the records in this section
    pub balance: Decimal,
    pub records: Vec<FinancialRecord>,
}

/// Records of one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySection {
    pub date: NaiveDate,
    pub label: String,
    pub balance: Decimal,
    pub records: Vec<FinancialRecord>,
}

/// Why a record was left out of (part of) the aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Amount missing or not numeric; record excluded entirely
    MalformedAmount,
    /// Date missing or unparseable; record excluded from grouping only
    MissingDate,
    /// Record belongs to another owner; excluded entirely
    ForeignOwner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub id: Option<String>,
    pub reason: SkipReason,
}

/// Everything the home/month screens render for one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    /// Balance over every usable record, dated or not
    pub total_balance: Decimal,
    /// Period the `period_balance` and `period_days` refer to
    pub period: Period,
    pub period_balance: Decimal,
    /// Month sections, most recent first
    pub sections: Vec<MonthSection>,
    /// Day sections of the selected period, most recent first
    pub period_days: Vec<DaySection>,
    pub skipped_count: usize,
    pub skipped: Vec<SkippedRecord>,
    /// Ids of records whose direction code was not recognized (counted as outflow)
    pub flagged: Vec<String>,
}

/// Form input for a new or edited record, as typed by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecordRequest {
    pub kind: EntryKind,
    pub category: String,
    pub description: Option<String>,
    /// Amount text, either "250,50" or "250.50"
    pub amount: String,
    /// Date text, "DD/MM/YYYY" or "YYYY-MM-DD"
    pub date: String,
}

/// A form submission that passed validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub kind: EntryKind,
    pub category: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub occurred_on: NaiveDate,
}

/// Specific validation errors for record form input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordValidationError {
    EmptyCategory,
    DescriptionTooLong(usize),
    InvalidAmount(String),
    AmountNotPositive,
    TooManyFractionDigits,
    InvalidDate(String),
}

impl fmt::Display for RecordValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordValidationError::EmptyCategory => write!(f, "Category is required"),
            RecordValidationError::DescriptionTooLong(len) => {
                write!(f, "Description is too long ({} characters, max 256)", len)
            }
            RecordValidationError::InvalidAmount(input) => write!(f, "Invalid amount: '{}'", input),
            RecordValidationError::AmountNotPositive => write!(f, "Amount must be greater than zero"),
            RecordValidationError::TooManyFractionDigits => {
                write!(f, "Amount cannot have more than 2 decimal places")
            }
            RecordValidationError::InvalidDate(input) => write!(f, "Invalid date: '{}'", input),
        }
    }
}
