use crate::backend::storage::SourceError;
use thiserror::Error;

/// Errors the aggregation API hands back to its caller.
///
/// Per-record problems never show up here; those are skipped and counted.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid period {year}-{month}: month must be between 1 and 12")]
    InvalidPeriodArgument { year: i32, month: u32 },

    #[error("Record source error: {0}")]
    Source(#[from] SourceError),
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
