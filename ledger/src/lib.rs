//! Ledger aggregation for the personal finance app.
//!
//! Takes snapshots of raw income/expense records from the hosted backend and
//! derives balances and month/day sections for display.

pub mod backend;

pub use backend::domain::{AggregationService, DeviceZone, LedgerError, LedgerResult};
pub use backend::{Backend, LedgerConfig, LedgerWatcher};
