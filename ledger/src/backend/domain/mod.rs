//! # Domain Module
//!
//! Contains the ledger aggregation logic for the finance app.
//!
//! Everything in here is a pure computation over a snapshot of records. No
//! module reaches into storage or any ambient client; snapshots are passed in
//! as plain arguments by the caller.
//!
//! ## Module Organization
//!
//! - **record_normalizer**: Maps backend-specific raw records to `FinancialRecord`
//! - **balance_service**: Exact signed totals, overall and per period
//! - **calendar**: Month/day bucketing and section labels
//! - **aggregation_service**: The single entry point the UI calls
//! - **record_form**: Validation of add/edit form input
//! - **device_zone**: The device timezone used to turn instants into calendar days
//!
//! ## Business Rules
//!
//! - Amounts are never negative; direction comes from the record kind
//! - Records with a bad amount are skipped and counted, never fatal
//! - Records with a bad date still count toward the total balance but are
//!   left out of every period bucket
//! - Sections are ordered by their (year, month) key, most recent first

pub mod aggregation_service;
pub mod balance_service;
pub mod calendar;
pub mod device_zone;
pub mod errors;
pub mod record_form;
pub mod record_normalizer;

pub use aggregation_service::*;
pub use balance_service::*;
pub use calendar::*;
pub use device_zone::*;
pub use errors::*;
pub use record_form::*;
pub use record_normalizer::*;
