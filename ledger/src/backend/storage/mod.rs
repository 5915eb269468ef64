//! # Storage Module
//!
//! Snapshot sources for the ledger.
//!
//! The hosted backend owns persistence, authentication and real-time sync;
//! this module only describes how the app talks to it. A `RecordSource`
//! returns full snapshots of an owner's raw records and pushes a fresh
//! snapshot to registered callbacks whenever the underlying store changes.
//!
//! ## Implementations
//!
//! - **MemoryRecordSource**: In-memory store with insert/update/delete, used
//!   by tests and local demos; can simulate an offline or signed-out backend
//! - **JsonFileSource**: Reads exported snapshots from `<dir>/<owner>.json`

pub mod json;
pub mod memory;
pub mod subscribers;
pub mod traits;

pub use json::JsonFileSource;
pub use memory::{MemoryRecordSource, SourceStatus};
pub use subscribers::{SubscriberRegistry, Subscription};
pub use traits::{RecordSource, SnapshotCallback, SourceError};
