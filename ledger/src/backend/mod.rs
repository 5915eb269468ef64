//! # Ledger Backend
//!
//! Wires the domain services together from a `LedgerConfig`. Nothing in here
//! holds a global client: record sources are created by the host application
//! and handed to the services that need them.

use anyhow::Result;
use std::sync::Arc;

pub mod config;
pub mod domain;
pub mod live_ledger;
pub mod storage;

pub use config::LedgerConfig;
pub use live_ledger::LedgerWatcher;

/// Main backend struct that bundles the services
pub struct Backend {
    pub config: LedgerConfig,
    pub aggregation_service: domain::AggregationService,
    pub balance_service: domain::BalanceService,
    pub calendar_service: domain::CalendarService,
    pub record_form_service: domain::RecordFormService,
}

impl Backend {
    /// Create a new backend instance with all services
    pub fn new(config: LedgerConfig) -> Result<Self> {
        let zone = config.device_zone()?;

        Ok(Backend {
            aggregation_service: domain::AggregationService::new(zone, config.locale),
            balance_service: domain::BalanceService::new(),
            calendar_service: domain::CalendarService::new(config.locale),
            record_form_service: domain::RecordFormService::new(),
            config,
        })
    }

    /// Snapshot source for the configured data directory, if one is set
    pub fn json_source(&self) -> Option<storage::JsonFileSource> {
        self.config
            .data_directory
            .as_ref()
            .map(storage::JsonFileSource::new)
    }

    /// Live ledger for one owner over any record source
    pub fn watch<S: storage::RecordSource>(
        &self,
        source: Arc<S>,
        owner_id: &str,
    ) -> domain::LedgerResult<LedgerWatcher<S>> {
        LedgerWatcher::new(source, owner_id, self.aggregation_service)
    }
}
