//! Device timezone handling.
//!
//! Stored dates come in with different timezone semantics depending on the
//! backend variant. Instants (UTC timestamps) must be turned into calendar days
//! using the offset of the device the user is looking at, never the server's.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, Utc};
use shared::Period;

/// Timezone used to derive local calendar days from instants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceZone {
    /// Whatever timezone the host system is configured with (DST aware)
    #[default]
    System,
    /// A fixed UTC offset, mostly for tests and explicit configuration
    Fixed(FixedOffset),
}

impl DeviceZone {
    /// Build a fixed zone from an offset in minutes east of UTC
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(DeviceZone::Fixed)
    }

    pub fn utc() -> Self {
        DeviceZone::Fixed(Utc.fix())
    }

    /// Calendar day of an instant as seen on the device
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            DeviceZone::System => instant.with_timezone(&Local).date_naive(),
            DeviceZone::Fixed(offset) => instant.with_timezone(offset).date_naive(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }

    pub fn current_period(&self) -> Period {
        Period::from_date(self.today())
    }
}
