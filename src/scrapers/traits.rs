use crate::models::{AvailabilityRecord, WalkTarget};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Common trait for availability sources
/// The scheduler only talks to this, so tests can swap in a stub
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    /// Fetch every facility/date row for one window starting at `arrival_date`.
    ///
    /// Expected upstream failures (blocked, bad status, network) come back as
    /// an empty `Ok`; an `Err` means something unexpected happened.
    async fn fetch(
        &self,
        walk: &WalkTarget,
        arrival_date: NaiveDate,
        nights: u32,
    ) -> Result<Vec<AvailabilityRecord>>;

    /// Get the name of the upstream source
    fn source_name(&self) -> &'static str;
}
