//! Splits a walk's lookahead horizon into request windows and runs them.

use crate::config::ScrapingParams;
use crate::models::{AvailabilityRecord, WalkTarget};
use crate::scrapers::AvailabilitySource;
use chrono::{Days, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info};

/// Requests needed to cover `days_ahead`.
///
/// Always one more than the whole windows that fit, so the horizon is
/// over-covered by up to `nights_per_request - 1` days.
pub fn request_count(days_ahead: u32, nights_per_request: u32) -> u32 {
    days_ahead / nights_per_request + 1
}

/// Arrival date of each request window, `nights_per_request` days apart
pub fn window_starts(start: NaiveDate, days_ahead: u32, nights_per_request: u32) -> Vec<NaiveDate> {
    (0..request_count(days_ahead, nights_per_request))
        .filter_map(|i| start.checked_add_days(Days::new(u64::from(i) * u64::from(nights_per_request))))
        .collect()
}

/// Fetch every window of one walk's horizon starting at `start`.
///
/// With one worker the windows run in order with `request_delay` between
/// them; otherwise up to `max_workers_per_walk` run at once. A window that
/// errors or panics contributes no rows and never affects its siblings.
pub async fn cover_horizon(
    source: Arc<dyn AvailabilitySource>,
    walk: &WalkTarget,
    params: &ScrapingParams,
    start: NaiveDate,
) -> Vec<AvailabilityRecord> {
    let starts = window_starts(start, params.days_ahead, params.nights_per_request);

    info!("Scraping {} (placeId: {})", walk.name, walk.place_id);
    info!(
        "  Making {} requests to cover {} days ahead...",
        starts.len(),
        params.days_ahead
    );

    let records = if params.max_workers_per_walk <= 1 {
        run_sequential(source, walk, starts, params.nights_per_request, params.request_delay()).await
    } else {
        run_pooled(
            source,
            walk,
            starts,
            params.nights_per_request,
            params.max_workers_per_walk,
        )
        .await
    };

    info!("  Collected {} facility-date records for {}", records.len(), walk.name);
    records
}

async fn run_sequential(
    source: Arc<dyn AvailabilitySource>,
    walk: &WalkTarget,
    starts: Vec<NaiveDate>,
    nights: u32,
    delay: Duration,
) -> Vec<AvailabilityRecord> {
    let total = starts.len();
    let mut records = Vec::new();

    for (i, arrival_date) in starts.into_iter().enumerate() {
        info!("  Request {}/{}: starting from {}", i + 1, total, arrival_date);

        // Spawned so a panicking request is contained like on the pooled path
        let task = tokio::spawn(fetch_window(source.clone(), walk.clone(), arrival_date, nights));
        records.extend(absorb_join(task.await, walk));

        // Be nice to the API
        if i + 1 < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    records
}

async fn run_pooled(
    source: Arc<dyn AvailabilitySource>,
    walk: &WalkTarget,
    starts: Vec<NaiveDate>,
    nights: u32,
    max_workers: usize,
) -> Vec<AvailabilityRecord> {
    let total = starts.len();
    let semaphore = Arc::new(Semaphore::new(max_workers));
    let mut join_set = JoinSet::new();

    for (i, arrival_date) in starts.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let source = source.clone();
        let walk = walk.clone();

        join_set.spawn(async move {
            // Permit is held for the duration of the request
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return Vec::new();
            };
            info!("  Request {}/{}: starting from {}", i + 1, total, arrival_date);
            fetch_window(source, walk, arrival_date, nights).await
        });
    }

    let mut records = Vec::new();
    while let Some(result) = join_set.join_next().await {
        records.extend(absorb_join(result, walk));
    }
    records
}

async fn fetch_window(
    source: Arc<dyn AvailabilitySource>,
    walk: WalkTarget,
    arrival_date: NaiveDate,
    nights: u32,
) -> Vec<AvailabilityRecord> {
    match source.fetch(&walk, arrival_date, nights).await {
        Ok(records) => records,
        Err(err) => {
            error!(walk = %walk.name, %arrival_date, "  Error scraping {}: {:#}", walk.name, err);
            Vec::new()
        }
    }
}

fn absorb_join(result: Result<Vec<AvailabilityRecord>, JoinError>, walk: &WalkTarget) -> Vec<AvailabilityRecord> {
    result.unwrap_or_else(|err| {
        error!(walk = %walk.name, error = %err, "  Request task panicked");
        Vec::new()
    })
}
