//! Runs the horizon scrape for every enabled walk and gathers the rows.

use crate::config::ScrapingParams;
use crate::models::{AvailabilityRecord, Walk, WalkTarget};
use crate::schedule::cover_horizon;
use crate::scrapers::AvailabilitySource;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Source of "today" for a walk's first request window.
///
/// Read once per walk when its scheduling begins, so walks started at
/// different moments can anchor to different dates.
pub type Clock = fn() -> NaiveDate;

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// All rows collected in one run plus per-walk totals
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub records: Vec<AvailabilityRecord>,
    /// Row count per walk, in config order
    pub walk_counts: Vec<(String, usize)>,
}

/// Scrape every enabled walk that has a place id.
///
/// Returns `None` when no walk qualifies. Walks run one after another with
/// `walk_delay` between them when `max_parallel_walks` is 1, otherwise up to
/// that many at once, each with its own request pool.
pub async fn run_all(
    source: Arc<dyn AvailabilitySource>,
    walks: &[Walk],
    params: &ScrapingParams,
    today: Clock,
) -> Option<RunOutcome> {
    let targets: Vec<WalkTarget> = walks.iter().filter_map(Walk::target).collect();

    if targets.is_empty() {
        warn!("⚠ No walks enabled");
        return None;
    }

    info!("Enabled walks: {}", targets.len());
    for target in &targets {
        info!("  - {} (placeId: {})", target.name, target.place_id);
    }
    info!(
        "Fetching from {} with up to {} walks in parallel",
        source.source_name(),
        params.max_parallel_walks
    );

    let mut per_walk = if params.max_parallel_walks <= 1 {
        run_sequential(source, targets, params, today).await
    } else {
        run_pooled(source, targets, params, today).await
    };
    per_walk.sort_by_key(|(index, _, _)| *index);

    let mut outcome = RunOutcome::default();
    for (_, name, records) in per_walk {
        outcome.walk_counts.push((name, records.len()));
        outcome.records.extend(records);
    }
    Some(outcome)
}

type WalkResult = (usize, String, Vec<AvailabilityRecord>);

async fn run_sequential(
    source: Arc<dyn AvailabilitySource>,
    targets: Vec<WalkTarget>,
    params: &ScrapingParams,
    today: Clock,
) -> Vec<WalkResult> {
    let total = targets.len();
    let mut results = Vec::with_capacity(total);

    for (index, target) in targets.into_iter().enumerate() {
        let records = scrape_walk(source.clone(), target.clone(), params.clone(), today).await;
        results.push((index, target.name, records));

        // Be nice to the API between walks
        if index + 1 < total && !params.walk_delay().is_zero() {
            tokio::time::sleep(params.walk_delay()).await;
        }
    }

    results
}

async fn run_pooled(
    source: Arc<dyn AvailabilitySource>,
    targets: Vec<WalkTarget>,
    params: &ScrapingParams,
    today: Clock,
) -> Vec<WalkResult> {
    let semaphore = Arc::new(Semaphore::new(params.max_parallel_walks));
    let mut join_set = JoinSet::new();

    for (index, target) in targets.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let source = source.clone();
        let params = params.clone();

        join_set.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (index, target.name, Vec::new());
            };
            let records = scrape_walk(source, target.clone(), params, today).await;
            (index, target.name, records)
        });
    }

    let mut results = Vec::new();
    while let Some(result) = join_set.join_next().await {
        match result {
            Ok(walk_result) => results.push(walk_result),
            Err(err) => error!(error = %err, "Walk task panicked"),
        }
    }
    results
}

/// Scrape one walk in its own task, so a panic costs that walk its rows but
/// still leaves it in the per-walk summary.
async fn scrape_walk(
    source: Arc<dyn AvailabilitySource>,
    target: WalkTarget,
    params: ScrapingParams,
    today: Clock,
) -> Vec<AvailabilityRecord> {
    let name = target.name.clone();
    let task = tokio::spawn(async move { cover_horizon(source, &target, &params, today()).await });

    task.await.unwrap_or_else(|err| {
        error!(walk = %name, error = %err, "Walk task panicked");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{date, fast_params, StubSource};
    use std::time::Duration;
    use tokio::time::Instant;

    fn walks() -> Vec<Walk> {
        vec![
            Walk {
                name: "Milford Track".to_string(),
                place_id: Some(873),
                enabled: true,
            },
            Walk {
                name: "Routeburn Track".to_string(),
                place_id: Some(874),
                enabled: false,
            },
            Walk {
                name: "Paparoa Track".to_string(),
                place_id: None,
                enabled: true,
            },
            Walk {
                name: "Kepler Track".to_string(),
                place_id: Some(875),
                enabled: true,
            },
        ]
    }

    fn fixed_today() -> NaiveDate {
        date(2026, 10, 18)
    }

    #[tokio::test]
    async fn nothing_enabled_returns_none() {
        let source = Arc::new(StubSource::new());
        let disabled = vec![Walk {
            name: "Routeburn Track".to_string(),
            place_id: Some(874),
            enabled: false,
        }];

        let outcome = run_all(source.clone(), &disabled, &fast_params(60, 30, 1, 1), fixed_today).await;

        assert!(outcome.is_none());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn only_enabled_walks_with_place_ids_are_scraped() {
        for (workers, parallel) in [(1, 1), (5, 3)] {
            let source = Arc::new(StubSource::new());

            let outcome = run_all(source.clone(), &walks(), &fast_params(60, 30, workers, parallel), fixed_today)
                .await
                .unwrap();

            assert_eq!(outcome.records.len(), 6);
            assert_eq!(
                outcome.walk_counts,
                vec![("Milford Track".to_string(), 3), ("Kepler Track".to_string(), 3)]
            );
            let mut scraped: Vec<String> = source.calls().into_iter().map(|(name, _, _)| name).collect();
            scraped.sort();
            scraped.dedup();
            assert_eq!(scraped, vec!["Kepler Track".to_string(), "Milford Track".to_string()]);
        }
    }

    #[tokio::test]
    async fn each_walk_anchors_windows_to_clock() {
        let source = Arc::new(StubSource::new());

        run_all(source.clone(), &walks(), &fast_params(60, 30, 1, 1), fixed_today).await.unwrap();

        let kepler: Vec<NaiveDate> = source
            .calls()
            .into_iter()
            .filter(|(name, _, _)| name == "Kepler Track")
            .map(|(_, d, _)| d)
            .collect();
        assert_eq!(kepler, vec![date(2026, 10, 18), date(2026, 11, 17), date(2026, 12, 17)]);
    }

    #[tokio::test]
    async fn failing_walk_still_reports_zero() {
        let source = Arc::new(StubSource {
            fail_on: Some(date(2026, 10, 18)),
            ..StubSource::default()
        });

        let outcome = run_all(source.clone(), &walks(), &fast_params(0, 30, 2, 2), fixed_today)
            .await
            .unwrap();

        assert!(outcome.records.is_empty());
        assert_eq!(
            outcome.walk_counts,
            vec![("Milford Track".to_string(), 0), ("Kepler Track".to_string(), 0)]
        );
    }

    fn broken_clock() -> NaiveDate {
        panic!("clock unavailable")
    }

    #[tokio::test]
    async fn panicking_walk_is_reported_with_zero_rows() {
        for parallel in [1, 3] {
            let source = Arc::new(StubSource::new());

            let outcome = run_all(source.clone(), &walks(), &fast_params(60, 30, 2, parallel), broken_clock)
                .await
                .unwrap();

            assert!(outcome.records.is_empty());
            assert_eq!(
                outcome.walk_counts,
                vec![("Milford Track".to_string(), 0), ("Kepler Track".to_string(), 0)]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_walks_pause_between_walks_only() {
        let source = Arc::new(StubSource::new());
        let params = ScrapingParams {
            walk_delay_ms: 2000,
            ..fast_params(60, 30, 5, 1)
        };

        let started = Instant::now();
        let outcome = run_all(source.clone(), &walks(), &params, fixed_today).await.unwrap();

        assert_eq!(outcome.records.len(), 6);
        // Two walks, one gap, nothing after the last walk
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_walks_do_not_pause() {
        let source = Arc::new(StubSource::new());
        let params = ScrapingParams {
            request_delay_ms: 1000,
            walk_delay_ms: 2000,
            ..fast_params(60, 30, 5, 3)
        };

        let started = Instant::now();
        let outcome = run_all(source.clone(), &walks(), &params, fixed_today).await.unwrap();

        assert_eq!(outcome.records.len(), 6);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
