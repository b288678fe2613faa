//! Stub availability source shared by scheduler and coordinator tests.

use crate::config::ScrapingParams;
use crate::models::{AvailabilityRecord, WalkTarget};
use crate::scrapers::AvailabilitySource;
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::subscriber::DefaultGuard;

/// Returns one row per window and remembers every call it saw
#[derive(Default)]
pub struct StubSource {
    pub calls: Mutex<Vec<(String, NaiveDate, u32)>>,
    pub fail_on: Option<NaiveDate>,
    pub panic_on: Option<NaiveDate>,
    pub latency: Duration,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, NaiveDate, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AvailabilitySource for StubSource {
    async fn fetch(
        &self,
        walk: &WalkTarget,
        arrival_date: NaiveDate,
        nights: u32,
    ) -> Result<Vec<AvailabilityRecord>> {
        self.calls
            .lock()
            .unwrap()
            .push((walk.name.clone(), arrival_date, nights));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic_on == Some(arrival_date) {
            panic!("stub panicked on {}", arrival_date);
        }
        if self.fail_on == Some(arrival_date) {
            bail!("stub failure on {}", arrival_date);
        }
        Ok(vec![record(walk, arrival_date)])
    }

    fn source_name(&self) -> &'static str {
        "stub"
    }
}

pub fn record(walk: &WalkTarget, arrival_date: NaiveDate) -> AvailabilityRecord {
    AvailabilityRecord {
        check_timestamp: None,
        walk_name: walk.name.clone(),
        place_id: walk.place_id,
        facility_name: "Test Hut".to_string(),
        facility_id: Some(1),
        target_date: arrival_date.to_string(),
        total_capacity: 20,
        total_available: 5,
        booking_status: "Available".to_string(),
        price: 50.0,
    }
}

pub fn walk(name: &str, place_id: i64) -> WalkTarget {
    WalkTarget {
        name: name.to_string(),
        place_id,
    }
}

/// Parameters with pacing turned off so tests don't sleep
pub fn fast_params(days_ahead: u32, nights: u32, workers: usize, parallel_walks: usize) -> ScrapingParams {
    ScrapingParams {
        days_ahead,
        nights_per_request: nights,
        max_workers_per_walk: workers,
        max_parallel_walks: parallel_walks,
        request_delay_ms: 0,
        walk_delay_ms: 0,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Log output collected by [`capture_logs`]
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route this thread's log output into a buffer until the guard drops
pub fn capture_logs() -> (LogCapture, DefaultGuard) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_target(false)
        .finish();
    (capture, tracing::subscriber::set_default(subscriber))
}
