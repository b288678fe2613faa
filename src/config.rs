//! Walk list and scraping parameters.
//!
//! Loaded once from a JSON file shaped like:
//!
//! ```json
//! {
//!   "walks": [{ "name": "Milford Track", "placeId": 873, "enabled": true }],
//!   "scraping": { "days_ahead": 365, "nights_per_request": 30 }
//! }
//! ```
//!
//! Every `scraping` field is optional and falls back to [`ScrapingParams::default`].

use crate::models::Walk;
use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub walks: Vec<Walk>,
    #[serde(default)]
    pub scraping: ScrapingParams,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrapingParams {
    /// How far ahead to cover, in days
    pub days_ahead: u32,
    /// Window length of one upstream request
    pub nights_per_request: u32,
    /// Concurrent requests within one walk
    pub max_workers_per_walk: usize,
    /// Walks scraped at the same time
    pub max_parallel_walks: usize,
    /// Pause between requests when a walk is scraped sequentially
    pub request_delay_ms: u64,
    /// Pause between walks when walks are scraped sequentially
    pub walk_delay_ms: u64,
}

impl Default for ScrapingParams {
    fn default() -> Self {
        Self {
            days_ahead: 365,
            nights_per_request: 30,
            max_workers_per_walk: 5,
            max_parallel_walks: 3,
            request_delay_ms: 1000,
            walk_delay_ms: 2000,
        }
    }
}

impl ScrapingParams {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn walk_delay(&self) -> Duration {
        Duration::from_millis(self.walk_delay_ms)
    }
}

impl Config {
    /// Read and validate the config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_json(&contents).with_context(|| format!("Invalid config file: {:?}", path))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents).context("Failed to parse config JSON")?;
        config.validated()
    }

    fn validated(mut self) -> Result<Self> {
        ensure!(
            self.scraping.nights_per_request >= 1,
            "scraping.nights_per_request must be at least 1"
        );
        // Both limits size a semaphore, which can't hold more than MAX_PERMITS
        self.scraping.max_workers_per_walk = self.scraping.max_workers_per_walk.clamp(1, Semaphore::MAX_PERMITS);
        self.scraping.max_parallel_walks = self.scraping.max_parallel_walks.clamp(1, Semaphore::MAX_PERMITS);
        Ok(self)
    }
}
