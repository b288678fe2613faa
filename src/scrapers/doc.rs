use crate::errors::FetchError;
use crate::models::{AvailabilityRecord, WalkTarget};
use crate::scrapers::traits::AvailabilitySource;
use crate::scrapers::types::{AvailabilityQuery, AvailabilityResponse, FacilityData};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

/// DOC booking system facility search endpoint
pub const API_URL: &str =
    "https://prod-nz-rdr.recreation-management.tylerapp.com/nzrdr/rdr/search/greatwalkplacefacility";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How much of an error body is kept for the logs
const BODY_EXCERPT_CHARS: usize = 500;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36";

// The endpoint rejects anything that doesn't look like the bookings site in Chrome.
const BROWSER_HEADERS: [(&str, &str); 13] = [
    ("accept", "application/json"),
    ("accept-language", "en,en-AU;q=0.9,en-NZ;q=0.8,en-GB;q=0.7,en-US;q=0.6"),
    ("content-type", "application/json"),
    ("dnt", "1"),
    ("origin", "https://bookings.doc.govt.nz"),
    ("priority", "u=1, i"),
    ("referer", "https://bookings.doc.govt.nz/"),
    ("sec-ch-ua", r#""Chromium";v="140", "Not=A?Brand";v="24", "Google Chrome";v="140""#),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", r#""Windows""#),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "cross-site"),
];

/// Client for the DOC Great Walks availability search
pub struct DocBookingClient {
    client: Client,
    api_url: String,
}

impl DocBookingClient {
    /// Create a client against the production endpoint
    pub fn new() -> Result<Self> {
        Self::with_url(API_URL)
    }

    /// Create a client against a custom endpoint
    pub fn with_url(api_url: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in BROWSER_HEADERS {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    /// Send one search and decode the response, classifying failures
    pub async fn query(&self, query: &AvailabilityQuery) -> Result<AvailabilityResponse, FetchError> {
        debug!(url = %self.api_url, ?query, "Posting availability search");

        let response = self.client.post(&self.api_url).json(query).send().await?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(FetchError::Blocked);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status,
                body: body.chars().take(BODY_EXCERPT_CHARS).collect(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl AvailabilitySource for DocBookingClient {
    async fn fetch(
        &self,
        walk: &WalkTarget,
        arrival_date: NaiveDate,
        nights: u32,
    ) -> Result<Vec<AvailabilityRecord>> {
        let query = AvailabilityQuery::new(walk.place_id, arrival_date, nights);

        match self.query(&query).await {
            Ok(response) => {
                let facilities = response.into_facilities();
                if facilities.is_empty() {
                    info!("  No facility data returned for {} on {}", walk.name, arrival_date);
                    return Ok(Vec::new());
                }
                Ok(flatten_facilities(walk, facilities))
            }
            Err(FetchError::Blocked) => {
                warn!("  ⚠ Access denied (403) - API may be blocking automated requests");
                warn!("    This often happens when running from cloud/data center IPs");
                Ok(Vec::new())
            }
            Err(err @ FetchError::Decode(_)) => Err(err).with_context(|| {
                format!("Unreadable response for {} on {}", walk.name, arrival_date)
            }),
            Err(err) => {
                warn!(walk = %walk.name, %arrival_date, "  Error scraping {}: {}", walk.name, err);
                Ok(Vec::new())
            }
        }
    }

    fn source_name(&self) -> &'static str {
        "DOC bookings"
    }
}

/// Turn nested facility/date data into one row per facility per date
pub fn flatten_facilities(walk: &WalkTarget, facilities: Vec<FacilityData>) -> Vec<AvailabilityRecord> {
    facilities
        .into_iter()
        .flat_map(|facility| {
            let facility_name = facility.facility_name.unwrap_or_else(|| "Unknown".to_string());
            let facility_id = facility.facility_id;

            facility
                .dates
                .unwrap_or_default()
                .into_iter()
                .map(move |date| AvailabilityRecord {
                    check_timestamp: None,
                    walk_name: walk.name.clone(),
                    place_id: walk.place_id,
                    facility_name: facility_name.clone(),
                    facility_id,
                    target_date: date.arrival_date.unwrap_or_default(),
                    total_capacity: date.total_capacity.unwrap_or(0),
                    total_available: date.total_available.unwrap_or(0),
                    booking_status: date.booking_status.unwrap_or_default(),
                    price: date.price.unwrap_or(0.0),
                })
        })
        .collect()
}
