use crate::errors::FetchError;
use crate::models::WalkTarget;
use crate::scrapers::types::AvailabilityQuery;
use crate::scrapers::DocBookingClient;
use chrono::NaiveDate;
use tracing::{info, warn};

/// Send a single search for one walk and log a short summary of what came back.
///
/// Returns the number of facilities, or `None` if the request failed.
pub async fn probe(
    client: &DocBookingClient,
    walk: &WalkTarget,
    arrival_date: NaiveDate,
    nights: u32,
) -> Option<usize> {
    let query = AvailabilityQuery::new(walk.place_id, arrival_date, nights);

    info!("Testing {} (placeId: {})", walk.name, walk.place_id);
    info!("Arrival date: {}", arrival_date);
    if let Ok(payload) = serde_json::to_string_pretty(&query) {
        info!("Payload: {}", payload);
    }

    let facilities = match client.query(&query).await {
        Ok(response) => response.into_facilities(),
        Err(FetchError::Status { status, body }) => {
            warn!("✗ Failed with status {}", status.as_u16());
            warn!("Response: {}", body);
            return None;
        }
        Err(FetchError::Blocked) => {
            warn!("✗ Failed with status 403 (access denied)");
            return None;
        }
        Err(err) => {
            warn!("✗ Failed: {}", err);
            return None;
        }
    };

    if facilities.is_empty() {
        warn!("⚠ No facility data returned");
        return Some(0);
    }

    info!("✓ Found {} facilities:", facilities.len());
    for facility in facilities.iter().take(3) {
        let dates = facility.dates.as_deref().unwrap_or_default();
        info!("  {}", facility.facility_name.as_deref().unwrap_or("Unknown"));
        info!("    Dates available: {}", dates.len());

        if let Some(first) = dates.first() {
            info!("    First date: {}", first.arrival_date.as_deref().unwrap_or(""));
            info!(
                "    Available: {}/{}",
                first.total_available.unwrap_or(0),
                first.total_capacity.unwrap_or(0)
            );
            info!("    Price: ${:.2}", first.price.unwrap_or(0.0));
        }
    }
    if facilities.len() > 3 {
        info!("  ... and {} more facilities", facilities.len() - 3);
    }

    Some(facilities.len())
}
