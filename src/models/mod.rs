use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// A monitored Great Walk as listed in the config file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Walk {
    pub name: String,
    #[serde(rename = "placeId", default)]
    pub place_id: Option<i64>,
    #[serde(default)]
    pub enabled: bool,
}

impl Walk {
    /// The walk to scrape, if it is enabled and has an upstream place id
    pub fn target(&self) -> Option<WalkTarget> {
        match (self.enabled, self.place_id) {
            (true, Some(place_id)) => Some(WalkTarget {
                name: self.name.clone(),
                place_id,
            }),
            _ => None,
        }
    }
}

/// An enabled walk resolved to its upstream place id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkTarget {
    pub name: String,
    pub place_id: i64,
}

/// One facility/date availability observation.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AvailabilityRecord {
    pub check_timestamp: Option<DateTime<Local>>,
    pub walk_name: String,
    pub place_id: i64,
    pub facility_name: String,
    pub facility_id: Option<i64>,
    pub target_date: String,
    pub total_capacity: i64,
    pub total_available: i64,
    pub booking_status: String,
    pub price: f64,
}
