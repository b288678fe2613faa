use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Request body for the Great Walk facility search
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    /// Upstream spells it "accomodation"
    #[serde(rename = "accomodation")]
    pub accommodation: String,
    pub place_id: i64,
    pub customer_classification_id: i64,
    /// Serialized as YYYY-MM-DD
    pub arrival_date: NaiveDate,
    pub nights: u32,
}

impl AvailabilityQuery {
    pub fn new(place_id: i64, arrival_date: NaiveDate, nights: u32) -> Self {
        Self {
            accommodation: String::new(),
            place_id,
            customer_classification_id: 0,
            arrival_date,
            nights,
        }
    }
}

/// Top level of the facility search response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityResponse {
    #[serde(rename = "GreatWalkFacilityData", default)]
    pub facilities: Option<Vec<FacilityData>>,
}

impl AvailabilityResponse {
    /// Facilities in the response, empty when the field is missing or null
    pub fn into_facilities(self) -> Vec<FacilityData> {
        self.facilities.unwrap_or_default()
    }
}

/// A hut or campsite along a walk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacilityData {
    #[serde(rename = "FacilityName", default, deserialize_with = "lenient")]
    pub facility_name: Option<String>,
    #[serde(rename = "FacilityId", default, deserialize_with = "lenient")]
    pub facility_id: Option<i64>,
    #[serde(rename = "GreatWalkFacilityDateData", default, deserialize_with = "lenient")]
    pub dates: Option<Vec<FacilityDateData>>,
}

/// Availability of one facility for one arrival date
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacilityDateData {
    #[serde(rename = "ArrivalDate", default, deserialize_with = "lenient")]
    pub arrival_date: Option<String>,
    #[serde(rename = "TotalCapacity", default, deserialize_with = "lenient")]
    pub total_capacity: Option<i64>,
    #[serde(rename = "TotalAvailable", default, deserialize_with = "lenient")]
    pub total_available: Option<i64>,
    #[serde(rename = "BookingStatus", default, deserialize_with = "lenient")]
    pub booking_status: Option<String>,
    #[serde(rename = "Price", default, deserialize_with = "lenient")]
    pub price: Option<f64>,
}

/// Decode a field without failing the whole response.
///
/// Numbers sent as strings (`"102.00"`) are accepted; anything else that
/// doesn't fit becomes `None` so the field falls back to its default.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match value {
        Value::String(text) => serde_json::from_value(Value::String(text.clone()))
            .ok()
            .or_else(|| serde_json::from_str(text.trim()).ok()),
        other => serde_json::from_value(other).ok(),
    };
    Ok(parsed)
}
