//! Trip resources served by the tracking backend.
//!
//! Everything here goes through [`ApiClient::fetch_with_auth`]; the backend
//! decides what an unauthenticated request gets. Coordinates travel as
//! `"lat,lng"` strings, while route polylines are `[lng, lat]` pairs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use time::{Date, Month, OffsetDateTime};

use crate::error::ApiError;
use crate::net::api::{ApiClient, RequestOptions, TokenSource};

#[cfg(test)]
#[path = "trips_test.rs"]
mod tests;

pub const LIST_ENDPOINT: &str = "/api/tracking/list";
pub const CREATE_ENDPOINT: &str = "/api/tracking/create/";

const EARTH_RADIUS_MILES: f64 = 3958.8;
const DEFAULT_DAYS_REMAINING: i64 = 7;

// =============================================================================
// COORDINATES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Lenient form-field parse: each unparsable part becomes 0.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        let mut parts = raw.split(',').map(|p| p.trim().parse::<f64>().ok().filter(|v| v.is_finite()));
        let lat = parts.next().flatten().unwrap_or(0.0);
        let lng = parts.next().flatten().unwrap_or(0.0);
        Self { lat, lng }
    }

    /// Great-circle distance in miles.
    #[must_use]
    pub fn haversine_miles(&self, other: &Self) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_MILES * c
    }
}

impl FromStr for Coordinates {
    type Err = String;

    /// Strict parse: exactly two finite numbers.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = raw.split_once(',').ok_or_else(|| format!("expected \"lat,lng\", got {raw:?}"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("invalid coordinate {part:?}"))
        };
        Ok(Self { lat: parse(lat)?, lng: parse(lng)? })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

impl Serialize for Coordinates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Distance between two `"lat,lng"` strings; `None` if either is missing or invalid.
#[must_use]
pub fn distance_miles(pickup: Option<&str>, dropoff: Option<&str>) -> Option<f64> {
    let pickup: Coordinates = pickup?.parse().ok()?;
    let dropoff: Coordinates = dropoff?.parse().ok()?;
    Some(pickup.haversine_miles(&dropoff))
}

/// `"N miles"`, rounded to the nearest mile.
#[must_use]
pub fn format_miles(miles: f64) -> String {
    format!("{} miles", miles.round())
}

// =============================================================================
// STATUS / DATES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripStatus {
    Planned,
    InProgress,
    Completed,
    Other(String),
}

impl TripStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for TripStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "planned" => Self::Planned,
            "in-progress" => Self::InProgress,
            "completed" => Self::Completed,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl Serialize for TripStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TripStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// Whole days until `estimated_end`, rounded up, never negative.
#[must_use]
pub fn days_left(estimated_end: OffsetDateTime, now: OffsetDateTime) -> i64 {
    let days = (estimated_end - now).as_seconds_f64() / 86_400.0;
    #[allow(clippy::cast_possible_truncation)]
    let days = days.ceil() as i64;
    days.max(0)
}

/// RFC 3339 timestamp or bare `YYYY-MM-DD` (midnight UTC).
#[must_use]
pub fn parse_trip_date(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339) {
        return Some(ts);
    }
    let mut parts = raw.splitn(3, '-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = Month::try_from(parts.next()?.parse::<u8>().ok()?).ok()?;
    let day = parts.next()?.parse::<u8>().ok()?;
    Some(Date::from_calendar_date(year, month, day).ok()?.midnight().assume_utc())
}

// =============================================================================
// TRIP
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trip {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: Option<TripStatus>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pickup_location: Option<String>,
    #[serde(default)]
    pub dropoff_location: Option<String>,
    #[serde(default)]
    pub current_location: Option<String>,
    #[serde(default)]
    pub pickup_coordinates: Option<String>,
    #[serde(default)]
    pub dropoff_coordinates: Option<String>,
    #[serde(default)]
    pub current_coordinates: Option<String>,
    #[serde(default)]
    pub current_cycle_used: Option<f64>,
    #[serde(default, rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, rename = "estimatedEndDate")]
    pub estimated_end_date: Option<String>,
    #[serde(default)]
    pub route: Option<Value>,
}

impl Trip {
    #[must_use]
    pub fn distance_miles(&self) -> Option<f64> {
        distance_miles(self.pickup_coordinates.as_deref(), self.dropoff_coordinates.as_deref())
    }

    #[must_use]
    pub fn distance_label(&self) -> Option<String> {
        self.distance_miles().map(format_miles)
    }

    /// Days remaining; a missing or unreadable end date counts as a week out.
    #[must_use]
    pub fn days_left(&self, now: OffsetDateTime) -> i64 {
        match self.estimated_end_date.as_deref().and_then(parse_trip_date) {
            Some(end) => days_left(end, now),
            None => DEFAULT_DAYS_REMAINING,
        }
    }

    /// Status text for display; absent status reads "Not Specified".
    #[must_use]
    pub fn status_label(&self) -> &str {
        self.status.as_ref().map_or("Not Specified", TripStatus::as_str)
    }

    /// Countdown applies to in-progress trips and ones with no status.
    #[must_use]
    pub fn shows_countdown(&self) -> bool {
        matches!(self.status, None | Some(TripStatus::InProgress))
    }

    #[must_use]
    pub fn route_data(&self) -> Option<RouteData> {
        self.route.clone().map(RouteData::from_value)
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTrip {
    pub title: String,
    pub description: String,
    pub current_location: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub current_coordinates: Coordinates,
    pub pickup_coordinates: Coordinates,
    pub dropoff_coordinates: Coordinates,
    pub current_cycle_used: f64,
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "estimatedEndDate")]
    pub estimated_end_date: String,
}

// =============================================================================
// ROUTE
// =============================================================================

/// A named point on a route. `location` is `[lng, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stop {
    pub name: String,
    pub location: [f64; 2],
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Stop {
    #[must_use]
    pub fn lat(&self) -> f64 {
        self.location[1]
    }

    #[must_use]
    pub fn lng(&self) -> f64 {
        self.location[0]
    }
}

/// Route payload attached to a trip or saved from the planner.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteData {
    pub route_polyline: Option<Value>,
    pub stops: Option<Value>,
}

fn point(value: &Value) -> Option<[f64; 2]> {
    match value.as_array()?.as_slice() {
        [a, b, ..] => Some([a.as_f64()?, b.as_f64()?]),
        _ => None,
    }
}

impl RouteData {
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut fields) => Self {
                route_polyline: fields.remove("route_polyline"),
                stops: fields.remove("stops"),
            },
            _ => Self::default(),
        }
    }

    /// Polyline points. A string is parsed as JSON; anything malformed is empty.
    #[must_use]
    pub fn polyline(&self) -> Vec<[f64; 2]> {
        let parsed;
        let points = match &self.route_polyline {
            Some(Value::String(raw)) => {
                parsed = serde_json::from_str::<Value>(raw).unwrap_or(Value::Null);
                &parsed
            }
            Some(value) => value,
            None => return Vec::new(),
        };
        points.as_array().map(|arr| arr.iter().filter_map(point).collect()).unwrap_or_default()
    }

    /// Supplied stops, or start/end derived from the polyline when fewer
    /// than two usable stops exist.
    #[must_use]
    pub fn stops(&self) -> Vec<Stop> {
        let mut stops: Vec<Stop> = self
            .stops
            .as_ref()
            .and_then(Value::as_array)
            .map(|arr| arr.iter().enumerate().filter_map(|(i, s)| parse_stop(i, s)).collect())
            .unwrap_or_default();

        if stops.len() < 2 {
            let polyline = self.polyline();
            if let (Some(first), Some(last)) = (polyline.first(), polyline.last()) {
                if polyline.len() >= 2 || stops.is_empty() {
                    stops = vec![
                        Stop { name: "Starting Point".to_owned(), location: *first, kind: None },
                        Stop { name: "Destination".to_owned(), location: *last, kind: None },
                    ];
                }
            }
        }
        stops
    }

    /// Stops strictly between the first and the last.
    #[must_use]
    pub fn waypoints(&self) -> Vec<Stop> {
        let stops = self.stops();
        if stops.len() <= 2 {
            return Vec::new();
        }
        stops[1..stops.len() - 1].to_vec()
    }
}

fn parse_stop(index: usize, value: &Value) -> Option<Stop> {
    let location = value.get("location").and_then(point).or_else(|| value.get("coordinates").and_then(point))?;
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| value.get("location").and_then(Value::as_str))
        .map_or_else(|| format!("Waypoint {}", index + 1), str::to_owned);
    let kind = value.get("type").and_then(Value::as_str).map(str::to_owned);
    Some(Stop { name, location, kind })
}

// =============================================================================
// API
// =============================================================================

/// Trips of the current user. A non-array payload yields an empty list;
/// entries that do not decode are skipped.
///
/// # Errors
///
/// Returns the fetch wrapper's error unchanged.
pub async fn list_trips<T>(api: &ApiClient, tokens: &T) -> Result<Vec<Trip>, ApiError>
where
    T: TokenSource + ?Sized,
{
    let body = api.fetch_with_auth(LIST_ENDPOINT, tokens, RequestOptions::get()).await?.into_value();
    let Value::Array(items) = body else {
        tracing::warn!("trip list payload was not an array");
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| {
            serde_json::from_value::<Trip>(item)
                .inspect_err(|e| tracing::warn!(error = %e, "skipping undecodable trip"))
                .ok()
        })
        .collect())
}

/// Create a trip. Returns the backend payload unchanged.
///
/// # Errors
///
/// Returns the fetch wrapper's error unchanged.
pub async fn create_trip<T>(api: &ApiClient, tokens: &T, trip: &NewTrip) -> Result<Value, ApiError>
where
    T: TokenSource + ?Sized,
{
    let body = serde_json::to_value(trip).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    let response = api.fetch_with_auth(CREATE_ENDPOINT, tokens, RequestOptions::post(body)).await?;
    tracing::info!(title = %trip.title, "trip created");
    Ok(response.into_value())
}
