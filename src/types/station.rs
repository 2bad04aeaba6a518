//! Data structures for Meteostat weather stations, including the inventory
//! ranges used to judge data availability and the `rstar` implementations
//! needed for spatial indexing.

use crate::types::granularity::Granularity;
use chrono::NaiveDate;
use rstar::{PointDistance, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single weather station from the Meteostat station directory.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// The unique Meteostat station identifier (e.g. "94578").
    pub id: String,
    /// ISO country code of the station (e.g. "AU").
    pub country: String,
    /// Region code (state, province), if available.
    pub region: Option<String>,
    /// IANA timezone name, if available.
    pub timezone: Option<String>,
    /// Station names keyed by language code (e.g. {"en": "Brisbane Airport"}).
    pub name: HashMap<String, String>,
    /// Geographical location of the station.
    pub location: Location,
    /// Reported availability ranges per data granularity.
    pub inventory: Inventory,
}

/// Reported data availability per [`Granularity`].
///
/// The ranges come from the station metadata; gaps may exist inside them.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Inventory {
    pub daily: DateRange,
    pub hourly: DateRange,
}

/// A date range with optional endpoints.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// True when the reported range fully contains `[start, end]`.
    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        match (self.start, self.end) {
            (Some(inv_start), Some(inv_end)) => inv_start <= start && end <= inv_end,
            _ => false,
        }
    }

    /// True when the station reports any data at all for this granularity.
    pub fn has_any(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(start), Some(end)) => write!(f, "{start} to {end}"),
            _ => write!(f, "unknown"),
        }
    }
}

/// Geographical location of a weather station.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Location {
    /// Latitude in decimal degrees, positive north.
    pub latitude: f64,
    /// Longitude in decimal degrees, positive east.
    pub longitude: f64,
    /// Elevation above sea level in meters, if available.
    pub elevation: Option<i32>,
}

impl Station {
    /// The English station name, when the directory carries one.
    pub fn english_name(&self) -> Option<&str> {
        self.name.get("en").map(String::as_str)
    }

    /// Best available display name: English, any language, or the id.
    pub fn display_name(&self) -> &str {
        self.english_name()
            .or_else(|| self.name.values().next().map(String::as_str))
            .unwrap_or(&self.id)
    }

    /// The reported availability range for the given granularity.
    pub fn coverage(&self, granularity: Granularity) -> &DateRange {
        match granularity {
            Granularity::Daily => &self.inventory.daily,
            Granularity::Hourly => &self.inventory.hourly,
        }
    }
}

impl RTreeObject for Station {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.location.latitude, self.location.longitude])
    }
}

impl PointDistance for Station {
    // Squared Euclidean distance in degrees; fine for candidate ordering,
    // the real haversine distance is computed afterwards.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.location.latitude - point[0];
        let dy = self.location.longitude - point[1];
        dx * dx + dy * dy
    }
}
