//! A geocoded candidate location as returned by the Open-Meteo search
//! endpoint.

use serde::{Deserialize, Serialize};

/// A candidate location produced by the geocoder, ordered by the service's
/// own relevance ranking. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    /// The matched place name (e.g. "Brisbane").
    pub name: String,
    /// Country label, if reported.
    #[serde(default)]
    pub country: Option<String>,
    /// First-level administrative region (state, province).
    #[serde(default)]
    pub admin1: Option<String>,
    /// Second-level administrative region (county, district).
    #[serde(default)]
    pub admin2: Option<String>,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Elevation above sea level in meters, if reported.
    #[serde(default)]
    pub elevation: Option<f64>,
    /// IANA timezone name, if reported.
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Place {
    /// One-line label for selection lists, with enough context to tell
    /// same-named places apart.
    pub fn label(&self) -> String {
        let admin1 = self.admin1.as_deref().unwrap_or("");
        let admin2 = self.admin2.as_deref().unwrap_or("");
        let country = self.country.as_deref().unwrap_or("");
        format!(
            "{} - {} {} ({}) [lat={}, lon={}]",
            self.name,
            admin1,
            admin2,
            country,
            self.latitude,
            self.longitude
        )
    }

    /// Elevation with the missing case mapped to sea level.
    pub fn elevation_or_zero(&self) -> f64 {
        self.elevation.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_contains_coordinates() {
        let place = Place {
            name: "Brisbane".to_string(),
            country: Some("Australia".to_string()),
            admin1: Some("Queensland".to_string()),
            admin2: None,
            latitude: -27.46794,
            longitude: 153.02809,
            elevation: Some(27.0),
            timezone: Some("Australia/Brisbane".to_string()),
        };
        let label = place.label();
        assert!(label.contains("Brisbane"));
        assert!(label.contains("Queensland"));
        assert!(label.contains("lat=-27.46794"));
    }

    #[test]
    fn missing_elevation_is_sea_level() {
        let place = Place {
            name: "Atlantis".to_string(),
            country: None,
            admin1: None,
            admin2: None,
            latitude: 0.0,
            longitude: 0.0,
            elevation: None,
            timezone: None,
        };
        assert_eq!(place.elevation_or_zero(), 0.0);
    }
}
