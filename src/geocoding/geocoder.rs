//! Client for the Open-Meteo geocoding API: resolves a free-text
//! (city, country) pair to a ranked list of candidate places.

use crate::geocoding::error::GeocodingError;
use crate::geocoding::place::Place;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Geocoder {
    client: Client,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResponse {
    // The endpoint omits the field entirely when nothing matches.
    #[serde(default)]
    pub(crate) results: Vec<Place>,
}

impl Geocoder {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// The search string sent to the name-search endpoint. Empty halves
    /// leave no dangling separator.
    pub(crate) fn search_query(city: &str, country: &str) -> String {
        format!("{}, {}", city.trim(), country.trim())
            .trim()
            .trim_matches(',')
            .trim()
            .to_string()
    }

    /// Looks up candidate places for a city/country pair.
    ///
    /// An empty vector means the service found nothing; network failures and
    /// non-success statuses are errors.
    pub async fn search(
        &self,
        city: &str,
        country: &str,
        max_results: usize,
        language: &str,
    ) -> Result<Vec<Place>, GeocodingError> {
        let query = Self::search_query(city, country);
        let params = [
            ("name", query.clone()),
            ("count", max_results.to_string()),
            ("format", "json".to_string()),
            ("language", language.to_string()),
        ];

        let response = self
            .client
            .get(GEOCODING_URL)
            .query(&params)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| GeocodingError::NetworkRequest(GEOCODING_URL.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(if let Some(status) = e.status() {
                    GeocodingError::HttpStatus {
                        url: GEOCODING_URL.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    GeocodingError::NetworkRequest(GEOCODING_URL.to_string(), e)
                });
            }
        };

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodingError::Decode(query.clone(), e))?;

        debug!(
            "Geocoding '{}' returned {} candidate(s)",
            query,
            body.results.len()
        );
        Ok(body.results)
    }
}

impl Default for Geocoder {
    fn default() -> Self {
        Self::new()
    }
}
