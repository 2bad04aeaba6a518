//! The main entry point for querying climate history: geocode a city,
//! find nearby stations, and fetch daily or hourly observation series.
//! Every remote operation is memoized for a time window keyed by its full
//! argument tuple.

use crate::cache::TtlCache;
use crate::error::ClimascopeError;
use crate::geocoding::geocoder::Geocoder;
use crate::geocoding::place::Place;
use crate::stations::locate_station::{StationLocator, StationWithDistance};
use crate::types::granularity::Granularity;
use crate::utils::{default_cache_dir, ensure_cache_dir_exists};
use crate::weather_data::series_fetcher::SeriesFetcher;
use bon::bon;
use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use polars::prelude::DataFrame;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// A geographical coordinate: latitude first, longitude second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

/// Geocoding results stay valid for an hour.
pub const GEOCODE_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
/// Station lookups stay valid for an hour.
pub const STATION_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Candidate places requested from the geocoder by default.
pub const DEFAULT_GEOCODE_RESULTS: usize = 10;
/// Nearby stations returned by default.
pub const DEFAULT_STATION_LIMIT: usize = 10;

type GeocodeKey = (String, String, usize, String);
type StationKey = (
    OrderedFloat<f64>,
    OrderedFloat<f64>,
    OrderedFloat<f64>,
    usize,
    Option<Granularity>,
    Option<(NaiveDate, NaiveDate)>,
);

/// The client struct tying the geocoder, station locator and series fetcher
/// together behind the memoization layer.
///
/// Create one with [`Climascope::new()`] (default cache directory) or
/// [`Climascope::with_cache_folder()`].
pub struct Climascope {
    geocoder: Geocoder,
    station_locator: StationLocator,
    series_fetcher: SeriesFetcher,
    geocode_cache: TtlCache<GeocodeKey, Vec<Place>>,
    station_cache: TtlCache<StationKey, Vec<StationWithDistance>>,
}

#[bon]
impl Climascope {
    /// Creates a client with a specific cache directory, creating it if
    /// needed. The station directory is loaded (or downloaded) up front.
    pub async fn with_cache_folder(cache_folder: PathBuf) -> Result<Self, ClimascopeError> {
        ensure_cache_dir_exists(&cache_folder)
            .await
            .map_err(|e| ClimascopeError::CacheDirCreation(cache_folder.clone(), e))?;
        Ok(Self {
            geocoder: Geocoder::new(),
            station_locator: StationLocator::new(&cache_folder).await?,
            series_fetcher: SeriesFetcher::new(&cache_folder),
            geocode_cache: TtlCache::new(GEOCODE_CACHE_TTL),
            station_cache: TtlCache::new(STATION_CACHE_TTL),
        })
    }

    /// Creates a client using the per-user cache directory.
    pub async fn new() -> Result<Self, ClimascopeError> {
        let cache_folder = default_cache_dir().ok_or(ClimascopeError::CacheDirResolution)?;
        Self::with_cache_folder(cache_folder).await
    }

    /// Resolves a (city, country) pair to a ranked list of candidate places.
    ///
    /// An empty vector is the "no location found" condition, not an error.
    /// Results are memoized for [`GEOCODE_CACHE_TTL`].
    ///
    /// # Arguments
    ///
    /// * `.city(&str)`: **Required.**
    /// * `.country(&str)`: **Required.**
    /// * `.max_results(usize)`: Optional, defaults to 10.
    /// * `.language(&str)`: Optional, defaults to "en".
    #[builder]
    pub async fn geocode(
        &self,
        city: &str,
        country: &str,
        max_results: Option<usize>,
        language: Option<&str>,
    ) -> Result<Vec<Place>, ClimascopeError> {
        let count = max_results.unwrap_or(DEFAULT_GEOCODE_RESULTS);
        let language = language.unwrap_or("en");
        let key = (
            city.to_string(),
            country.to_string(),
            count,
            language.to_string(),
        );

        if let Some(hit) = self.geocode_cache.get(&key).await {
            debug!("Geocode cache hit for '{}, {}'", city, country);
            return Ok(hit);
        }

        let places = self.geocoder.search(city, country, count, language).await?;
        self.geocode_cache.insert(key, places.clone()).await;
        Ok(places)
    }

    /// Finds stations near a point, closest first, with distances in km.
    ///
    /// An empty vector is the "no station" condition. Results are memoized
    /// for [`STATION_CACHE_TTL`].
    ///
    /// # Arguments
    ///
    /// * `.location(LatLon)`: **Required.**
    /// * `.elevation(f64)`: Optional; carried for the memoization key, does
    ///   not affect the 2-D distance ordering.
    /// * `.station_limit(usize)`: Optional, defaults to 10.
    /// * `.granularity(Granularity)`: Optional; restricts candidates to
    ///   stations reporting data at that granularity.
    /// * `.period((NaiveDate, NaiveDate))`: Optional; with a granularity,
    ///   requires the station's inventory to cover the whole range.
    #[builder]
    pub async fn find_stations(
        &self,
        location: LatLon,
        elevation: Option<f64>,
        station_limit: Option<usize>,
        granularity: Option<Granularity>,
        period: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<StationWithDistance>, ClimascopeError> {
        let limit = station_limit.unwrap_or(DEFAULT_STATION_LIMIT);
        let key = (
            OrderedFloat(location.0),
            OrderedFloat(location.1),
            OrderedFloat(elevation.unwrap_or(0.0)),
            limit,
            granularity,
            period,
        );

        if let Some(hit) = self.station_cache.get(&key).await {
            debug!(
                "Station cache hit for ({}, {}), limit {}",
                location.0, location.1, limit
            );
            return Ok(hit);
        }

        let stations = self
            .station_locator
            .query(location.0, location.1, limit, granularity, period);
        self.station_cache.insert(key, stations.clone()).await;
        Ok(stations)
    }

    /// Fetches the daily observation series for a station and date range.
    ///
    /// The collected frame is memoized for thirty minutes. An empty frame
    /// means the range falls outside the station's coverage.
    #[builder]
    pub async fn daily(
        &self,
        station: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame, ClimascopeError> {
        self.series_fetcher
            .fetch(station, Granularity::Daily, start, end)
            .await
            .map_err(ClimascopeError::from)
    }

    /// Fetches the hourly observation series for a station and date range.
    ///
    /// The range is expanded to full days (00:00:00 through 23:59:00) before
    /// filtering. Memoized for thirty minutes.
    #[builder]
    pub async fn hourly(
        &self,
        station: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame, ClimascopeError> {
        self.series_fetcher
            .fetch(station, Granularity::Hourly, start, end)
            .await
            .map_err(ClimascopeError::from)
    }
}
