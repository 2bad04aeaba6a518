use crate::geocoding::error::GeocodingError;
use crate::stations::error::LocateStationError;
use crate::weather_data::error::WeatherDataError;
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClimascopeError {
    #[error(transparent)]
    Geocoding(#[from] GeocodingError),

    #[error(transparent)]
    LocateStation(#[from] LocateStationError),

    #[error(transparent)]
    WeatherData(#[from] WeatherDataError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution,

    #[error("Start date {start} must not be after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}
