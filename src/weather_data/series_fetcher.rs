//! Fetches range-filtered observation series, memoized per argument tuple.

use crate::cache::TtlCache;
use crate::filtering::ClimateFrameFilterExt;
use crate::types::granularity::Granularity;
use crate::weather_data::data_loader::WeatherDataLoader;
use crate::weather_data::error::WeatherDataError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::DataFrame;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Collected series stay valid for half an hour before a refetch.
pub const SERIES_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

type SeriesKey = (String, Granularity, NaiveDate, NaiveDate);

pub struct SeriesFetcher {
    loader: WeatherDataLoader,
    series_cache: TtlCache<SeriesKey, DataFrame>,
}

impl SeriesFetcher {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            loader: WeatherDataLoader::new(cache_dir),
            series_cache: TtlCache::new(SERIES_CACHE_TTL),
        }
    }

    /// Returns the observation rows for a station and date range, collected
    /// into memory. May be empty when the range falls outside the station's
    /// coverage; that is not an error.
    pub async fn fetch(
        &self,
        station: &str,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame, WeatherDataError> {
        let key = (station.to_string(), granularity, start, end);
        if let Some(hit) = self.series_cache.get(&key).await {
            debug!(
                "Series cache hit for station {} ({} {} to {})",
                station, granularity, start, end
            );
            return Ok(hit);
        }

        let frame = self.loader.get_frame(granularity, station).await?;
        let filtered = match granularity {
            Granularity::Daily => frame.filter_daily(start, end),
            Granularity::Hourly => {
                let (window_start, window_end) = hourly_window(start, end);
                frame.filter_hourly(window_start, window_end)
            }
        };
        let df = filtered.collect()?;

        self.series_cache.insert(key, df.clone()).await;
        Ok(df)
    }
}

/// Expands a date range to full-day hourly bounds: D1 00:00:00 to D2 23:59:00.
pub(crate) fn hourly_window(start: NaiveDate, end: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 0).expect("23:59:00 is a valid time");
    (start.and_time(NaiveTime::MIN), end.and_time(end_of_day))
}
