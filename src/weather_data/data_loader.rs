//! Downloads and caches the per-station bulk observation files.
//!
//! Each station/granularity pair maps to one gzip CSV on the Meteostat bulk
//! endpoint. The file is parsed once with the fixed schema, written to the
//! cache directory as Parquet, and served as a `LazyFrame` from then on.

use crate::types::granularity::Granularity;
use crate::weather_data::error::WeatherDataError;
use async_compression::tokio::bufread::GzipDecoder;
use futures_util::TryStreamExt;
use polars::frame::DataFrame;
use polars::prelude::*;
use reqwest::Client;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tokio::{fs, task};
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

pub struct WeatherDataLoader {
    cache_dir: PathBuf,
    download_client: Client,
}

impl WeatherDataLoader {
    pub fn new(cache_dir: &Path) -> WeatherDataLoader {
        WeatherDataLoader {
            cache_dir: cache_dir.to_path_buf(),
            download_client: Client::new(),
        }
    }

    /// Loads the full observation frame for a station, downloading and
    /// converting it on a cache miss.
    pub async fn get_frame(
        &self,
        granularity: Granularity,
        station: &str,
    ) -> Result<LazyFrame, WeatherDataError> {
        let cache_filename = format!("{}{}.parquet", granularity.cache_file_prefix(), station);
        let parquet_path = self.cache_dir.join(&cache_filename);

        if fs::metadata(&parquet_path).await.is_ok() {
            debug!(
                "Cache hit for {} data for station {} at {:?}",
                granularity, station, parquet_path
            );
        } else {
            info!(
                "Cache miss for {} data for station {}, downloading",
                granularity, station
            );
            let raw_bytes = self.download(granularity, station).await?;
            let df = Self::csv_to_dataframe(raw_bytes, station, granularity).await?;

            fs::create_dir_all(&self.cache_dir)
                .await
                .map_err(|e| WeatherDataError::CacheDirCreation(self.cache_dir.clone(), e))?;
            Self::cache_dataframe(df, &parquet_path).await?;
            debug!(
                "Cached {} data for station {} to {:?}",
                granularity, station, parquet_path
            );
        }

        LazyFrame::scan_parquet(&parquet_path, Default::default())
            .map_err(|e| WeatherDataError::ParquetScan(parquet_path.clone(), e))
    }

    async fn download(
        &self,
        granularity: Granularity,
        station: &str,
    ) -> Result<Vec<u8>, WeatherDataError> {
        let url = format!(
            "https://bulk.meteostat.net/v2/{}/{}.csv.gz",
            granularity.path_segment(),
            station
        );
        debug!("Downloading observation data from {}", url);

        let response = self
            .download_client
            .get(&url)
            .send()
            .await
            .map_err(|e| WeatherDataError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    WeatherDataError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    WeatherDataError::NetworkRequest(url, e)
                });
            }
        };

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let stream_reader = StreamReader::new(stream);
        let mut decoder = GzipDecoder::new(stream_reader);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .await
            .map_err(WeatherDataError::DownloadIo)?;
        debug!(
            "Downloaded and decompressed {} bytes for station {}",
            decompressed.len(),
            station
        );
        Ok(decompressed)
    }

    /// Parses headerless CSV bytes into a DataFrame on a blocking task,
    /// assigning the schema column names and, for hourly data, deriving the
    /// combined `datetime` column from `date` and `hour`.
    async fn csv_to_dataframe(
        bytes: Vec<u8>,
        station: &str,
        granularity: Granularity,
    ) -> Result<DataFrame, WeatherDataError> {
        let station_owned = station.to_string();
        let schema_names = granularity.schema_column_names();

        task::spawn_blocking(move || {
            let mut temp_file = NamedTempFile::new().map_err(|e| WeatherDataError::CsvReadIo {
                station: station_owned.clone(),
                source: e,
            })?;
            temp_file
                .write_all(&bytes)
                .map_err(|e| WeatherDataError::CsvReadIo {
                    station: station_owned.clone(),
                    source: e,
                })?;
            temp_file.flush().map_err(|e| WeatherDataError::CsvReadIo {
                station: station_owned.clone(),
                source: e,
            })?;

            let mut df = CsvReadOptions::default()
                .with_has_header(false)
                .with_parse_options(CsvParseOptions::default().with_try_parse_dates(true))
                .try_into_reader_with_file_path(Some(temp_file.path().to_path_buf()))
                .map_err(|e| WeatherDataError::CsvReadPolars {
                    station: station_owned.clone(),
                    source: e,
                })?
                .finish()
                .map_err(|e| WeatherDataError::CsvReadPolars {
                    station: station_owned.clone(),
                    source: e,
                })?;

            if df.width() != schema_names.len() {
                warn!(
                    "CSV column count ({}) does not match schema length ({}) for station {} and {} data",
                    df.width(),
                    schema_names.len(),
                    station_owned,
                    granularity
                );
                return Err(WeatherDataError::SchemaMismatch {
                    station: station_owned,
                    granularity,
                    expected: schema_names.len(),
                    found: df.width(),
                });
            }

            df.set_column_names(schema_names.iter().copied())
                .map_err(|e| WeatherDataError::ColumnRename {
                    station: station_owned.clone(),
                    source: e,
                })?;

            let df = match granularity {
                Granularity::Hourly => with_datetime_column(df)?,
                Granularity::Daily => df,
            };

            Ok(df)
        })
        .await?
    }

    /// Writes a DataFrame to Parquet via spawn_blocking; the writer needs
    /// ownership of the frame.
    async fn cache_dataframe(mut df: DataFrame, path: &Path) -> Result<(), WeatherDataError> {
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let file = std::fs::File::create(&path_buf)
                .map_err(|e| WeatherDataError::ParquetWriteIo(path_buf.clone(), e))?;
            ParquetWriter::new(file)
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| WeatherDataError::ParquetWritePolars(path_buf, e))?;
            Ok::<(), WeatherDataError>(())
        })
        .await??;
        Ok(())
    }
}

/// Adds a `datetime` column computed as `date` at midnight plus `hour` hours.
fn with_datetime_column(df: DataFrame) -> Result<DataFrame, WeatherDataError> {
    let df = df
        .lazy()
        .with_column(
            (col("date")
                .cast(DataType::Datetime(TimeUnit::Milliseconds, None))
                .cast(DataType::Int64)
                + col("hour").cast(DataType::Int64) * lit(3_600_000i64))
            .cast(DataType::Datetime(TimeUnit::Milliseconds, None))
            .alias("datetime"),
        )
        .collect()?;
    Ok(df)
}
