use crate::types::granularity::Granularity;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherDataError {
    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("I/O error writing parquet cache file '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing parquet cache file '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to scan parquet cache file '{0}'")]
    ParquetScan(PathBuf, #[source] PolarsError),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Data download or decompression failed")]
    DownloadIo(#[from] std::io::Error),

    #[error("I/O error processing CSV data for station '{station}'")]
    CsvReadIo {
        station: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parsing error processing CSV data for station '{station}'")]
    CsvReadPolars {
        station: String,
        #[source]
        source: PolarsError,
    },

    #[error("CSV column count ({found}) does not match schema length ({expected}) for {granularity} data for station {station}")]
    SchemaMismatch {
        station: String,
        granularity: Granularity,
        expected: usize,
        found: usize,
    },

    #[error("Failed to rename columns for station {station}: {source}")]
    ColumnRename {
        station: String,
        #[source]
        source: PolarsError,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
