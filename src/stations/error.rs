use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocateStationError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Station list download or decompression failed")]
    DownloadIo(#[from] std::io::Error),

    #[error("Failed to parse station directory JSON")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read station cache file '{0}'")]
    CacheRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode station cache file '{0}'")]
    CacheDecode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode station cache")]
    CacheEncode(#[source] Box<bincode::error::EncodeError>),

    #[error("Failed to write station cache file '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
