//! Nearest-station lookup over the Meteostat station directory.
//!
//! The directory is downloaded once (gzip JSON), cached on disk as bincode,
//! and loaded into an R-tree so proximity queries stay in memory.

use crate::stations::error::LocateStationError;
use crate::types::granularity::Granularity;
use crate::types::station::Station;
use async_compression::tokio::bufread::GzipDecoder;
use bincode::config::{Configuration, Fixint, LittleEndian};
use chrono::NaiveDate;
use futures_util::TryStreamExt;
use haversine::{distance, Location as HaversineLocation, Units};
use reqwest::Client;
use rstar::RTree;
use std::cmp::Ordering;
use std::io;
use std::path::Path;
use tokio::io::{AsyncReadExt, BufReader};
use tokio_util::io::StreamReader;
use tracing::{debug, info};

const DATA_URL: &str = "https://bulk.meteostat.net/v2/stations/lite.json.gz";
const BINCODE_CACHE_FILE_NAME: &str = "stations_lite.bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// A station paired with its haversine distance from the query point.
#[derive(Debug, Clone)]
pub struct StationWithDistance {
    pub station: Station,
    pub distance_km: f64,
}

#[derive(Debug, Clone)]
pub struct StationLocator {
    rtree: RTree<Station>,
}

impl StationLocator {
    pub async fn new(cache_dir: &Path) -> Result<Self, LocateStationError> {
        let cache_file = cache_dir.join(BINCODE_CACHE_FILE_NAME);

        let stations: Vec<Station> = if cache_file.exists() {
            let path_clone = cache_file.clone();
            tokio::task::spawn_blocking(move || Self::get_cached_stations(&path_clone)).await??
        } else {
            info!("Station cache not found, fetching from {}", DATA_URL);
            let stations = Self::fetch_stations().await?;
            Self::cache_stations(stations.clone(), &cache_file).await?;
            stations
        };

        let rtree = RTree::bulk_load(stations);
        Ok(StationLocator { rtree })
    }

    /// Builds a locator from an in-memory station list. Used by tests.
    pub(crate) fn from_stations(stations: Vec<Station>) -> Self {
        StationLocator {
            rtree: RTree::bulk_load(stations),
        }
    }

    fn get_cached_stations(cache_path: &Path) -> Result<Vec<Station>, LocateStationError> {
        let bytes = std::fs::read(cache_path)
            .map_err(|e| LocateStationError::CacheRead(cache_path.to_path_buf(), e))?;
        let (decoded, _) =
            bincode::serde::decode_from_slice::<Vec<Station>, _>(&bytes, BINCODE_CONFIG).map_err(
                |e| LocateStationError::CacheDecode(cache_path.to_path_buf(), Box::new(e)),
            )?;
        Ok(decoded)
    }

    async fn fetch_stations() -> Result<Vec<Station>, LocateStationError> {
        let client = Client::new();
        let response = client
            .get(DATA_URL)
            .send()
            .await
            .map_err(|e| LocateStationError::NetworkRequest(DATA_URL.to_string(), e))?;
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(if let Some(status) = e.status() {
                    LocateStationError::HttpStatus {
                        url: DATA_URL.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    LocateStationError::NetworkRequest(DATA_URL.to_string(), e)
                });
            }
        };

        let stream = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let stream_reader = StreamReader::new(stream);
        let gzip_decoder = GzipDecoder::new(BufReader::new(stream_reader));
        let mut decoder_reader = BufReader::new(gzip_decoder);
        let mut decompressed_json = Vec::with_capacity(20_000_000);
        decoder_reader.read_to_end(&mut decompressed_json).await?;

        let stations = tokio::task::spawn_blocking(move || {
            serde_json::from_slice::<Vec<Station>>(&decompressed_json)
                .map_err(LocateStationError::from)
        })
        .await??;
        info!("Parsed {} stations from the directory", stations.len());
        Ok(stations)
    }

    async fn cache_stations(
        stations: Vec<Station>,
        cache_path: &Path,
    ) -> Result<(), LocateStationError> {
        let bincode_data = tokio::task::spawn_blocking(move || {
            bincode::serde::encode_to_vec(stations, BINCODE_CONFIG)
                .map_err(|e| LocateStationError::CacheEncode(Box::new(e)))
        })
        .await??;
        tokio::fs::write(&cache_path, &bincode_data)
            .await
            .map_err(|e| LocateStationError::CacheWrite(cache_path.to_path_buf(), e))?;
        debug!(
            "Wrote station cache ({} bytes) to {}",
            bincode_data.len(),
            cache_path.display()
        );
        Ok(())
    }

    /// Finds up to `limit` stations nearest to the point, closest first.
    ///
    /// With a granularity the candidates are restricted to stations whose
    /// reported inventory covers the requested period (or reports any data
    /// at all when no period is given).
    pub fn query(
        &self,
        latitude: f64,
        longitude: f64,
        limit: usize,
        granularity: Option<Granularity>,
        period: Option<(NaiveDate, NaiveDate)>,
    ) -> Vec<StationWithDistance> {
        if limit == 0 {
            return vec![];
        }

        let query_point = [latitude, longitude];
        // The R-tree orders by squared degree distance, which can disagree
        // with haversine near the limit, so scan a few extra candidates.
        let candidate_cap = (limit * 4).max(40);

        let mut results: Vec<StationWithDistance> = self
            .rtree
            .nearest_neighbor_iter(&query_point)
            .take(candidate_cap)
            .filter(|station| Self::meets_criteria(station, granularity, period))
            .map(|station| {
                let dist_km = distance(
                    HaversineLocation {
                        latitude,
                        longitude,
                    },
                    HaversineLocation {
                        latitude: station.location.latitude,
                        longitude: station.location.longitude,
                    },
                    Units::Kilometers,
                );
                StationWithDistance {
                    station: station.to_owned(),
                    distance_km: dist_km,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(limit);
        results
    }

    fn meets_criteria(
        station: &Station,
        granularity: Option<Granularity>,
        period: Option<(NaiveDate, NaiveDate)>,
    ) -> bool {
        let Some(granularity) = granularity else {
            return true;
        };
        let coverage = station.coverage(granularity);
        match period {
            Some((start, end)) => coverage.covers(start, end),
            None => coverage.has_any(),
        }
    }
}
