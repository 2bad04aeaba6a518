//! The staged request pipeline behind the dashboard: validate parameters,
//! geocode, locate stations, fetch the series, build the view. The first
//! error or empty result halts the whole flow; there is no retry.

use crate::climascope::{Climascope, LatLon};
use crate::dashboard::view::DashboardView;
use crate::error::ClimascopeError;
use crate::geocoding::place::Place;
use crate::stations::locate_station::StationWithDistance;
use crate::types::granularity::Granularity;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use std::fmt;
use tracing::{info, warn};

/// User-supplied query parameters. Only start <= end is validated; everything
/// else is free text handed to the services.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub country: String,
    pub city: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
}

impl QueryParams {
    pub fn validate(&self) -> Result<(), ClimascopeError> {
        if self.start > self.end {
            return Err(ClimascopeError::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// The empty-result conditions that stop the flow without being errors.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowHalt {
    /// The geocoder found no candidate location for the query.
    NoPlaceFound { query: String },
    /// No station near the selected place.
    NoStationFound { place: String },
    /// The station has no observations inside the requested range.
    EmptySeries {
        station: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl fmt::Display for FlowHalt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowHalt::NoPlaceFound { query } => write!(
                f,
                "No location found for '{query}'. Check the city and country spelling and try again."
            ),
            FlowHalt::NoStationFound { place } => {
                write!(f, "No weather station found near {place}.")
            }
            FlowHalt::EmptySeries {
                station,
                start,
                end,
            } => write!(
                f,
                "Station {station} returned no observations between {start} and {end}. Try another date range."
            ),
        }
    }
}

/// The result of running the pipeline: a fully built view, or the halt that
/// stopped it.
pub enum FlowOutcome {
    Complete(Box<DashboardView>),
    Halted(FlowHalt),
}

/// The three fetch stages the pipeline drives, in stage order.
///
/// [`Climascope`] is the production implementation; the pipeline tests run
/// the stage logic over canned results instead.
#[allow(async_fn_in_trait)]
pub trait ClimateProvider {
    async fn places(&self, city: &str, country: &str) -> Result<Vec<Place>, ClimascopeError>;

    async fn stations(
        &self,
        location: LatLon,
        elevation: f64,
        granularity: Option<Granularity>,
        period: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<StationWithDistance>, ClimascopeError>;

    async fn series(
        &self,
        station: &str,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame, ClimascopeError>;
}

impl ClimateProvider for Climascope {
    async fn places(&self, city: &str, country: &str) -> Result<Vec<Place>, ClimascopeError> {
        self.geocode().city(city).country(country).call().await
    }

    async fn stations(
        &self,
        location: LatLon,
        elevation: f64,
        granularity: Option<Granularity>,
        period: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<StationWithDistance>, ClimascopeError> {
        self.find_stations()
            .location(location)
            .elevation(elevation)
            .maybe_granularity(granularity)
            .maybe_period(period)
            .call()
            .await
    }

    async fn series(
        &self,
        station: &str,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame, ClimascopeError> {
        match granularity {
            Granularity::Daily => {
                self.daily()
                    .station(station)
                    .start(start)
                    .end(end)
                    .call()
                    .await
            }
            Granularity::Hourly => {
                self.hourly()
                    .station(station)
                    .start(start)
                    .end(end)
                    .call()
                    .await
            }
        }
    }
}

/// Drives one query through the whole pipeline.
///
/// By default the first geocoding candidate and the nearest station are
/// selected; both can be overridden, mirroring the dashboard's optional
/// selection widgets.
pub struct DashboardFlow<'a, P = Climascope> {
    client: &'a P,
    params: QueryParams,
    place_index: usize,
    station_override: Option<String>,
    require_coverage: bool,
}

impl<'a, P: ClimateProvider> DashboardFlow<'a, P> {
    pub fn new(client: &'a P, params: QueryParams) -> Self {
        Self {
            client,
            params,
            place_index: 0,
            station_override: None,
            require_coverage: false,
        }
    }

    /// Selects geocoding candidate `index` instead of the first one.
    pub fn place_index(mut self, index: usize) -> Self {
        self.place_index = index;
        self
    }

    /// Overrides the automatic nearest-station choice with a station id
    /// from the candidate list.
    pub fn station_override(mut self, station_id: impl Into<String>) -> Self {
        self.station_override = Some(station_id.into());
        self
    }

    /// Restricts station candidates to those whose reported inventory covers
    /// the requested range.
    pub fn require_coverage(mut self, required: bool) -> Self {
        self.require_coverage = required;
        self
    }

    pub async fn run(self) -> Result<FlowOutcome, ClimascopeError> {
        // Validation happens before any external call.
        self.params.validate()?;
        let params = &self.params;

        let places = self.client.places(&params.city, &params.country).await?;
        if places.is_empty() {
            return Ok(FlowOutcome::Halted(FlowHalt::NoPlaceFound {
                query: format!("{}, {}", params.city, params.country),
            }));
        }

        let place = match places.get(self.place_index) {
            Some(place) => place.clone(),
            None => {
                warn!(
                    "Place index {} out of range ({} candidates), using the first",
                    self.place_index,
                    places.len()
                );
                places[0].clone()
            }
        };
        info!("Selected place: {}", place.label());

        let (granularity_filter, period_filter) = if self.require_coverage {
            (
                Some(params.granularity),
                Some((params.start, params.end)),
            )
        } else {
            (None, None)
        };
        let stations = self
            .client
            .stations(
                LatLon(place.latitude, place.longitude),
                place.elevation_or_zero(),
                granularity_filter,
                period_filter,
            )
            .await?;
        if stations.is_empty() {
            return Ok(FlowOutcome::Halted(FlowHalt::NoStationFound {
                place: place.label(),
            }));
        }

        let selected = match &self.station_override {
            Some(id) => match stations.iter().find(|s| s.station.id == *id) {
                Some(s) => s.clone(),
                None => {
                    warn!(
                        "Station override '{}' is not among the candidates, using the nearest",
                        id
                    );
                    stations[0].clone()
                }
            },
            None => stations[0].clone(),
        };
        info!(
            "Selected station {} ({}) at {:.1} km",
            selected.station.id,
            selected.station.display_name(),
            selected.distance_km
        );

        let frame = self
            .client
            .series(
                &selected.station.id,
                params.granularity,
                params.start,
                params.end,
            )
            .await?;
        if frame.height() == 0 {
            return Ok(FlowOutcome::Halted(FlowHalt::EmptySeries {
                station: selected.station.id.clone(),
                start: params.start,
                end: params.end,
            }));
        }

        Ok(FlowOutcome::Complete(Box::new(DashboardView::new(
            self.params,
            places,
            place,
            stations,
            selected,
            frame,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::station::{DateRange, Inventory, Location, Station};
    use polars::prelude::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn params(start: NaiveDate, end: NaiveDate) -> QueryParams {
        QueryParams {
            country: "Australia".to_string(),
            city: "Brisbane".to_string(),
            start,
            end,
            granularity: Granularity::Daily,
        }
    }

    fn brisbane_place() -> Place {
        Place {
            name: "Brisbane".to_string(),
            country: Some("Australia".to_string()),
            admin1: Some("Queensland".to_string()),
            admin2: None,
            latitude: -27.46794,
            longitude: 153.02809,
            elevation: Some(27.0),
            timezone: Some("Australia/Brisbane".to_string()),
        }
    }

    fn candidate(id: &str, distance_km: f64) -> StationWithDistance {
        StationWithDistance {
            station: Station {
                id: id.to_string(),
                country: "AU".to_string(),
                region: Some("QLD".to_string()),
                timezone: Some("Australia/Brisbane".to_string()),
                name: HashMap::from([("en".to_string(), format!("Station {id}"))]),
                location: Location {
                    latitude: -27.39,
                    longitude: 153.13,
                    elevation: Some(5),
                },
                inventory: Inventory {
                    daily: DateRange {
                        start: Some(date(2000, 1, 1)),
                        end: Some(date(2024, 12, 31)),
                    },
                    hourly: DateRange::default(),
                },
            },
            distance_km,
        }
    }

    fn daily_frame(rows: usize) -> DataFrame {
        let epoch = date(1970, 1, 1);
        let days: Vec<i32> = (0..rows)
            .map(|i| (date(2024, 1, 1) - epoch).num_days() as i32 + i as i32)
            .collect();
        let date_col = Series::new("date".into(), &days)
            .cast(&DataType::Date)
            .unwrap();
        let tavg = Series::new("tavg".into(), vec![25.0f64; rows]);
        DataFrame::new(vec![date_col.into(), tavg.into()]).unwrap()
    }

    /// Serves canned stage results and counts how often each stage runs.
    struct StageStub {
        place_results: Vec<Place>,
        station_results: Vec<StationWithDistance>,
        frame: DataFrame,
        place_calls: AtomicUsize,
        station_calls: AtomicUsize,
        series_calls: AtomicUsize,
    }

    impl StageStub {
        fn new(
            place_results: Vec<Place>,
            station_results: Vec<StationWithDistance>,
            frame: DataFrame,
        ) -> Self {
            Self {
                place_results,
                station_results,
                frame,
                place_calls: AtomicUsize::new(0),
                station_calls: AtomicUsize::new(0),
                series_calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> (usize, usize, usize) {
            (
                self.place_calls.load(AtomicOrdering::SeqCst),
                self.station_calls.load(AtomicOrdering::SeqCst),
                self.series_calls.load(AtomicOrdering::SeqCst),
            )
        }
    }

    impl ClimateProvider for StageStub {
        async fn places(
            &self,
            _city: &str,
            _country: &str,
        ) -> Result<Vec<Place>, ClimascopeError> {
            self.place_calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(self.place_results.clone())
        }

        async fn stations(
            &self,
            _location: LatLon,
            _elevation: f64,
            _granularity: Option<Granularity>,
            _period: Option<(NaiveDate, NaiveDate)>,
        ) -> Result<Vec<StationWithDistance>, ClimascopeError> {
            self.station_calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(self.station_results.clone())
        }

        async fn series(
            &self,
            _station: &str,
            _granularity: Granularity,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<DataFrame, ClimascopeError> {
            self.series_calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(self.frame.clone())
        }
    }

    #[test]
    fn validation_rejects_inverted_range() {
        let p = params(date(2024, 2, 1), date(2024, 1, 1));
        match p.validate() {
            Err(ClimascopeError::InvalidDateRange { start, end }) => {
                assert_eq!(start, date(2024, 2, 1));
                assert_eq!(end, date(2024, 1, 1));
            }
            other => panic!("expected InvalidDateRange, got {other:?}"),
        }
    }

    #[test]
    fn validation_accepts_single_day() {
        let p = params(date(2024, 1, 1), date(2024, 1, 1));
        assert!(p.validate().is_ok());
    }

    #[tokio::test]
    async fn inverted_range_fails_before_any_stage() {
        let stub = StageStub::new(
            vec![brisbane_place()],
            vec![candidate("94578", 12.3)],
            daily_frame(5),
        );
        let result = DashboardFlow::new(&stub, params(date(2024, 2, 1), date(2024, 1, 1)))
            .run()
            .await;
        assert!(matches!(
            result,
            Err(ClimascopeError::InvalidDateRange { .. })
        ));
        assert_eq!(stub.calls(), (0, 0, 0));
    }

    #[tokio::test]
    async fn empty_geocoding_halts_before_station_lookup() {
        let stub = StageStub::new(vec![], vec![candidate("94578", 12.3)], daily_frame(5));
        let outcome = DashboardFlow::new(&stub, params(date(2024, 1, 1), date(2024, 1, 31)))
            .run()
            .await
            .unwrap();
        match outcome {
            FlowOutcome::Halted(FlowHalt::NoPlaceFound { query }) => {
                assert_eq!(query, "Brisbane, Australia");
            }
            _ => panic!("expected NoPlaceFound halt"),
        }
        assert_eq!(stub.calls(), (1, 0, 0));
    }

    #[tokio::test]
    async fn empty_station_list_halts_before_series_fetch() {
        let stub = StageStub::new(vec![brisbane_place()], vec![], daily_frame(5));
        let outcome = DashboardFlow::new(&stub, params(date(2024, 1, 1), date(2024, 1, 31)))
            .run()
            .await
            .unwrap();
        match outcome {
            FlowOutcome::Halted(FlowHalt::NoStationFound { place }) => {
                assert!(place.contains("Brisbane"));
            }
            _ => panic!("expected NoStationFound halt"),
        }
        assert_eq!(stub.calls(), (1, 1, 0));
    }

    #[tokio::test]
    async fn empty_series_halts_with_range() {
        let stub = StageStub::new(
            vec![brisbane_place()],
            vec![candidate("94578", 12.3)],
            daily_frame(0),
        );
        let outcome = DashboardFlow::new(&stub, params(date(2024, 1, 1), date(2024, 1, 31)))
            .run()
            .await
            .unwrap();
        match outcome {
            FlowOutcome::Halted(FlowHalt::EmptySeries {
                station,
                start,
                end,
            }) => {
                assert_eq!(station, "94578");
                assert_eq!(start, date(2024, 1, 1));
                assert_eq!(end, date(2024, 1, 31));
            }
            _ => panic!("expected EmptySeries halt"),
        }
        assert_eq!(stub.calls(), (1, 1, 1));
    }

    #[tokio::test]
    async fn complete_run_selects_nearest_station() {
        let stub = StageStub::new(
            vec![brisbane_place()],
            vec![candidate("94578", 12.3), candidate("94580", 25.0)],
            daily_frame(5),
        );
        let outcome = DashboardFlow::new(&stub, params(date(2024, 1, 1), date(2024, 1, 31)))
            .run()
            .await
            .unwrap();
        match outcome {
            FlowOutcome::Complete(view) => {
                assert_eq!(view.selected.station.id, "94578");
                assert_eq!(view.frame.height(), 5);
                assert_eq!(view.stations.len(), 2);
            }
            _ => panic!("expected a complete run"),
        }
        assert_eq!(stub.calls(), (1, 1, 1));
    }

    #[tokio::test]
    async fn station_override_picks_matching_candidate() {
        let stub = StageStub::new(
            vec![brisbane_place()],
            vec![candidate("94578", 12.3), candidate("94580", 25.0)],
            daily_frame(5),
        );
        let outcome = DashboardFlow::new(&stub, params(date(2024, 1, 1), date(2024, 1, 31)))
            .station_override("94580")
            .run()
            .await
            .unwrap();
        match outcome {
            FlowOutcome::Complete(view) => assert_eq!(view.selected.station.id, "94580"),
            _ => panic!("expected a complete run"),
        }
    }

    #[test]
    fn halt_messages_name_the_failing_stage() {
        let no_place = FlowHalt::NoPlaceFound {
            query: "Xyzzy, Nowhere".to_string(),
        };
        assert!(no_place.to_string().contains("Xyzzy, Nowhere"));

        let empty = FlowHalt::EmptySeries {
            station: "94578".to_string(),
            start: date(2024, 1, 1),
            end: date(2024, 1, 31),
        };
        let message = empty.to_string();
        assert!(message.contains("94578"));
        assert!(message.contains("2024-01-01"));
    }
}
