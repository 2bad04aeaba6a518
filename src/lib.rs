mod cache;
mod climascope;
mod dashboard;
mod error;
mod export;
mod filtering;
mod geocoding;
mod stations;
mod types;
mod utils;
mod weather_data;

pub use error::ClimascopeError;

pub use climascope::*;

pub use dashboard::pipeline::{ClimateProvider, DashboardFlow, FlowHalt, FlowOutcome, QueryParams};
pub use dashboard::view::{DashboardView, DEFAULT_PLOT_COLUMNS, PREVIEW_ROWS};

#[cfg(feature = "charts")]
pub use dashboard::charts;

pub use cache::TtlCache;
pub use export::{dataframe_to_csv_bytes, export_filename};
pub use filtering::ClimateFrameFilterExt;

pub use geocoding::error::GeocodingError;
pub use geocoding::geocoder::Geocoder;
pub use geocoding::place::Place;

pub use stations::error::LocateStationError;
pub use stations::locate_station::{StationLocator, StationWithDistance};

pub use types::granularity::Granularity;
pub use types::station::{DateRange, Inventory, Location, Station};

pub use weather_data::error::WeatherDataError;
pub use weather_data::series_fetcher::SeriesFetcher;
