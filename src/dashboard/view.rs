//! The rendered result of a completed pipeline run: the selected place and
//! station, the fetched frame, and the selection helpers the widgets need.

use crate::dashboard::pipeline::QueryParams;
use crate::error::ClimascopeError;
use crate::export::{dataframe_to_csv_bytes, export_filename};
use crate::geocoding::place::Place;
use crate::stations::locate_station::StationWithDistance;
use polars::prelude::{DataFrame, DataType};

/// Rows shown in the tabular preview.
pub const PREVIEW_ROWS: usize = 50;

/// The variables plotted by default when present, in display order.
pub const DEFAULT_PLOT_COLUMNS: [&str; 7] = ["temp", "tmin", "tmax", "prcp", "wspd", "pres", "rhum"];

/// Columns that carry the time index rather than an observation value.
const TIME_COLUMNS: [&str; 3] = ["date", "hour", "datetime"];

pub struct DashboardView {
    pub params: QueryParams,
    /// All geocoding candidates, for re-selection.
    pub places: Vec<Place>,
    /// The selected place.
    pub place: Place,
    /// All station candidates, nearest first.
    pub stations: Vec<StationWithDistance>,
    /// The selected station.
    pub selected: StationWithDistance,
    /// The fetched observation frame.
    pub frame: DataFrame,
}

impl DashboardView {
    pub(crate) fn new(
        params: QueryParams,
        places: Vec<Place>,
        place: Place,
        stations: Vec<StationWithDistance>,
        selected: StationWithDistance,
        frame: DataFrame,
    ) -> Self {
        Self {
            params,
            places,
            place,
            stations,
            selected,
            frame,
        }
    }

    /// The first rows of the frame for the tabular preview.
    pub fn preview(&self) -> DataFrame {
        self.frame.head(Some(PREVIEW_ROWS))
    }

    /// Numeric observation columns available for plotting, excluding the
    /// time index columns.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.frame
            .get_columns()
            .iter()
            .filter(|c| {
                let name = c.name().as_str();
                !TIME_COLUMNS.contains(&name) && is_numeric(c.dtype())
            })
            .map(|c| c.name().to_string())
            .collect()
    }

    /// The default plot selection: the intersection of
    /// [`DEFAULT_PLOT_COLUMNS`] with the available numeric columns, falling
    /// back to the first two numeric columns when the intersection is empty.
    pub fn default_plot_columns(&self) -> Vec<String> {
        let numeric = self.numeric_columns();
        let defaults: Vec<String> = DEFAULT_PLOT_COLUMNS
            .iter()
            .filter(|c| numeric.iter().any(|n| n == *c))
            .map(|c| c.to_string())
            .collect();
        if defaults.is_empty() {
            numeric.into_iter().take(2).collect()
        } else {
            defaults
        }
    }

    /// The column holding the frame's time index.
    pub fn time_column(&self) -> &'static str {
        self.params.granularity.time_column()
    }

    /// The frame serialized as a UTF-8 CSV download.
    pub fn csv_bytes(&self) -> Result<Vec<u8>, ClimascopeError> {
        dataframe_to_csv_bytes(&self.frame)
            .map_err(crate::weather_data::error::WeatherDataError::from)
            .map_err(ClimascopeError::from)
    }

    /// The sanitized filename for the CSV download.
    pub fn export_filename(&self) -> String {
        export_filename(
            &self.params.country,
            &self.params.city,
            &self.selected.station.id,
            self.params.start,
            self.params.end,
        )
    }
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}
