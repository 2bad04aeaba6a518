//! Defines the resolution of a requested observation series and the fixed
//! column schemas of the Meteostat bulk data files.

use std::fmt;
use std::str::FromStr;

/// The time resolution of a requested observation series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// One row per calendar day (averages, min/max, daily sums).
    Daily,
    /// One row per hour.
    Hourly,
}

impl Granularity {
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Hourly => "hourly",
        }
    }

    pub(crate) fn cache_file_prefix(&self) -> String {
        format!("{}-", self.path_segment())
    }

    /// Column names of the headerless bulk CSV files, in file order.
    pub(crate) fn schema_column_names(&self) -> Vec<&'static str> {
        match self {
            Granularity::Hourly => vec![
                "date", "hour", "temp", "dwpt", "rhum", "prcp", "snow", "wdir", "wspd", "wpgt",
                "pres", "tsun", "coco",
            ],
            Granularity::Daily => vec![
                "date", "tavg", "tmin", "tmax", "prcp", "snow", "wdir", "wspd", "wpgt", "pres",
                "tsun",
            ],
        }
    }

    /// The column holding the time index of a fetched frame. Hourly frames
    /// carry a derived `datetime` column next to the raw `date`/`hour` pair.
    pub fn time_column(&self) -> &'static str {
        match self {
            Granularity::Daily => "date",
            Granularity::Hourly => "datetime",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "d" => Ok(Granularity::Daily),
            "hourly" | "h" => Ok(Granularity::Hourly),
            other => Err(format!(
                "unknown granularity '{other}', expected 'daily' or 'hourly'"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_str() {
        assert_eq!("daily".parse::<Granularity>(), Ok(Granularity::Daily));
        assert_eq!("Hourly".parse::<Granularity>(), Ok(Granularity::Hourly));
        assert!("monthly".parse::<Granularity>().is_err());
    }

    #[test]
    fn schema_starts_with_time_columns() {
        assert_eq!(Granularity::Daily.schema_column_names()[0], "date");
        assert_eq!(
            &Granularity::Hourly.schema_column_names()[..2],
            &["date", "hour"]
        );
    }

    #[test]
    fn display_matches_path_segment() {
        assert_eq!(Granularity::Daily.to_string(), "daily");
        assert_eq!(Granularity::Hourly.to_string(), "hourly");
    }
}
