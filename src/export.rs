//! CSV export of a fetched observation frame.

use crate::utils::sanitize_token;
use chrono::NaiveDate;
use polars::prelude::*;

/// Serializes the frame as UTF-8 CSV with a header row. The time column is
/// already the first column of both fetch schemas.
pub fn dataframe_to_csv_bytes(df: &DataFrame) -> Result<Vec<u8>, PolarsError> {
    let mut df = df.clone();
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut df)?;
    Ok(buf)
}

/// Builds the export filename from sanitized query tokens, e.g.
/// `climascope_Australia_Brisbane_94578_2024-01-01_2024-01-31.csv`.
pub fn export_filename(
    country: &str,
    city: &str,
    station_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    format!(
        "climascope_{}_{}_{}_{}_{}.csv",
        sanitize_token(country),
        sanitize_token(city),
        sanitize_token(station_id),
        start,
        end
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_frame() -> DataFrame {
        let epoch = date(1970, 1, 1);
        let days: Vec<i32> = (0..5)
            .map(|i| (date(2024, 1, 1 + i as u32) - epoch).num_days() as i32)
            .collect();
        let date_col = Series::new("date".into(), &days)
            .cast(&DataType::Date)
            .unwrap();
        let tavg = Series::new("tavg".into(), &[25.1, 26.0, 24.3, 27.8, 25.5]);
        let prcp = Series::new("prcp".into(), &[0.0, 1.2, 0.0, 14.6, 0.4]);
        DataFrame::new(vec![date_col.into(), tavg.into(), prcp.into()]).unwrap()
    }

    #[test]
    fn filename_sanitizes_tokens() {
        let name = export_filename(
            "New Zealand",
            "Palmerston North",
            "93417",
            date(2024, 1, 1),
            date(2024, 1, 31),
        );
        assert_eq!(
            name,
            "climascope_New_Zealand_Palmerston_North_93417_2024-01-01_2024-01-31.csv"
        );
        assert!(!name.contains(' '));
    }

    #[test]
    fn csv_round_trip_preserves_rows_and_time_index() {
        let df = sample_frame();
        let bytes = dataframe_to_csv_bytes(&df).unwrap();
        assert!(std::str::from_utf8(&bytes).is_ok());

        let reparsed = CsvReadOptions::default()
            .with_has_header(true)
            .with_parse_options(CsvParseOptions::default().with_try_parse_dates(true))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .unwrap();

        assert_eq!(reparsed.height(), df.height());
        assert_eq!(
            reparsed.get_column_names(),
            df.get_column_names(),
            "column order must survive the round trip"
        );
        let original_dates = df.column("date").unwrap().as_materialized_series();
        let reparsed_dates = reparsed.column("date").unwrap().as_materialized_series();
        assert!(reparsed_dates.equals(original_dates));
    }

    #[test]
    fn header_starts_with_time_column() {
        let bytes = dataframe_to_csv_bytes(&sample_frame()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("date,"));
    }
}
