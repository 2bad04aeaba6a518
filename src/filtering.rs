use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::{col, lit, DataType, LazyFrame, TimeUnit};

pub trait ClimateFrameFilterExt {
    /// Filters a daily frame to a NaiveDate range (inclusive). Assumes a
    /// `date` column of Date type.
    fn filter_daily(self, start_date: NaiveDate, end_date: NaiveDate) -> LazyFrame;

    /// Filters an hourly frame to a datetime range (inclusive). Assumes the
    /// derived `datetime` column.
    fn filter_hourly(self, start: NaiveDateTime, end: NaiveDateTime) -> LazyFrame;
}

impl ClimateFrameFilterExt for LazyFrame {
    fn filter_daily(self, start_date: NaiveDate, end_date: NaiveDate) -> LazyFrame {
        self.filter(
            col("date")
                .cast(DataType::Date)
                .gt_eq(lit(start_date))
                .and(col("date").cast(DataType::Date).lt_eq(lit(end_date))),
        )
    }

    fn filter_hourly(self, start: NaiveDateTime, end: NaiveDateTime) -> LazyFrame {
        self.filter(
            col("datetime")
                .cast(DataType::Datetime(TimeUnit::Milliseconds, None))
                .gt_eq(lit(start))
                .and(
                    col("datetime")
                        .cast(DataType::Datetime(TimeUnit::Milliseconds, None))
                        .lt_eq(lit(end)),
                ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily_frame(dates: &[NaiveDate]) -> LazyFrame {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let days: Vec<i32> = dates.iter().map(|d| (*d - epoch).num_days() as i32).collect();
        let date = Series::new("date".into(), &days)
            .cast(&DataType::Date)
            .unwrap();
        let tavg = Series::new(
            "tavg".into(),
            (0..dates.len()).map(|i| i as f64).collect::<Vec<_>>(),
        );
        DataFrame::new(vec![date.into(), tavg.into()])
            .unwrap()
            .lazy()
    }

    #[test]
    fn daily_filter_is_inclusive() {
        let frame = daily_frame(&[
            date(2024, 1, 1),
            date(2024, 1, 15),
            date(2024, 1, 31),
            date(2024, 2, 1),
        ]);
        let filtered = frame
            .filter_daily(date(2024, 1, 1), date(2024, 1, 31))
            .collect()
            .unwrap();
        assert_eq!(filtered.height(), 3);
    }

    #[test]
    fn daily_filter_can_be_empty() {
        let frame = daily_frame(&[date(2024, 1, 1)]);
        let filtered = frame
            .filter_daily(date(2030, 1, 1), date(2030, 12, 31))
            .collect()
            .unwrap();
        assert_eq!(filtered.height(), 0);
    }
}
