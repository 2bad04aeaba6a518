//! Chart rendering for a completed dashboard view. Only compiled with the
//! `charts` feature; plots open in the browser via plotly.

use crate::dashboard::view::DashboardView;
use plotlars::{BarPlot, Legend, Plot, Text, TimeSeriesPlot};

/// Renders a line chart of the selected columns over the time index.
///
/// Does nothing when the selection is empty.
pub fn render_line_chart(view: &DashboardView, columns: &[String]) {
    let Some((first, rest)) = columns.split_first() else {
        return;
    };
    let additional: Vec<&str> = rest.iter().map(String::as_str).collect();
    let title = format!(
        "{} series near {}",
        view.params.granularity, view.place.name
    );

    TimeSeriesPlot::builder()
        .data(&view.frame)
        .x(view.time_column())
        .y(first.as_str())
        .additional_series(additional)
        .plot_title(Text::from(title.as_str()))
        .legend(&Legend::new().x(0.05).y(0.9))
        .build()
        .plot();
}

/// Renders a bar chart of precipitation, shown in addition to the line
/// chart whenever `prcp` is among the selected columns.
pub fn render_precipitation_chart(view: &DashboardView) {
    BarPlot::builder()
        .data(&view.frame)
        .labels(view.time_column())
        .values("prcp")
        .plot_title(Text::from("Precipitation (prcp)"))
        .build()
        .plot();
}
