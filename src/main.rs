//! Command-line dashboard: geocode a city, pick the nearest weather
//! station, fetch its climate history, preview it and write a CSV export.

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use climascope::{Climascope, DashboardFlow, FlowOutcome, Granularity, QueryParams};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Query historical climate data by city and country")]
struct Args {
    /// Country to search in.
    #[arg(long, default_value = "Australia")]
    country: String,

    /// City to search for.
    #[arg(long, default_value = "Brisbane")]
    city: String,

    /// Start of the date range (inclusive).
    #[arg(long, default_value = "2024-01-01")]
    start: NaiveDate,

    /// End of the date range (inclusive).
    #[arg(long, default_value = "2024-01-31")]
    end: NaiveDate,

    /// Data resolution: daily or hourly.
    #[arg(long, default_value = "daily")]
    granularity: Granularity,

    /// Pick a geocoding candidate other than the first.
    #[arg(long, default_value_t = 0)]
    place_index: usize,

    /// Use this station id instead of the nearest candidate.
    #[arg(long)]
    station: Option<String>,

    /// Only consider stations whose inventory covers the requested range.
    #[arg(long)]
    require_coverage: bool,

    /// Columns to plot, comma separated. Defaults to the standard subset.
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Where to write the CSV export. Defaults to a generated name in the
    /// working directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Cache directory override.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Open interactive charts in the browser.
    #[cfg(feature = "charts")]
    #[arg(long)]
    charts: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let params = QueryParams {
        country: args.country.clone(),
        city: args.city.clone(),
        start: args.start,
        end: args.end,
        granularity: args.granularity,
    };
    // An inverted range must fail before the client starts downloading.
    params.validate()?;

    let client = match args.cache_dir.clone() {
        Some(dir) => Climascope::with_cache_folder(dir).await?,
        None => Climascope::new().await?,
    };

    let mut flow = DashboardFlow::new(&client, params)
        .place_index(args.place_index)
        .require_coverage(args.require_coverage);
    if let Some(station) = &args.station {
        flow = flow.station_override(station.clone());
    }

    let view = match flow.run().await? {
        FlowOutcome::Halted(halt) => {
            println!("{halt}");
            return Ok(());
        }
        FlowOutcome::Complete(view) => view,
    };

    println!("Location");
    println!("  {}", view.place.label());
    println!(
        "{}",
        serde_json::to_string_pretty(&view.place).context("serializing place details")?
    );

    println!("\nNearby stations");
    for candidate in &view.stations {
        println!(
            "  {} - {} ({:.1} km)",
            candidate.station.id,
            candidate.station.display_name(),
            candidate.distance_km
        );
    }

    let station = &view.selected.station;
    println!(
        "\nSelected station: {} - {}",
        station.id,
        station.display_name()
    );
    println!(
        "  {} data available: {}",
        args.granularity,
        station.coverage(args.granularity)
    );

    println!("\nPreview (first rows)");
    println!("{}", view.preview());

    let selected_columns = if args.columns.is_empty() {
        view.default_plot_columns()
    } else {
        let numeric = view.numeric_columns();
        args.columns
            .iter()
            .filter(|c| numeric.contains(c))
            .cloned()
            .collect()
    };
    println!("\nAvailable variables: {}", view.numeric_columns().join(", "));
    println!("Selected variables: {}", selected_columns.join(", "));

    #[cfg(feature = "charts")]
    if args.charts {
        climascope::charts::render_line_chart(&view, &selected_columns);
        if selected_columns.iter().any(|c| c == "prcp") {
            climascope::charts::render_precipitation_chart(&view);
        }
    }

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(view.export_filename()));
    let bytes = view.csv_bytes()?;
    std::fs::write(&output, bytes)
        .with_context(|| format!("writing CSV export to {}", output.display()))?;
    println!("\nWrote CSV export to {}", output.display());

    Ok(())
}
