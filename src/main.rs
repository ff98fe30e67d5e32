//! CLI entry point for the tap/stop linker.
//!
//! Provides subcommands for exporting the aggregated tap data and filtered
//! topology, cutting the stop times file down to tracked stops, and counting
//! scheduled stop events per platform and station.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tap_stop_linker::config::PipelineConfig;
use tap_stop_linker::pipeline::Pipeline;
use tap_stop_linker::report::{
    GraphReport, log_child_counts, log_station_totals, log_tap_ratios, low_tap_ratios,
    print_pretty, write_json,
};
use tap_stop_linker::source::write_rows;
use tap_stop_linker::taps::TapRecord;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "tap_stop_linker")]
#[command(about = "Pairs station tap counts with scheduled stop events", long_about = None)]
struct Cli {
    /// Station entries and exits CSV
    #[arg(
        long,
        global = true,
        default_value = "data/train-station-entries-and-exits-data_july-2025.csv"
    )]
    taps: String,

    /// Stops reference table CSV
    #[arg(long, global = true, default_value = "data/station-and-stops.csv")]
    stops: String,

    /// Optional JSON config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Reporting period to keep from the tap data (overrides the config)
    #[arg(long, global = true)]
    period: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the combined entries/exits per station for the period
    Taps {
        /// Output CSV (defaults to data/taps-<period>.csv)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Write the topology rows kept for tapped stations
    Topology {
        #[arg(short, long, default_value = "data/stations-and-stops-filtered.csv")]
        output: String,
    },
    /// Keep only stop times at tracked stations, platforms and stops
    FilterStopTimes {
        /// Full stop times file (may be .gz)
        #[arg(
            short,
            long,
            default_value = "data/full_greater_sydney_gtfs_static_0/stop_times.txt"
        )]
        input: String,

        #[arg(short, long, default_value = "data/stop-times-for-matching-stops.csv")]
        output: String,

        /// Gzip compress the output
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Count scheduled stop events per platform, stop and station
    Count {
        /// Stop times file, full or pre-filtered (may be .gz)
        #[arg(short, long, default_value = "data/stop-times-for-matching-stops.csv")]
        stop_times: String,

        /// Also report stations with fewer taps than trains stopping
        #[arg(long, default_value_t = false)]
        ratios: bool,

        /// Optional: write the counted station graph as JSON
        #[arg(long)]
        json: Option<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _log_guard = init_tracing()?;

    let cli = Cli::parse();

    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())?;
    if let Some(period) = cli.period {
        config.period = period;
    }
    let pipeline = Pipeline::new(config);

    match cli.command {
        Commands::Taps { output } => {
            let output = output.unwrap_or_else(|| default_taps_output(&pipeline.config().period));
            let taps = pipeline.load_taps(&cli.taps);

            let mut records: Vec<&TapRecord> = taps.values().collect();
            records.sort_by(|a, b| a.station.cmp(&b.station));
            let written = write_rows(&output, records, false)?;

            info!(output = %output, stations = written, "Saved combined tap data");
        }
        Commands::Topology { output } => {
            let taps = pipeline.load_taps(&cli.taps);
            let rows = pipeline.load_topology(&cli.stops, &taps);
            let written = write_rows(&output, &rows, false)?;

            info!(output = %output, rows = written, "Saved filtered stations and stops");
        }
        Commands::FilterStopTimes {
            input,
            output,
            gzip,
        } => {
            let linked = pipeline.link(&cli.taps, &cli.stops)?;
            pipeline.filter_stop_times(&linked.graph, &input, &output, gzip)?;
        }
        Commands::Count {
            stop_times,
            ratios,
            json,
        } => {
            let mut linked = pipeline.link(&cli.taps, &cli.stops)?;
            let summary = pipeline.count(&mut linked.graph, &stop_times)?;

            log_child_counts(&linked.graph);
            log_station_totals(&linked.graph);

            if ratios {
                let low = low_tap_ratios(&linked.graph, pipeline.config().below_threshold_taps);
                log_tap_ratios(&low);
            }

            let report = GraphReport::new(&pipeline.config().period, &linked.graph, summary);
            print_pretty(&report);
            if let Some(path) = json {
                write_json(&path, &report)?;
            }
        }
    }

    Ok(())
}

/// `Jun-25` becomes `data/taps-jun25.csv`.
fn default_taps_output(period: &str) -> String {
    let slug: String = period
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    format!("data/taps-{slug}.csv")
}

/// Colored stderr logging plus a JSON rolling log file.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/tap_stop_linker.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("tap_stop_linker.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(guard)
}
