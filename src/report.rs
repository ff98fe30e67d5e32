//! Console and file reports over a counted station graph.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::graph::{Station, StationGraph};
use crate::reducer::ReduceSummary;

/// Logs the stop event count of every platform and other stop.
pub fn log_child_counts(graph: &StationGraph) {
    for station in graph.stations() {
        for platform in station.platforms() {
            info!(
                station = %station.name,
                platform_id = %platform.id,
                platform = %platform.name,
                stop_events = platform.stop_event_count,
                "Platform stop events"
            );
        }
        for stop in station.stops() {
            info!(
                station = %station.name,
                stop_id = %stop.id,
                stop = %stop.name,
                stop_events = stop.stop_event_count,
                "Stop events"
            );
        }
    }
}

/// Logs per-station totals.
pub fn log_station_totals(graph: &StationGraph) {
    for station in graph.stations() {
        info!(
            station_id = %station.id,
            station = %station.name,
            entries = %display_count(station.entries.as_ref()),
            exits = %display_count(station.exits.as_ref()),
            platform_events = station.total_platform_events(),
            stop_events = station.total_stop_events(),
            "Station totals"
        );
    }
}

fn display_count<T: ToString>(count: Option<&T>) -> String {
    count.map(ToString::to_string).unwrap_or_default()
}

/// Taps per scheduled platform stop for one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TapRatio {
    pub station_id: String,
    pub station: String,
    pub total_taps: u64,
    pub platform_events: u64,
    pub ratio: f64,
}

/// Stations with fewer taps than scheduled platform stops.
///
/// Assumes the stop times cover the same span for every station. Stations
/// with no platform events are skipped.
pub fn low_tap_ratios(graph: &StationGraph, below_threshold_taps: u64) -> Vec<TapRatio> {
    graph
        .stations()
        .iter()
        .filter(|s| s.total_platform_events() > 0)
        .map(|s| {
            let total_taps = s.total_taps(below_threshold_taps);
            TapRatio {
                station_id: s.id.clone(),
                station: s.name.clone(),
                total_taps,
                platform_events: s.total_platform_events(),
                ratio: total_taps as f64 / s.total_platform_events() as f64,
            }
        })
        .filter(|r| 0.0 < r.ratio && r.ratio < 1.0)
        .collect()
}

pub fn log_tap_ratios(ratios: &[TapRatio]) {
    for r in ratios {
        info!(
            station = %r.station,
            ratio = r.ratio,
            total_taps = r.total_taps,
            platform_events = r.platform_events,
            "Station has fewer taps than trains stopping"
        );
    }
    info!(stations = ratios.len(), "Tap ratio report complete");
}

/// Serializable snapshot of a counted graph.
#[derive(Debug, Serialize)]
pub struct GraphReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub period: &'a str,
    pub summary: ReduceSummary,
    pub stations: &'a [Station],
}

impl<'a> GraphReport<'a> {
    pub fn new(period: &'a str, graph: &'a StationGraph, summary: ReduceSummary) -> Self {
        Self {
            generated_at: Utc::now(),
            period,
            summary,
            stations: graph.stations(),
        }
    }
}

/// Logs the report using Rust's debug pretty-print format.
pub fn print_pretty(report: &GraphReport<'_>) {
    debug!("{:#?}", report);
}

/// Writes the report as pretty-printed JSON.
pub fn write_json(path: impl AsRef<Path>, report: &GraphReport<'_>) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let body = serde_json::to_string_pretty(report)?;
    std::fs::write(path, body).with_context(|| format!("failed to write '{}'", path.display()))?;
    info!(path = %path.display(), stations = report.stations.len(), "Report written");
    Ok(())
}
