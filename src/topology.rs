//! Narrows the stop reference table to tap-instrumented stations and their
//! children.

use std::collections::HashSet;

use tracing::info;

use crate::config::PipelineConfig;
use crate::names::NameMatcher;
use crate::records::TopologyRow;
use crate::taps::TapMap;

/// Whether `row` is a station the tap data knows about.
pub fn is_tapped_station(
    row: &TopologyRow,
    taps: &TapMap,
    config: &PipelineConfig,
    matcher: &dyn NameMatcher,
) -> bool {
    let matches_tap_data = taps.contains_key(&matcher.topology_key(&row.stop_name))
        && row.location_type == config.station_location_type
        && !config.is_excluded_station_id(&row.stop_id);
    matches_tap_data || matcher.alias_for(&row.stop_name).is_some()
}

/// Returns the retained stations, then their platforms, then their other
/// stops, each group in table order.
///
/// Stations always precede their children, which the linker relies on.
/// With no tap data there is nothing to join and nothing is retained.
#[tracing::instrument(skip_all, fields(rows = rows.len(), taps = taps.len()))]
pub fn filter_topology(
    rows: &[TopologyRow],
    taps: &TapMap,
    config: &PipelineConfig,
    matcher: &dyn NameMatcher,
) -> Vec<TopologyRow> {
    if taps.is_empty() {
        info!("No tap data, topology not filtered");
        return Vec::new();
    }

    let stations: Vec<&TopologyRow> = rows
        .iter()
        .filter(|row| is_tapped_station(row, taps, config, matcher))
        .collect();
    let station_ids: HashSet<&str> = stations.iter().map(|row| row.stop_id.as_str()).collect();

    let is_child = |row: &&TopologyRow| {
        station_ids.contains(row.parent_station.as_str()) && !config.is_sub_record_id(&row.stop_id)
    };
    let platforms: Vec<&TopologyRow> = rows
        .iter()
        .filter(is_child)
        .filter(|row| config.is_platform_name(&row.stop_name))
        .collect();
    let stops: Vec<&TopologyRow> = rows
        .iter()
        .filter(is_child)
        .filter(|row| !config.is_platform_name(&row.stop_name))
        .collect();

    info!(
        stations = stations.len(),
        platforms = platforms.len(),
        stops = stops.len(),
        "Topology filtered"
    );

    stations
        .into_iter()
        .chain(platforms)
        .chain(stops)
        .cloned()
        .collect()
}
