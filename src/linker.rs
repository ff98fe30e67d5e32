//! Builds the station graph from the tap map and the filtered topology rows.

use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::LinkError;
use crate::graph::{ChildKind, Station, StationGraph};
use crate::names::NameMatcher;
use crate::records::TopologyRow;
use crate::taps::TapMap;

/// Classifies each row, in order, as a tapped station, an aliased station,
/// a platform or another stop.
///
/// `rows` must list every station before its children, as
/// [`crate::topology::filter_topology`] does. A child whose parent has not
/// been created, or an alias with no tap record, fails the whole link.
#[tracing::instrument(skip_all, fields(rows = rows.len()))]
pub fn link_stations(
    taps: &TapMap,
    rows: &[TopologyRow],
    config: &PipelineConfig,
    matcher: &dyn NameMatcher,
) -> Result<StationGraph, LinkError> {
    let mut graph = StationGraph::default();

    for row in rows {
        let key = matcher.topology_key(&row.stop_name);
        if let Some(record) = taps.get(&key) {
            graph.insert_station(Station::new(&row.stop_id, &key, record));
        } else if let Some(tap_key) = matcher.alias_for(&row.stop_name) {
            let record = taps
                .get(tap_key)
                .ok_or_else(|| LinkError::MissingAliasTapRecord {
                    stop_id: row.stop_id.clone(),
                    tap_key: tap_key.to_string(),
                })?;
            debug!(stop_id = %row.stop_id, tap_key, "Linked aliased station");
            graph.insert_station(Station::new(&row.stop_id, tap_key, record));
        } else {
            let kind = if config.is_platform_name(&row.stop_name) {
                ChildKind::Platform
            } else {
                ChildKind::Stop
            };
            graph.attach_child(kind, &row.stop_id, &row.stop_name, &row.parent_station)?;
        }
    }

    info!(
        stations = graph.len(),
        platforms = graph.platform_to_station_id().len(),
        stops = graph.stop_to_station_id().len(),
        "Station graph linked"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::SuffixMatcher;
    use crate::taps::{TapCount, TapRecord};
    use std::collections::HashSet;

    #[test]
    fn test_station_with_platform_and_stop() {
        let taps = tap_map(&[("Central", "10000", "9500")]);
        let rows = vec![
            stop("10101", "Central Station", "1", ""),
            stop("10101P1", "Central Platform 1", "0", "10101"),
            stop("10101W", "Central Wharf", "0", "10101"),
        ];
        let graph = link(&taps, &rows).unwrap();

        let central = graph.station("10101").unwrap();
        assert_eq!(central.name, "Central");
        assert_eq!(central.entries, Some(TapCount::Trips(10000)));
        assert_eq!(central.exits, Some(TapCount::Trips(9500)));
        assert_eq!(central.platforms()[0].id, "10101P1");
        assert_eq!(central.platforms()[0].station_id, "10101");
        assert_eq!(central.stops()[0].id, "10101W");
        assert_eq!(graph.platform_to_station_id()["10101P1"], "10101");
        assert_eq!(graph.stop_to_station_id()["10101W"], "10101");
    }

    #[test]
    fn test_airport_aliases_use_seeded_tap_keys() {
        let taps = tap_map(&[("Domestic", "300", "310"), ("International", "400", "410")]);
        let rows = vec![
            stop("2020", "Sydney Domestic Airport Station", "1", ""),
            stop("2021", "Sydney International Airport Station", "1", ""),
        ];
        let graph = link(&taps, &rows).unwrap();

        let domestic = graph.station("2020").unwrap();
        assert_eq!(domestic.name, "Domestic");
        assert_eq!(domestic.entries, Some(TapCount::Trips(300)));
        assert_eq!(graph.station("2021").unwrap().name, "International");
    }

    #[test]
    fn test_missing_alias_seed_is_an_error() {
        let taps = tap_map(&[("Domestic", "300", "310")]);
        let rows = vec![stop("2021", "Sydney International Airport Station", "1", "")];

        assert_eq!(
            link(&taps, &rows).unwrap_err(),
            LinkError::MissingAliasTapRecord {
                stop_id: "2021".to_string(),
                tap_key: "International".to_string(),
            }
        );
    }

    #[test]
    fn test_child_before_parent_is_an_error() {
        let taps = tap_map(&[("Central", "1", "1")]);
        let rows = vec![
            stop("10101P1", "Central Platform 1", "0", "10101"),
            stop("10101", "Central Station", "1", ""),
        ];

        assert_eq!(
            link(&taps, &rows).unwrap_err(),
            LinkError::OrphanChild {
                stop_id: "10101P1".to_string(),
                parent_station_id: "10101".to_string(),
            }
        );
    }

    #[test]
    fn test_classification_is_a_partition() {
        let taps = tap_map(&[("Central", "1", "1"), ("Redfern", "2", "2")]);
        let rows = vec![
            stop("10101", "Central Station", "1", ""),
            stop("20202", "Redfern Station", "1", ""),
            stop("10101P1", "Central Platform 1", "0", "10101"),
            stop("20202P1", "Redfern Platform 1", "0", "20202"),
            stop("10101A", "Central Station, Stand A", "0", "10101"),
        ];
        let graph = link(&taps, &rows).unwrap();

        let stations: HashSet<&str> = graph.stations().iter().map(|s| s.id.as_str()).collect();
        let platforms: HashSet<&str> =
            graph.platform_to_station_id().keys().map(String::as_str).collect();
        let stops: HashSet<&str> = graph.stop_to_station_id().keys().map(String::as_str).collect();

        assert!(stations.is_disjoint(&platforms));
        assert!(stations.is_disjoint(&stops));
        assert!(platforms.is_disjoint(&stops));
        assert_eq!(stations.len() + platforms.len() + stops.len(), rows.len());
    }

    #[test]
    fn test_linking_twice_gives_same_graph() {
        let taps = tap_map(&[("Central", "1", "1")]);
        let rows = vec![
            stop("10101", "Central Station", "1", ""),
            stop("10101P1", "Central Platform 1", "0", "10101"),
            stop("10101P2", "Central Platform 2", "0", "10101"),
        ];
        assert_eq!(link(&taps, &rows).unwrap(), link(&taps, &rows).unwrap());
    }

    // Helper functions for tests
    fn link(taps: &TapMap, rows: &[TopologyRow]) -> Result<StationGraph, LinkError> {
        let config = PipelineConfig::default();
        let matcher = SuffixMatcher::new(config.aliases.clone());
        link_stations(taps, rows, &config, &matcher)
    }

    fn tap_map(stations: &[(&str, &str, &str)]) -> TapMap {
        stations
            .iter()
            .map(|&(name, entries, exits)| {
                (
                    name.to_string(),
                    TapRecord {
                        station: name.to_string(),
                        entries: TapCount::parse(entries, "Less than 50"),
                        exits: TapCount::parse(exits, "Less than 50"),
                    },
                )
            })
            .collect()
    }

    fn stop(stop_id: &str, stop_name: &str, location_type: &str, parent: &str) -> TopologyRow {
        TopologyRow {
            stop_id: stop_id.to_string(),
            stop_name: stop_name.to_string(),
            location_type: location_type.to_string(),
            parent_station: parent.to_string(),
            ..Default::default()
        }
    }
}
