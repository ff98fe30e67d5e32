//! Folds the stop times stream into the station graph's counters.

use std::borrow::Borrow;
use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use crate::error::LinkError;
use crate::graph::{ChildKind, StationGraph};
use crate::records::ScheduleEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EventTarget {
    station: usize,
    kind: ChildKind,
    slot: usize,
}

/// Direct `stop_id` to child lookup, built once per graph.
#[derive(Debug, Clone, Default)]
pub struct StopEventIndex {
    targets: HashMap<String, EventTarget>,
}

impl StopEventIndex {
    /// Indexes every child of every station and checks the graph's
    /// platform and stop indexes agree with the children stations own.
    pub fn build(graph: &StationGraph) -> Result<Self, LinkError> {
        let mut targets = HashMap::new();
        for (station, s) in graph.stations().iter().enumerate() {
            for kind in [ChildKind::Platform, ChildKind::Stop] {
                for (slot, child) in s.children(kind).iter().enumerate() {
                    targets.insert(child.id.clone(), EventTarget { station, kind, slot });
                }
            }
        }

        for kind in [ChildKind::Platform, ChildKind::Stop] {
            for (stop_id, station_id) in graph.index(kind) {
                let consistent = targets.get(stop_id).is_some_and(|t| {
                    t.kind == kind && graph.station_slot(station_id) == Some(t.station)
                });
                if !consistent {
                    return Err(LinkError::DanglingIndexEntry {
                        stop_id: stop_id.clone(),
                        station_id: station_id.clone(),
                    });
                }
            }
        }

        Ok(Self { targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn kind_of(&self, stop_id: &str) -> Option<ChildKind> {
        self.targets.get(stop_id).map(|t| t.kind)
    }

    /// Counts `event` against its child and station.
    ///
    /// Returns the child kind that was counted, or `None` for a stop the
    /// graph does not track.
    pub fn apply(
        &self,
        graph: &mut StationGraph,
        event: &ScheduleEvent,
    ) -> Result<Option<ChildKind>, LinkError> {
        let Some(target) = self.targets.get(&event.stop_id) else {
            return Ok(None);
        };
        let counted = graph
            .station_at_mut(target.station)
            .is_some_and(|station| station.record_event(target.kind, target.slot));
        if !counted {
            return Err(LinkError::DanglingIndexEntry {
                stop_id: event.stop_id.clone(),
                station_id: graph
                    .index(target.kind)
                    .get(&event.stop_id)
                    .cloned()
                    .unwrap_or_default(),
            });
        }
        Ok(Some(target.kind))
    }
}

/// Totals from one pass over the stop times stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReduceSummary {
    pub events: u64,
    pub platform_events: u64,
    pub stop_events: u64,
    pub unmatched: u64,
}

/// Counts every event in `events` against the graph in a single pass.
#[tracing::instrument(skip_all, fields(stations = graph.len()))]
pub fn reduce_stop_times<I, E>(
    graph: &mut StationGraph,
    events: I,
) -> Result<ReduceSummary, LinkError>
where
    I: IntoIterator<Item = E>,
    E: Borrow<ScheduleEvent>,
{
    let index = StopEventIndex::build(graph)?;
    let mut summary = ReduceSummary::default();

    for event in events {
        summary.events += 1;
        match index.apply(graph, event.borrow())? {
            Some(ChildKind::Platform) => summary.platform_events += 1,
            Some(ChildKind::Stop) => summary.stop_events += 1,
            None => summary.unmatched += 1,
        }
    }

    info!(
        events = summary.events,
        platform_events = summary.platform_events,
        stop_events = summary.stop_events,
        unmatched = summary.unmatched,
        "Stop times reduced"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::linker::link_stations;
    use crate::names::SuffixMatcher;
    use crate::records::TopologyRow;
    use crate::taps::{TapCount, TapMap, TapRecord};

    #[test]
    fn test_platform_event_counts_platform_and_station() {
        let mut graph = graph();
        let summary =
            reduce_stop_times(&mut graph, [ScheduleEvent::at_stop("t1", "10101P1")]).unwrap();

        let central = graph.station("10101").unwrap();
        assert_eq!(central.platforms()[0].stop_event_count, 1);
        assert_eq!(central.total_platform_events(), 1);
        assert_eq!(central.total_stop_events(), 0);
        assert_eq!(summary.platform_events, 1);
    }

    #[test]
    fn test_stop_event_counts_non_platform_totals() {
        let mut graph = graph();
        let events = vec![
            ScheduleEvent::at_stop("t1", "10101W"),
            ScheduleEvent::at_stop("t2", "10101W"),
        ];
        reduce_stop_times(&mut graph, &events).unwrap();

        let central = graph.station("10101").unwrap();
        assert_eq!(central.stops()[0].stop_event_count, 2);
        assert_eq!(central.total_stop_events(), 2);
        assert_eq!(central.total_platform_events(), 0);
    }

    #[test]
    fn test_unmatched_events_change_nothing() {
        let mut graph = graph();
        let before = graph.clone();
        let events = vec![
            ScheduleEvent::at_stop("t1", "99999"),
            ScheduleEvent::at_stop("t1", "10101"),
        ];
        let summary = reduce_stop_times(&mut graph, &events).unwrap();

        assert_eq!(graph, before);
        assert_eq!(summary.unmatched, 2);
        assert_eq!(summary.events, 2);
    }

    #[test]
    fn test_totals_equal_sum_of_children() {
        let mut graph = graph();
        let stops = ["10101P1", "10101P2", "10101P2", "10101W", "nowhere", "10101P1", "10101P1"];
        let events: Vec<ScheduleEvent> =
            stops.iter().map(|s| ScheduleEvent::at_stop("t", s)).collect();
        reduce_stop_times(&mut graph, &events).unwrap();

        for station in graph.stations() {
            let platforms: u64 = station.platforms().iter().map(|p| p.stop_event_count).sum();
            let stops: u64 = station.stops().iter().map(|p| p.stop_event_count).sum();
            assert_eq!(station.total_platform_events(), platforms);
            assert_eq!(station.total_stop_events(), stops);
        }
        assert_eq!(graph.station("10101").unwrap().total_platform_events(), 5);
    }

    #[test]
    fn test_index_covers_every_child() {
        let index = StopEventIndex::build(&graph()).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.kind_of("10101P2"), Some(ChildKind::Platform));
        assert_eq!(index.kind_of("10101W"), Some(ChildKind::Stop));
        assert_eq!(index.kind_of("10101"), None);
    }

    // Helper functions for tests
    fn graph() -> StationGraph {
        let config = PipelineConfig::default();
        let matcher = SuffixMatcher::new(config.aliases.clone());
        let mut taps = TapMap::new();
        taps.insert(
            "Central".to_string(),
            TapRecord {
                station: "Central".to_string(),
                entries: Some(TapCount::Trips(10000)),
                exits: Some(TapCount::Trips(9500)),
            },
        );
        let rows = vec![
            row("10101", "Central Station", ""),
            row("10101P1", "Central Platform 1", "10101"),
            row("10101P2", "Central Platform 2", "10101"),
            row("10101W", "Central Wharf", "10101"),
        ];
        link_stations(&taps, &rows, &config, &matcher).unwrap()
    }

    fn row(stop_id: &str, stop_name: &str, parent: &str) -> TopologyRow {
        TopologyRow {
            stop_id: stop_id.to_string(),
            stop_name: stop_name.to_string(),
            location_type: if parent.is_empty() { "1" } else { "0" }.to_string(),
            parent_station: parent.to_string(),
            ..Default::default()
        }
    }
}
