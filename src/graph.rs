//! The station graph: stations owning their platforms and other stops,
//! annotated with tap totals and stop event counts.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::LinkError;
use crate::taps::{TapCount, TapRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildKind {
    Platform,
    Stop,
}

/// A platform or other stop belonging to a station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildStop {
    pub id: String,
    pub name: String,
    pub station_id: String,
    pub stop_event_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub entries: Option<TapCount>,
    pub exits: Option<TapCount>,
    platforms: Vec<ChildStop>,
    stops: Vec<ChildStop>,
    platform_event_count: u64,
    stop_event_count: u64,
}

impl Station {
    pub fn new(id: &str, name: &str, taps: &TapRecord) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            entries: taps.entries.clone(),
            exits: taps.exits.clone(),
            platforms: Vec::new(),
            stops: Vec::new(),
            platform_event_count: 0,
            stop_event_count: 0,
        }
    }

    pub fn platforms(&self) -> &[ChildStop] {
        &self.platforms
    }

    /// Children that are not platforms (bus stands, wharves, light rail stops).
    pub fn stops(&self) -> &[ChildStop] {
        &self.stops
    }

    pub fn children(&self, kind: ChildKind) -> &[ChildStop] {
        match kind {
            ChildKind::Platform => &self.platforms,
            ChildKind::Stop => &self.stops,
        }
    }

    /// Always equals the sum of the platforms' counts.
    pub fn total_platform_events(&self) -> u64 {
        self.platform_event_count
    }

    /// Always equals the sum of the other stops' counts.
    pub fn total_stop_events(&self) -> u64 {
        self.stop_event_count
    }

    /// Entries plus exits, with below-threshold counts estimated.
    pub fn total_taps(&self, below_threshold_taps: u64) -> u64 {
        [&self.entries, &self.exits]
            .into_iter()
            .flatten()
            .map(|count| count.estimate(below_threshold_taps))
            .sum()
    }

    fn push_child(&mut self, kind: ChildKind, child: ChildStop) {
        let children = match kind {
            ChildKind::Platform => &mut self.platforms,
            ChildKind::Stop => &mut self.stops,
        };
        children.push(child);
    }

    /// Counts one stop event at child `slot`, bumping the child and the
    /// station total together. Returns `false` if there is no such child.
    pub(crate) fn record_event(&mut self, kind: ChildKind, slot: usize) -> bool {
        let (children, total) = match kind {
            ChildKind::Platform => (&mut self.platforms, &mut self.platform_event_count),
            ChildKind::Stop => (&mut self.stops, &mut self.stop_event_count),
        };
        match children.get_mut(slot) {
            Some(child) => {
                child.stop_event_count += 1;
                *total += 1;
                true
            }
            None => false,
        }
    }
}

/// Stations in creation order, indexed by id, plus the child-to-station
/// indexes for platforms and other stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationGraph {
    stations: Vec<Station>,
    by_id: HashMap<String, usize>,
    platform_to_station_id: HashMap<String, String>,
    stop_to_station_id: HashMap<String, String>,
}

impl StationGraph {
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn station(&self, id: &str) -> Option<&Station> {
        self.by_id.get(id).map(|&i| &self.stations[i])
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn platform_to_station_id(&self) -> &HashMap<String, String> {
        &self.platform_to_station_id
    }

    pub fn stop_to_station_id(&self) -> &HashMap<String, String> {
        &self.stop_to_station_id
    }

    pub fn index(&self, kind: ChildKind) -> &HashMap<String, String> {
        match kind {
            ChildKind::Platform => &self.platform_to_station_id,
            ChildKind::Stop => &self.stop_to_station_id,
        }
    }

    /// Whether `stop_id` is a station, platform or stop in the graph.
    pub fn tracks(&self, stop_id: &str) -> bool {
        self.by_id.contains_key(stop_id)
            || self.platform_to_station_id.contains_key(stop_id)
            || self.stop_to_station_id.contains_key(stop_id)
    }

    /// Adds a station, replacing any earlier station with the same id.
    pub(crate) fn insert_station(&mut self, station: Station) {
        match self.by_id.get(&station.id) {
            Some(&i) => self.stations[i] = station,
            None => {
                self.by_id.insert(station.id.clone(), self.stations.len());
                self.stations.push(station);
            }
        }
    }

    /// Appends a child to its parent station and records it in the matching index.
    pub(crate) fn attach_child(
        &mut self,
        kind: ChildKind,
        stop_id: &str,
        name: &str,
        parent_station_id: &str,
    ) -> Result<(), LinkError> {
        let &slot = self
            .by_id
            .get(parent_station_id)
            .ok_or_else(|| LinkError::OrphanChild {
                stop_id: stop_id.to_string(),
                parent_station_id: parent_station_id.to_string(),
            })?;

        self.stations[slot].push_child(
            kind,
            ChildStop {
                id: stop_id.to_string(),
                name: name.to_string(),
                station_id: parent_station_id.to_string(),
                stop_event_count: 0,
            },
        );
        let index = match kind {
            ChildKind::Platform => &mut self.platform_to_station_id,
            ChildKind::Stop => &mut self.stop_to_station_id,
        };
        index.insert(stop_id.to_string(), parent_station_id.to_string());
        Ok(())
    }

    pub(crate) fn station_slot(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub(crate) fn station_at_mut(&mut self, slot: usize) -> Option<&mut Station> {
        self.stations.get_mut(slot)
    }
}
