//! Tap aggregation: one entry/exit record per normalized station name.

use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::names::NameMatcher;
use crate::records::TapRow;

/// A published tap count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapCount {
    Trips(u64),
    /// Suppressed for disclosure; carries the published label.
    BelowThreshold(String),
}

impl TapCount {
    /// Parses a `Trip` value, recognising `below_threshold_label`.
    ///
    /// Thousands separators are accepted; the count displays without them.
    pub fn parse(raw: &str, below_threshold_label: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == below_threshold_label {
            return Some(TapCount::BelowThreshold(raw.to_string()));
        }
        raw.replace(',', "").parse().ok().map(TapCount::Trips)
    }

    /// Count used for arithmetic, substituting `below_threshold_taps`.
    pub fn estimate(&self, below_threshold_taps: u64) -> u64 {
        match self {
            TapCount::Trips(n) => *n,
            TapCount::BelowThreshold(_) => below_threshold_taps,
        }
    }
}

impl fmt::Display for TapCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TapCount::Trips(n) => write!(f, "{n}"),
            TapCount::BelowThreshold(label) => f.write_str(label),
        }
    }
}

impl Serialize for TapCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Entry,
    Exit,
}

impl Direction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Entry" => Some(Direction::Entry),
            "Exit" => Some(Direction::Exit),
            _ => None,
        }
    }
}

/// Entries and exits of one station for the reporting period.
///
/// A direction with no row in the source stays `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TapRecord {
    pub station: String,
    pub entries: Option<TapCount>,
    pub exits: Option<TapCount>,
}

impl TapRecord {
    fn new(station: String) -> Self {
        Self {
            station,
            entries: None,
            exits: None,
        }
    }
}

pub type TapMap = HashMap<String, TapRecord>;

/// Folds tap rows for `period` into one record per normalized station name.
///
/// A later row for the same station and direction replaces the earlier count.
/// A row with an unknown direction or an unparseable count still registers
/// the station without touching its counts.
#[tracing::instrument(skip(rows, matcher), fields(rows = rows.len()))]
pub fn aggregate_taps(
    rows: &[TapRow],
    period: &str,
    below_threshold_label: &str,
    matcher: &dyn NameMatcher,
) -> TapMap {
    let mut stations = TapMap::new();
    let mut in_period = 0usize;

    for row in rows.iter().filter(|r| r.period.trim() == period) {
        in_period += 1;
        let name = matcher.tap_key(&row.station);
        let record = stations
            .entry(name.clone())
            .or_insert_with(|| TapRecord::new(name));

        let Some(direction) = Direction::parse(&row.direction) else {
            debug!(
                station = %row.station,
                direction = %row.direction,
                "Ignoring unknown direction"
            );
            continue;
        };
        let Some(count) = TapCount::parse(&row.trips, below_threshold_label) else {
            warn!(
                station = %row.station,
                trips = %row.trips,
                "Dropping tap count that is not a number"
            );
            continue;
        };
        match direction {
            Direction::Entry => record.entries = Some(count),
            Direction::Exit => record.exits = Some(count),
        }
    }

    info!(in_period, stations = stations.len(), "Tap rows aggregated");
    stations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::names::SuffixMatcher;

    const LABEL: &str = "Less than 50";

    #[test]
    fn test_entry_and_exit_combined() {
        let rows = vec![
            tap("Jun-25", "Central Station", "Entry", "10000"),
            tap("Jun-25", "Central Station", "Exit", "9500"),
        ];
        let taps = aggregate(&rows);

        assert_eq!(taps.len(), 1);
        let central = &taps["Central"];
        assert_eq!(central.station, "Central");
        assert_eq!(central.entries.as_ref().unwrap().to_string(), "10000");
        assert_eq!(central.exits.as_ref().unwrap().to_string(), "9500");
    }

    #[test]
    fn test_other_periods_filtered_out() {
        let rows = vec![
            tap("May-25", "Central Station", "Entry", "1"),
            tap(" Jun-25 ", "Redfern Station", "Entry", "2"),
        ];
        let taps = aggregate(&rows);

        assert!(!taps.contains_key("Central"));
        assert_eq!(taps["Redfern"].entries, Some(TapCount::Trips(2)));
    }

    #[test]
    fn test_last_write_wins_per_direction() {
        let rows = vec![
            tap("Jun-25", "Central Station", "Entry", "100"),
            tap("Jun-25", "Central Station", "Exit", "90"),
            tap("Jun-25", "Central Station", "Entry", "200"),
        ];
        let taps = aggregate(&rows);

        assert_eq!(taps["Central"].entries, Some(TapCount::Trips(200)));
        assert_eq!(taps["Central"].exits, Some(TapCount::Trips(90)));
    }

    #[test]
    fn test_station_key_keeps_case() {
        let rows = vec![
            tap("Jun-25", "Central Station", "Entry", "100"),
            tap("Jun-25", "central station", "Entry", "200"),
        ];
        let taps = aggregate(&rows);

        assert_eq!(taps.len(), 2);
        assert_eq!(taps["Central"].entries, Some(TapCount::Trips(100)));
        assert_eq!(taps["central"].entries, Some(TapCount::Trips(200)));
    }

    #[test]
    fn test_unknown_direction_sets_nothing() {
        let rows = vec![tap("Jun-25", "Central Station", "Transfer", "5")];
        let taps = aggregate(&rows);

        assert_eq!(taps["Central"].entries, None);
        assert_eq!(taps["Central"].exits, None);
    }

    #[test]
    fn test_below_threshold_kept_as_label() {
        let rows = vec![tap("Jun-25", "Tiny Station", "Exit", LABEL)];
        let taps = aggregate(&rows);

        let exits = taps["Tiny"].exits.clone().unwrap();
        assert_eq!(exits, TapCount::BelowThreshold(LABEL.to_string()));
        assert_eq!(exits.to_string(), LABEL);
        assert_eq!(exits.estimate(50), 50);
        assert_eq!(taps["Tiny"].entries, None);
    }

    #[test]
    fn test_unparseable_count_keeps_previous() {
        let rows = vec![
            tap("Jun-25", "Central Station", "Entry", "120"),
            tap("Jun-25", "Central Station", "Entry", "lots"),
        ];
        assert_eq!(aggregate(&rows)["Central"].entries, Some(TapCount::Trips(120)));
    }

    #[test]
    fn test_count_with_thousands_separator() {
        let count = TapCount::parse("1,234", LABEL).unwrap();
        assert_eq!(count, TapCount::Trips(1234));
        assert_eq!(count.to_string(), "1234");
        assert_eq!(TapCount::parse(" 10000 ", LABEL).unwrap().to_string(), "10000");
    }

    // Helper functions for tests
    fn aggregate(rows: &[TapRow]) -> TapMap {
        let matcher = SuffixMatcher::new(PipelineConfig::default().aliases);
        aggregate_taps(rows, "Jun-25", LABEL, &matcher)
    }

    fn tap(period: &str, station: &str, direction: &str, trips: &str) -> TapRow {
        TapRow {
            period: period.to_string(),
            station: station.to_string(),
            station_type: "Train station".to_string(),
            direction: direction.to_string(),
            trips: trips.to_string(),
        }
    }
}
