//! Row types for the three input files.
//!
//! Field names follow the file headers so `csv` can (de)serialize them
//! directly. Every field is kept as text; only the tap aggregator interprets
//! values.

use serde::{Deserialize, Serialize};

/// One row of the station entries/exits file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapRow {
    #[serde(rename = "MonthYear")]
    pub period: String,
    #[serde(rename = "Station")]
    pub station: String,
    #[serde(rename = "Station_Type", default)]
    pub station_type: String,
    #[serde(rename = "Entry_Exit")]
    pub direction: String,
    #[serde(rename = "Trip")]
    pub trips: String,
}

/// One row of the stops reference table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyRow {
    pub stop_id: String,
    #[serde(default)]
    pub stop_code: String,
    pub stop_name: String,
    #[serde(default)]
    pub stop_lat: String,
    #[serde(default)]
    pub stop_lon: String,
    #[serde(default)]
    pub location_type: String,
    #[serde(default)]
    pub parent_station: String,
    #[serde(default)]
    pub wheelchair_boarding: String,
    #[serde(default)]
    pub level_id: String,
    #[serde(default)]
    pub platform_code: String,
}

/// One row of the stop times table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub trip_id: String,
    #[serde(default)]
    pub arrival_time: String,
    #[serde(default)]
    pub departure_time: String,
    pub stop_id: String,
    #[serde(default)]
    pub stop_sequence: String,
    #[serde(default)]
    pub stop_headsign: String,
    #[serde(default)]
    pub pickup_type: String,
    #[serde(default)]
    pub drop_off_type: String,
    #[serde(default)]
    pub shape_dist_traveled: String,
    #[serde(default)]
    pub timepoint: String,
    #[serde(default)]
    pub stop_note: String,
}

impl ScheduleEvent {
    /// A bare event for a stop; remaining fields empty.
    pub fn at_stop(trip_id: &str, stop_id: &str) -> Self {
        Self {
            trip_id: trip_id.to_string(),
            stop_id: stop_id.to_string(),
            ..Default::default()
        }
    }
}
