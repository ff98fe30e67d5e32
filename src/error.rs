//! Error types for loading sources and linking the station graph.

use std::path::PathBuf;

/// Failure to read or write one of the flat input/output files.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse CSV in '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The station graph disagrees with itself. Fatal for the run.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LinkError {
    #[error("stop '{stop_id}' references missing parent station '{parent_station_id}'")]
    OrphanChild {
        stop_id: String,
        parent_station_id: String,
    },
    #[error("station row '{stop_id}' is aliased to tap key '{tap_key}' which has no tap record")]
    MissingAliasTapRecord { stop_id: String, tap_key: String },
    #[error("index entry '{stop_id}' points at station '{station_id}' which does not own it")]
    DanglingIndexEntry { stop_id: String, station_id: String },
}
