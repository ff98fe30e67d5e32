//! Links station tap counts, the stop topology table and the stop times
//! schedule into per-station, per-platform records.
//!
//! Stages run in order: [`taps::aggregate_taps`], [`topology::filter_topology`],
//! [`linker::link_stations`] and [`reducer::reduce_stop_times`].

pub mod config;
pub mod error;
pub mod graph;
pub mod linker;
pub mod names;
pub mod pipeline;
pub mod records;
pub mod reducer;
pub mod report;
pub mod source;
pub mod taps;
pub mod topology;
