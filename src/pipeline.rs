//! Runs the stages in order over files on disk.
//!
//! Each stage completes before the next begins. An unreadable tap or
//! topology file degrades to an empty dataset, which yields an empty graph.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::graph::StationGraph;
use crate::linker::link_stations;
use crate::names::{NameMatcher, SuffixMatcher};
use crate::records::{TapRow, TopologyRow};
use crate::reducer::{ReduceSummary, reduce_stop_times};
use crate::source::{RowWriter, ScheduleStream, load_or_empty};
use crate::taps::{TapMap, aggregate_taps};
use crate::topology::filter_topology;

/// Output of the linking stages.
#[derive(Debug)]
pub struct Linked {
    pub taps: TapMap,
    pub topology: Vec<TopologyRow>,
    pub graph: StationGraph,
}

pub struct Pipeline {
    config: PipelineConfig,
    matcher: Box<dyn NameMatcher>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let matcher = SuffixMatcher::new(config.aliases.clone());
        Self::with_matcher(config, Box::new(matcher))
    }

    /// Uses a custom station name matcher in place of [`SuffixMatcher`].
    pub fn with_matcher(config: PipelineConfig, matcher: Box<dyn NameMatcher>) -> Self {
        Self { config, matcher }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn load_taps(&self, path: impl AsRef<Path>) -> TapMap {
        let rows: Vec<TapRow> = load_or_empty(path, "taps");
        let taps = aggregate_taps(
            &rows,
            &self.config.period,
            &self.config.below_threshold_label,
            self.matcher.as_ref(),
        );
        if taps.is_empty() {
            warn!(period = %self.config.period, "No tap data for this run");
        }
        taps
    }

    pub fn load_topology(&self, path: impl AsRef<Path>, taps: &TapMap) -> Vec<TopologyRow> {
        let rows: Vec<TopologyRow> = load_or_empty(path, "topology");
        filter_topology(&rows, taps, &self.config, self.matcher.as_ref())
    }

    /// Aggregates taps, filters the topology and links the station graph.
    pub fn link(
        &self,
        taps_path: impl AsRef<Path>,
        stops_path: impl AsRef<Path>,
    ) -> Result<Linked> {
        let taps = self.load_taps(taps_path);
        let topology = self.load_topology(stops_path, &taps);
        let graph = link_stations(&taps, &topology, &self.config, self.matcher.as_ref())
            .context("station graph is inconsistent")?;
        Ok(Linked {
            taps,
            topology,
            graph,
        })
    }

    /// Streams a stop times file into the graph's counters.
    ///
    /// An unreadable file counts nothing. A file that fails part way through
    /// is an error and leaves `graph` untouched.
    pub fn count(
        &self,
        graph: &mut StationGraph,
        schedule_path: impl AsRef<Path>,
    ) -> Result<ReduceSummary> {
        let mut stream = match ScheduleStream::open(schedule_path) {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "Stop times unavailable, nothing counted");
                return Ok(ReduceSummary::default());
            }
        };

        let mut counted = graph.clone();
        let summary = reduce_stop_times(&mut counted, stream.by_ref())?;
        stream.check().context("stop times ended early, counts discarded")?;

        *graph = counted;
        Ok(summary)
    }

    /// Copies the stop times whose stop is a station, platform or stop of
    /// `graph` to `output` in the stop times schema.
    ///
    /// If the input fails part way through, no output file is left behind.
    #[tracing::instrument(
        skip_all,
        fields(input = %input.as_ref().display(), output = %output.as_ref().display())
    )]
    pub fn filter_stop_times(
        &self,
        graph: &StationGraph,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        gzip: bool,
    ) -> Result<usize> {
        let mut stream = ScheduleStream::open(input)?;
        let mut writer = RowWriter::create(output, gzip)?;
        let mut seen = 0usize;

        for event in stream.by_ref() {
            seen += 1;
            if graph.tracks(&event.stop_id) {
                writer.write(&event)?;
            }
        }
        if let Err(e) = stream.check() {
            writer.discard()?;
            return Err(e).context("stop times ended early, subset discarded");
        }
        let written = writer.finish()?;

        info!(seen, written, dropped = stream.dropped(), "Filtered rows with matching stop times");
        Ok(written)
    }
}
