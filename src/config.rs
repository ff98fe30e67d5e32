//! Pipeline configuration.
//!
//! Every field has a default matching the published Sydney datasets, so a
//! config file only needs to list what differs:
//! ```json
//! {
//!   "period": "Jul-25",
//!   "excluded_stop_id_prefixes": ["G", "F"]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A topology station whose name differs from the name the tap data uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationAlias {
    /// Exact `stop_name` in the topology table.
    pub topology_name: String,
    /// Key the station's tap record is stored under.
    pub tap_key: String,
}

impl StationAlias {
    pub fn new(topology_name: &str, tap_key: &str) -> Self {
        Self {
            topology_name: topology_name.to_string(),
            tap_key: tap_key.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reporting period kept from the tap file, e.g. `Jun-25`.
    pub period: String,
    /// Substring in a child stop's name that marks it as a platform.
    pub platform_marker: String,
    /// `location_type` value of station-level rows.
    pub station_location_type: String,
    /// Station ids starting with one of these belong to non-rail modes.
    pub excluded_stop_id_prefixes: Vec<String>,
    /// Child stop ids containing this are alternate sub-records.
    pub sub_id_delimiter: String,
    /// Tap value published instead of a count for small stations.
    pub below_threshold_label: String,
    /// Taps assumed for a below-threshold count when computing ratios.
    pub below_threshold_taps: u64,
    pub aliases: Vec<StationAlias>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            period: "Jun-25".to_string(),
            platform_marker: "Platform".to_string(),
            station_location_type: "1".to_string(),
            excluded_stop_id_prefixes: vec!["G".to_string()],
            sub_id_delimiter: "_".to_string(),
            below_threshold_label: "Less than 50".to_string(),
            below_threshold_taps: 50,
            aliases: vec![
                StationAlias::new("Sydney Domestic Airport Station", "Domestic"),
                StationAlias::new("Sydney International Airport Station", "International"),
            ],
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{path}'"))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid config '{path}'"))?;
        Ok(config)
    }

    /// Loads `path` if given, otherwise the defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn is_excluded_station_id(&self, stop_id: &str) -> bool {
        self.excluded_stop_id_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && stop_id.starts_with(prefix.as_str()))
    }

    pub fn is_sub_record_id(&self, stop_id: &str) -> bool {
        !self.sub_id_delimiter.is_empty() && stop_id.contains(self.sub_id_delimiter.as_str())
    }

    pub fn is_platform_name(&self, stop_name: &str) -> bool {
        stop_name.contains(self.platform_marker.as_str())
    }
}
