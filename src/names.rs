//! Station name matching between the tap data and the topology table.
//!
//! The two datasets share no identifier, so stations are joined on a
//! normalized display name. All of that logic lives behind [`NameMatcher`].

use crate::config::StationAlias;

pub trait NameMatcher {
    /// Key for a station name as it appears in the tap file.
    fn tap_key(&self, raw: &str) -> String;

    /// Key for a `stop_name` in the topology table, comparable to [`Self::tap_key`].
    fn topology_key(&self, stop_name: &str) -> String;

    /// Tap key for a topology name that is published differently in the tap data.
    fn alias_for(&self, stop_name: &str) -> Option<&str>;
}

/// Strips the word "station" and trims, plus a fixed alias table.
#[derive(Debug, Clone, Default)]
pub struct SuffixMatcher {
    aliases: Vec<StationAlias>,
}

impl SuffixMatcher {
    pub fn new(aliases: Vec<StationAlias>) -> Self {
        Self { aliases }
    }
}

impl NameMatcher for SuffixMatcher {
    fn tap_key(&self, raw: &str) -> String {
        remove_ignore_ascii_case(raw, "station").trim().to_string()
    }

    fn topology_key(&self, stop_name: &str) -> String {
        stop_name.replacen("Station", "", 1).trim().to_string()
    }

    fn alias_for(&self, stop_name: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|a| a.topology_name == stop_name)
            .map(|a| a.tap_key.as_str())
    }
}

/// Removes every ASCII case-insensitive occurrence of `needle`.
fn remove_ignore_ascii_case(haystack: &str, needle: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    // ASCII lowercasing keeps byte offsets aligned with `haystack`.
    let lowered = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();

    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    for (start, _) in lowered.match_indices(needle.as_str()) {
        out.push_str(&haystack[last..start]);
        last = start + needle.len();
    }
    out.push_str(&haystack[last..]);
    out
}
