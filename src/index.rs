//! Station → line-group index built from a full export.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::source::RawRow;

/// Distinct line-group labels seen for each station.
///
/// Stations iterate in ascending byte order, which is the numbering users
/// pick from. Line-groups keep the order in which they were first seen.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StationIndex {
    stations: BTreeMap<String, Vec<String>>,
}

impl StationIndex {
    /// Scans every row after the header once.
    ///
    /// Fewer than two rows yields an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::TallyError::MissingField`] for a row without a
    /// station or line-group column.
    pub fn build(rows: &[RawRow]) -> Result<Self> {
        let mut stations: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for row in rows.iter().skip(1) {
            let station = row.station()?;
            let line = row.line_name()?;

            let lines = stations.entry(station.to_string()).or_default();
            if !lines.iter().any(|l| l == line) {
                lines.push(line.to_string());
            }
        }

        debug!(stations = stations.len(), "Station index built");
        Ok(Self { stations })
    }

    /// Station names in ascending order.
    pub fn station_names(&self) -> Vec<&str> {
        self.stations.keys().map(String::as_str).collect()
    }

    /// Line-groups for `station` in first-seen order.
    pub fn lines(&self, station: &str) -> Option<&[String]> {
        self.stations.get(station).map(Vec::as_slice)
    }

    /// Iterates `(station, line-groups)` in station order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.stations
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
