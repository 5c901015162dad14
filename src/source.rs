//! Loads a turnstile export into memory as positional rows.
//!
//! The engine never looks at header names. Row 0 is the header and every
//! consumer skips exactly one leading row.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::aggregate::TurnstileKey;
use crate::error::{Result, TallyError};

pub const CONTROL_AREA: usize = 0;
pub const UNIT: usize = 1;
pub const SCP: usize = 2;
pub const STATION: usize = 3;
pub const LINE_NAME: usize = 4;
pub const ENTRIES: usize = 9;
pub const EXITS: usize = 10;

/// One CSV record, kept exactly as read.
#[derive(Debug, Clone)]
pub struct RawRow {
    record: usize,
    fields: StringRecord,
}

impl RawRow {
    pub fn new(record: usize, fields: StringRecord) -> Self {
        Self { record, fields }
    }

    /// 1-based position of this row in the file, header included.
    pub fn record(&self) -> usize {
        self.record
    }

    fn field(&self, index: usize, name: &'static str) -> Result<&str> {
        self.fields.get(index).ok_or(TallyError::MissingField {
            record: self.record,
            index,
            name,
        })
    }

    pub fn station(&self) -> Result<&str> {
        self.field(STATION, "STATION")
    }

    pub fn line_name(&self) -> Result<&str> {
        self.field(LINE_NAME, "LINENAME")
    }

    pub fn entries(&self) -> Result<&str> {
        self.field(ENTRIES, "ENTRIES")
    }

    pub fn exits(&self) -> Result<&str> {
        self.field(EXITS, "EXITS")
    }

    pub fn turnstile_key(&self) -> Result<TurnstileKey> {
        Ok(TurnstileKey::new(
            self.field(CONTROL_AREA, "C/A")?,
            self.field(UNIT, "UNIT")?,
            self.field(SCP, "SCP")?,
        ))
    }
}

#[cfg(test)]
impl<const N: usize> From<[&str; N]> for RawRow {
    fn from(fields: [&str; N]) -> Self {
        RawRow::new(0, StringRecord::from(fields.to_vec()))
    }
}

/// Reads every record of the export at `path`, in file order.
///
/// # Errors
///
/// Fails if the file cannot be opened, is not valid CSV, or has a row whose
/// field count differs from the first row.
pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<RawRow>> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Opening export");
    read_rows_from(File::open(path)?)
}

/// Same as [`read_rows`] over any reader.
pub fn read_rows_from<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        rows.push(RawRow::new(i + 1, result?));
    }

    debug!(rows = rows.len(), "Export loaded");
    Ok(rows)
}
