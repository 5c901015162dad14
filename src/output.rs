//! Presentation of station lists and weekly tallies.
//!
//! Supports the plain-text report, CSV and pretty JSON.

use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use csv::WriterBuilder;
use serde::Serialize;

use crate::aggregate::Tally;
use crate::index::StationIndex;

/// Report format selected on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Csv,
    Json,
}

/// One output record per turnstile.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TurnstileReport {
    pub turnstile: String,
    pub net_entries: i64,
    pub net_exits: i64,
}

/// Flattens a tally into display records, keeping its order.
pub fn reports(tally: &Tally) -> Vec<TurnstileReport> {
    tally
        .totals
        .iter()
        .map(|t| TurnstileReport {
            turnstile: t.key.to_string(),
            net_entries: t.net_entries,
            net_exits: t.net_exits,
        })
        .collect()
}

/// Writes `tally` to `out` in the requested format.
pub fn write_tally<W: Write>(out: W, tally: &Tally, format: Format) -> Result<()> {
    match format {
        Format::Text => write_text(out, tally),
        Format::Csv => write_csv(out, tally),
        Format::Json => write_json(out, tally),
    }
}

fn write_text<W: Write>(mut out: W, tally: &Tally) -> Result<()> {
    writeln!(
        out,
        "Turnstiles for the {} line(s) at the {} station.",
        tally.line, tally.station
    )?;
    writeln!(out, "====")?;
    for r in reports(tally) {
        writeln!(
            out,
            "{} {} entries for this week; {} exits for this week.",
            r.turnstile, r.net_entries, r.net_exits
        )?;
    }
    Ok(())
}

fn write_csv<W: Write>(out: W, tally: &Tally) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(out);
    for r in reports(tally) {
        writer.serialize(r)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json<W: Write>(mut out: W, tally: &Tally) -> Result<()> {
    #[derive(Serialize)]
    struct Document<'a> {
        station: &'a str,
        line: &'a str,
        turnstiles: Vec<TurnstileReport>,
    }

    let doc = Document {
        station: &tally.station,
        line: &tally.line,
        turnstiles: reports(tally),
    };
    serde_json::to_writer_pretty(&mut out, &doc)?;
    writeln!(out)?;
    Ok(())
}

/// Lists every station with its line-groups, numbered as in the selection menu.
pub fn write_station_index<W: Write>(mut out: W, index: &StationIndex) -> Result<()> {
    for (i, (station, lines)) in index.iter().enumerate() {
        writeln!(out, "({}) {} [{}]", i + 1, station, lines.join(", "))?;
    }
    Ok(())
}
