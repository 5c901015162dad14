//! Per-turnstile weekly totals for one station and line-group.
//!
//! Readings are grouped by physical turnstile in file order, which is
//! chronological within an export, and each group is reduced to
//! `last - first` for both counters.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::iter;

use tracing::{debug, warn};

use crate::counter::parse_counter;
use crate::error::{CounterError, Result, TallyError};
use crate::source::RawRow;

/// Identity of one physical turnstile: control area, unit and SCP.
///
/// Orders by the bytes of its `CA,UNIT,SCP` display string. Keys that only
/// differ in where a comma falls fall back to component order, so distinct
/// keys never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TurnstileKey {
    pub control_area: String,
    pub unit: String,
    pub scp: String,
}

impl TurnstileKey {
    pub fn new(control_area: &str, unit: &str, scp: &str) -> Self {
        Self {
            control_area: control_area.to_string(),
            unit: unit.to_string(),
            scp: scp.to_string(),
        }
    }

    fn composite(&self) -> impl Iterator<Item = u8> + '_ {
        self.control_area
            .bytes()
            .chain(iter::once(b','))
            .chain(self.unit.bytes())
            .chain(iter::once(b','))
            .chain(self.scp.bytes())
    }
}

impl Ord for TurnstileKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.composite().cmp(other.composite()).then_with(|| {
            (&self.control_area, &self.unit, &self.scp).cmp(&(
                &other.control_area,
                &other.unit,
                &other.scp,
            ))
        })
    }
}

impl PartialOrd for TurnstileKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TurnstileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.control_area, self.unit, self.scp)
    }
}

/// What to do with a counter that is not an integer after cleaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CounterPolicy {
    /// Count the field as zero, record a [`CounterIssue`] and keep going.
    #[default]
    Lenient,
    /// Abort with [`TallyError::BadCounter`].
    Strict,
}

/// A counter field that was defaulted to zero under [`CounterPolicy::Lenient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterIssue {
    pub record: usize,
    pub column: &'static str,
    pub error: CounterError,
}

/// One collection interval for a turnstile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub entries: u64,
    pub exits: u64,
}

/// Net movement through one turnstile over the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyTotal {
    pub key: TurnstileKey,
    pub net_entries: i64,
    pub net_exits: i64,
    pub readings: usize,
}

impl WeeklyTotal {
    fn from_series(key: TurnstileKey, series: &[Reading]) -> Option<Self> {
        let first = series.first()?;
        let last = series.last()?;
        Some(Self {
            key,
            net_entries: delta(first.entries, last.entries),
            net_exits: delta(first.exits, last.exits),
            readings: series.len(),
        })
    }

    /// A counter went backwards, usually a reset or rollover mid-week.
    pub fn is_negative(&self) -> bool {
        self.net_entries < 0 || self.net_exits < 0
    }
}

fn delta(first: u64, last: u64) -> i64 {
    (i128::from(last) - i128::from(first)).clamp(i64::MIN.into(), i64::MAX.into()) as i64
}

/// Result of aggregating one station and line-group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub station: String,
    pub line: String,
    /// Ordered by [`TurnstileKey`].
    pub totals: Vec<WeeklyTotal>,
    pub counter_issues: Vec<CounterIssue>,
}

impl Tally {
    pub fn negative_totals(&self) -> usize {
        self.totals.iter().filter(|t| t.is_negative()).count()
    }
}

/// Groups the rows matching `station` and `line` by turnstile and reduces
/// each group to its weekly net totals.
///
/// The first row is the header and is skipped. A selection with no matching
/// rows gives an empty tally.
///
/// # Errors
///
/// A matching row that is missing a key or counter column is fatal. Under
/// [`CounterPolicy::Strict`] so is a counter that fails to parse.
#[tracing::instrument(skip(rows), fields(rows = rows.len()))]
pub fn aggregate(
    rows: &[RawRow],
    station: &str,
    line: &str,
    policy: CounterPolicy,
) -> Result<Tally> {
    let mut series: BTreeMap<TurnstileKey, Vec<Reading>> = BTreeMap::new();
    let mut counter_issues = Vec::new();
    let mut matched = 0usize;

    for row in rows.iter().skip(1) {
        if row.station()? != station || row.line_name()? != line {
            continue;
        }
        matched += 1;

        let key = row.turnstile_key()?;
        let entries = read_counter(row, "ENTRIES", row.entries()?, policy, &mut counter_issues)?;
        let exits = read_counter(row, "EXITS", row.exits()?, policy, &mut counter_issues)?;

        series.entry(key).or_default().push(Reading { entries, exits });
    }

    let totals: Vec<WeeklyTotal> = series
        .into_iter()
        .filter_map(|(key, readings)| WeeklyTotal::from_series(key, &readings))
        .collect();

    for total in totals.iter().filter(|t| t.is_negative()) {
        warn!(
            turnstile = %total.key,
            net_entries = total.net_entries,
            net_exits = total.net_exits,
            "Counter went backwards; possible reset or rollover"
        );
    }

    debug!(
        matched,
        turnstiles = totals.len(),
        counter_issues = counter_issues.len(),
        "Aggregation complete"
    );

    Ok(Tally {
        station: station.to_string(),
        line: line.to_string(),
        totals,
        counter_issues,
    })
}

fn read_counter(
    row: &RawRow,
    column: &'static str,
    raw: &str,
    policy: CounterPolicy,
    issues: &mut Vec<CounterIssue>,
) -> Result<u64> {
    match parse_counter(raw) {
        Ok(value) => Ok(value),
        Err(error) => match policy {
            CounterPolicy::Strict => Err(TallyError::BadCounter {
                record: row.record(),
                column,
                source: error,
            }),
            CounterPolicy::Lenient => {
                warn!(record = row.record(), column, %error, "Counter defaulted to 0");
                issues.push(CounterIssue {
                    record: row.record(),
                    column,
                    error,
                });
                Ok(0)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATION: &str = "TIMES SQ-42 ST";
    const LINE: &str = "1237ACENQRSW";

    fn header() -> RawRow {
        RawRow::from([
            "C/A", "UNIT", "SCP", "STATION", "LINENAME", "DIVISION", "DATE", "TIME", "DESC",
            "ENTRIES", "EXITS",
        ])
    }

    fn reading(key: (&str, &str, &str), station: &str, line: &str, entries: &str, exits: &str) -> RawRow {
        RawRow::from([
            key.0, key.1, key.2, station, line, "IRT", "09/21/2019", "00:00:00", "REGULAR",
            entries, exits,
        ])
    }

    fn times_sq(key: (&str, &str, &str), entries: &str, exits: &str) -> RawRow {
        reading(key, STATION, LINE, entries, exits)
    }

    const A002: (&str, &str, &str) = ("A002", "R051", "02-00-00");

    #[test]
    fn test_weekly_total_from_three_readings() {
        let rows = vec![
            header(),
            times_sq(A002, "0001000", "0000500"),
            times_sq(A002, "0001050", "0000520"),
            times_sq(A002, "0001120", "0000540"),
        ];
        let tally = aggregate(&rows, STATION, LINE, CounterPolicy::Lenient).unwrap();

        assert_eq!(tally.totals.len(), 1);
        let total = &tally.totals[0];
        assert_eq!(total.key, TurnstileKey::new("A002", "R051", "02-00-00"));
        assert_eq!(total.net_entries, 120);
        assert_eq!(total.net_exits, 40);
        assert_eq!(total.readings, 3);
        assert!(tally.counter_issues.is_empty());
    }

    #[test]
    fn test_single_reading_nets_zero() {
        let rows = vec![header(), times_sq(A002, "0001000", "0000500")];
        let tally = aggregate(&rows, STATION, LINE, CounterPolicy::Lenient).unwrap();
        assert_eq!(tally.totals[0].net_entries, 0);
        assert_eq!(tally.totals[0].net_exits, 0);
    }

    #[test]
    fn test_keys_are_not_merged() {
        let other = ("A002", "R051", "02-00-01");
        let rows = vec![
            header(),
            times_sq(A002, "100", "10"),
            times_sq(other, "5000", "700"),
            times_sq(A002, "150", "30"),
            times_sq(other, "5001", "701"),
        ];
        let tally = aggregate(&rows, STATION, LINE, CounterPolicy::Lenient).unwrap();

        assert_eq!(tally.totals.len(), 2);
        assert_eq!((tally.totals[0].net_entries, tally.totals[0].net_exits), (50, 20));
        assert_eq!((tally.totals[1].net_entries, tally.totals[1].net_exits), (1, 1));
    }

    #[test]
    fn test_filters_station_and_line() {
        let rows = vec![
            header(),
            times_sq(A002, "100", "10"),
            reading(A002, STATION, "ACE", "100000", "100000"),
            reading(A002, "34 ST-PENN STA", LINE, "900000", "900000"),
            times_sq(A002, "110", "12"),
        ];
        let tally = aggregate(&rows, STATION, LINE, CounterPolicy::Lenient).unwrap();
        assert_eq!(tally.totals.len(), 1);
        assert_eq!(tally.totals[0].net_entries, 10);
        assert_eq!(tally.totals[0].net_exits, 2);
        assert_eq!(tally.totals[0].readings, 2);
    }

    #[test]
    fn test_output_ordered_by_key() {
        let rows = vec![
            header(),
            times_sq(("R151", "R033", "00-00-00"), "1", "1"),
            times_sq(("A021", "R032", "01-00-01"), "1", "1"),
            times_sq(("A021", "R032", "01-00-00"), "1", "1"),
            times_sq(("A006", "R079", "00-00-00"), "1", "1"),
        ];
        let tally = aggregate(&rows, STATION, LINE, CounterPolicy::Lenient).unwrap();
        let keys: Vec<String> = tally.totals.iter().map(|t| t.key.to_string()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys[0], "A006,R079,00-00-00");
    }

    #[test]
    fn test_key_order_follows_display_string() {
        let rows = vec![
            header(),
            times_sq(("A", "R1", "00"), "1", "1"),
            times_sq(("A B", "R1", "00"), "1", "1"),
            times_sq(("A", "R1", "00 1"), "1", "1"),
            times_sq(("A", "R1", "00-01"), "1", "1"),
        ];
        let tally = aggregate(&rows, STATION, LINE, CounterPolicy::Lenient).unwrap();
        let keys: Vec<String> = tally.totals.iter().map(|t| t.key.to_string()).collect();
        assert_eq!(keys, ["A B,R1,00", "A,R1,00", "A,R1,00 1", "A,R1,00-01"]);
    }

    #[test]
    fn test_keys_with_same_display_stay_separate() {
        let rows = vec![
            header(),
            times_sq(("A,B", "C", "D"), "10", "10"),
            times_sq(("A", "B,C", "D"), "50", "50"),
            times_sq(("A,B", "C", "D"), "15", "12"),
        ];
        let tally = aggregate(&rows, STATION, LINE, CounterPolicy::Lenient).unwrap();
        assert_eq!(tally.totals.len(), 2);
        assert_eq!(tally.totals[0].key, TurnstileKey::new("A", "B,C", "D"));
        assert_eq!(tally.totals[1].net_entries, 5);
        assert_eq!(tally.totals[1].net_exits, 2);
    }

    #[test]
    fn test_empty_selection_is_not_an_error() {
        let rows = vec![header(), times_sq(A002, "1", "1")];
        let tally = aggregate(&rows, "NOWHERE", LINE, CounterPolicy::Strict).unwrap();
        assert!(tally.totals.is_empty());
        assert!(aggregate(&[], STATION, LINE, CounterPolicy::Lenient)
            .unwrap()
            .totals
            .is_empty());
    }

    #[test]
    fn test_header_row_is_skipped_even_if_it_matches() {
        let rows = vec![times_sq(A002, "5000", "5000"), times_sq(A002, "10", "10")];
        let tally = aggregate(&rows, STATION, LINE, CounterPolicy::Lenient).unwrap();
        assert_eq!(tally.totals[0].readings, 1);
    }

    #[test]
    fn test_lenient_defaults_bad_counter_to_zero() {
        let rows = vec![
            header(),
            times_sq(A002, "0000100", "n/a"),
            times_sq(A002, "0000150", "0000040"),
        ];
        let tally = aggregate(&rows, STATION, LINE, CounterPolicy::Lenient).unwrap();

        assert_eq!(tally.totals[0].net_entries, 50);
        assert_eq!(tally.totals[0].net_exits, 40);
        assert_eq!(tally.counter_issues.len(), 1);
        assert_eq!(tally.counter_issues[0].record, 0);
        assert_eq!(tally.counter_issues[0].column, "EXITS");
    }

    #[test]
    fn test_strict_rejects_bad_counter() {
        let rows = vec![header(), times_sq(A002, "12x", "1")];
        let err = aggregate(&rows, STATION, LINE, CounterPolicy::Strict).unwrap_err();
        assert!(matches!(err, TallyError::BadCounter { column: "ENTRIES", .. }));
    }

    #[test]
    fn test_backwards_counter_is_flagged() {
        let rows = vec![
            header(),
            times_sq(A002, "0005000", "0000100"),
            times_sq(A002, "0000010", "0000120"),
        ];
        let tally = aggregate(&rows, STATION, LINE, CounterPolicy::Lenient).unwrap();
        assert_eq!(tally.totals[0].net_entries, -4990);
        assert!(tally.totals[0].is_negative());
        assert_eq!(tally.negative_totals(), 1);
    }

    #[test]
    fn test_missing_counter_column_is_fatal() {
        let rows = vec![
            header(),
            RawRow::from(["A002", "R051", "02-00-00", STATION, LINE]),
        ];
        assert!(matches!(
            aggregate(&rows, STATION, LINE, CounterPolicy::Lenient),
            Err(TallyError::MissingField { .. })
        ));
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let rows = vec![
            header(),
            times_sq(A002, "1", "2"),
            times_sq(("B001", "R001", "00-00-00"), "3", "4"),
            times_sq(A002, "9", "9"),
        ];
        let first = aggregate(&rows, STATION, LINE, CounterPolicy::Lenient).unwrap();
        let second = aggregate(&rows, STATION, LINE, CounterPolicy::Lenient).unwrap();
        assert_eq!(first, second);
    }
}
