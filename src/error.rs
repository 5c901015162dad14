//! Error types for the turnstile tally engine.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, TallyError>;

/// Fatal conditions raised while reading or aggregating an export.
#[derive(Error, Debug)]
pub enum TallyError {
    /// The export could not be opened or read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The export is not well-formed comma-separated text
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A row is shorter than the column the engine needs
    #[error("record {record} has no field {index} ({name})")]
    MissingField {
        record: usize,
        index: usize,
        name: &'static str,
    },

    /// A counter failed to parse while running with the strict policy
    #[error("record {record}: bad {column} counter: {source}")]
    BadCounter {
        record: usize,
        column: &'static str,
        #[source]
        source: CounterError,
    },

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// A cumulative counter field that is not a decimal integer after cleaning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CounterError {
    #[error("{0:?} is not a decimal counter")]
    NotNumeric(String),

    #[error("{0:?} does not fit in a 64-bit counter")]
    Overflow(String),
}

/// Invalid ordinal supplied by whoever answers a selection prompt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("enter a valid number: {0:?} is not an unsigned integer")]
    NotANumber(String),

    #[error("enter a valid number: {ordinal} is outside 1..={count}")]
    OutOfRange { ordinal: usize, count: usize },

    #[error("no options to choose from")]
    NothingToChoose,

    #[error("selection input ended before a choice was made")]
    NoInput,
}
