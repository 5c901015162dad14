//! Numbered-list selection of a station and line-group.
//!
//! The engine never reads input itself. A [`Selector`] is asked for one
//! ordinal at a time and every answer goes through [`parse_ordinal`].

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use tracing::debug;

use crate::error::{Result, SelectionError};
use crate::index::StationIndex;

/// Validates a 1-based ordinal typed against a list of `count` items and
/// returns the matching 0-based index.
///
/// Only one trailing line terminator is tolerated; anything else that is
/// not a decimal digit is rejected.
pub fn parse_ordinal(input: &str, count: usize) -> std::result::Result<usize, SelectionError> {
    let trimmed = input
        .strip_suffix('\n')
        .map(|s| s.strip_suffix('\r').unwrap_or(s))
        .unwrap_or(input);

    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SelectionError::NotANumber(trimmed.to_string()));
    }
    let ordinal: usize = trimmed
        .parse()
        .map_err(|_| SelectionError::NotANumber(trimmed.to_string()))?;

    if ordinal == 0 || ordinal > count {
        return Err(SelectionError::OutOfRange { ordinal, count });
    }
    Ok(ordinal - 1)
}

/// Where a menu's question is printed relative to its numbered options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromptPlacement {
    #[default]
    AfterOptions,
    BeforeOptions,
}

/// A numbered list and the question asked about it.
#[derive(Debug, Clone, Copy)]
pub struct Menu<'a> {
    pub prompt: &'a str,
    pub options: &'a [&'a str],
    pub placement: PromptPlacement,
}

impl<'a> Menu<'a> {
    pub fn new(prompt: &'a str, options: &'a [&'a str]) -> Self {
        Self {
            prompt,
            options,
            placement: PromptPlacement::AfterOptions,
        }
    }

    pub fn prompt_first(mut self) -> Self {
        self.placement = PromptPlacement::BeforeOptions;
        self
    }

    /// Checks that a selector's answer names one of the options.
    fn checked(&self, index: usize) -> Result<usize> {
        if index < self.options.len() {
            Ok(index)
        } else {
            Err(SelectionError::OutOfRange {
                ordinal: index.saturating_add(1),
                count: self.options.len(),
            }
            .into())
        }
    }
}

/// Answers "which of these?" for a numbered list.
pub trait Selector {
    /// Returns the 0-based index of the chosen option.
    fn choose(&mut self, menu: &Menu<'_>) -> Result<usize>;
}

/// Prints a numbered menu and reads one line per choice.
pub struct PromptSelector<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptSelector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Selector for PromptSelector<R, W> {
    fn choose(&mut self, menu: &Menu<'_>) -> Result<usize> {
        if menu.options.is_empty() {
            return Err(SelectionError::NothingToChoose.into());
        }
        if menu.placement == PromptPlacement::BeforeOptions {
            writeln!(self.output, "{}", menu.prompt)?;
        }
        for (i, option) in menu.options.iter().enumerate() {
            writeln!(self.output, "({}) {}", i + 1, option)?;
        }
        if menu.placement == PromptPlacement::AfterOptions {
            writeln!(self.output, "{}", menu.prompt)?;
        }
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(SelectionError::NoInput.into());
        }
        Ok(parse_ordinal(&line, menu.options.len())?)
    }
}

/// Replays ordinals given up front, e.g. on the command line.
#[derive(Debug, Default)]
pub struct PresetSelector {
    answers: VecDeque<String>,
}

impl PresetSelector {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }
}

impl Selector for PresetSelector {
    fn choose(&mut self, menu: &Menu<'_>) -> Result<usize> {
        if menu.options.is_empty() {
            return Err(SelectionError::NothingToChoose.into());
        }
        let answer = self.answers.pop_front().ok_or(SelectionError::NoInput)?;
        debug!(prompt = menu.prompt, answer = %answer, "Using preset selection");
        Ok(parse_ordinal(&answer, menu.options.len())?)
    }
}

/// Asks for a station, then for one of its line-groups.
///
/// A station with a single line-group is resolved without asking.
pub fn choose_station_and_line<S: Selector + ?Sized>(
    index: &StationIndex,
    selector: &mut S,
) -> Result<(String, String)> {
    let names = index.station_names();
    let stations = Menu::new("Enter the number of the station: ", &names);
    let station = names[stations.checked(selector.choose(&stations)?)?];

    let lines = index
        .lines(station)
        .ok_or(SelectionError::NothingToChoose)?;

    let line = if let [only] = lines {
        only.as_str()
    } else {
        let options: Vec<&str> = lines.iter().map(String::as_str).collect();
        let prompt = format!("Which line at the {station} station?");
        let menu = Menu::new(&prompt, &options).prompt_first();
        lines[menu.checked(selector.choose(&menu)?)?].as_str()
    };

    debug!(station, line, "Selection made");
    Ok((station.to_string(), line.to_string()))
}
