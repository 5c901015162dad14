//! CLI entry point for the turnstile tally tool.
//!
//! Provides subcommands for downloading the weekly export, listing stations
//! and printing per-turnstile weekly totals for one station and line-group.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use turnstile_tally::{
    aggregate::{CounterPolicy, aggregate},
    fetch::{Acquisition, BasicClient, ensure_local_file},
    index::StationIndex,
    output::{Format, write_station_index, write_tally},
    select::{PresetSelector, PromptSelector, Selector, choose_station_and_line},
    source::read_rows,
    week::{DEFAULT_BASE_URL, export_filename, export_url, last_saturday},
};

#[derive(Parser)]
#[command(name = "turnstile_tally")]
#[command(about = "Weekly per-turnstile entry and exit totals from subway turnstile exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Read this export instead of the weekly file
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Use the export for the week ending on the Saturday on or before this date
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,

    /// Directory the weekly export is stored in
    #[arg(short = 'd', long, default_value = ".", env = "TURNSTILE_DATA_DIR")]
    data_dir: PathBuf,

    /// Base URL the weekly exports are published under
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "TURNSTILE_BASE_URL")]
    base_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick a station and line-group and print weekly totals per turnstile
    Tally {
        #[command(flatten)]
        source: SourceArgs,

        /// Station number from the menu (skips the station prompt)
        #[arg(short, long, value_name = "N")]
        station: Option<String>,

        /// Line-group number for the chosen station (used with --station)
        #[arg(short, long, value_name = "N", requires = "station")]
        line: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Abort on a counter that is not a number instead of counting it as 0
        #[arg(long, default_value_t = false)]
        strict_counters: bool,
    },
    /// List every station with its line-groups
    Stations {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Download the weekly export if it is not already on disk
    Fetch {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Tally {
            source,
            station,
            line,
            format,
            strict_counters,
        } => {
            let path = acquire(&source).await?;
            let rows = read_rows(&path).with_context(|| format!("could not read {}", path.display()))?;
            let index = StationIndex::build(&rows)?;
            info!(rows = rows.len(), stations = index.len(), "Export loaded");

            let (station, line) = match station {
                Some(station) => {
                    let mut preset = PresetSelector::new(std::iter::once(station).chain(line));
                    select(&index, &mut preset)?
                }
                None => {
                    let mut prompt = PromptSelector::new(io::stdin().lock(), io::stdout());
                    select(&index, &mut prompt)?
                }
            };

            let policy = if strict_counters {
                CounterPolicy::Strict
            } else {
                CounterPolicy::Lenient
            };
            let tally = aggregate(&rows, &station, &line, policy)?;

            if !tally.counter_issues.is_empty() {
                warn!(
                    count = tally.counter_issues.len(),
                    "Some counters were not numbers and were counted as 0"
                );
            }
            let negative = tally.negative_totals();
            if negative > 0 {
                warn!(negative, "Some turnstiles have negative weekly totals");
            }

            write_tally(io::stdout().lock(), &tally, format)?;
        }
        Commands::Stations { source } => {
            let path = acquire(&source).await?;
            let rows = read_rows(&path).with_context(|| format!("could not read {}", path.display()))?;
            let index = StationIndex::build(&rows)?;

            write_station_index(io::stdout().lock(), &index)?;
        }
        Commands::Fetch { source } => {
            let path = acquire(&source).await?;
            info!(path = %path.display(), "Export ready");
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
///
/// Stdout is reserved for menus and reports.
fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/turnstile_tally.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("turnstile_tally.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

/// Resolves the export to read, downloading the weekly file when needed.
#[tracing::instrument(skip_all)]
async fn acquire(source: &SourceArgs) -> Result<PathBuf> {
    if let Some(file) = &source.file {
        return Ok(file.clone());
    }

    let today = source.date.unwrap_or_else(|| Local::now().date_naive());
    let filename = export_filename(last_saturday(today));
    let path = source.data_dir.join(&filename);
    let url = export_url(&source.base_url, &filename);

    let client = BasicClient::new()?;
    match ensure_local_file(&client, &url, &path).await? {
        Acquisition::AlreadyPresent => info!(path = %path.display(), "Using existing export"),
        Acquisition::Downloaded { bytes } => {
            info!(path = %path.display(), bytes, "Downloaded export")
        }
    }
    Ok(path)
}

fn select<S: Selector>(index: &StationIndex, selector: &mut S) -> Result<(String, String)> {
    let (station, line) = choose_station_and_line(index, selector)?;
    info!(%station, %line, "Selected");
    Ok((station, line))
}
