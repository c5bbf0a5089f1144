use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use hoops_engine::{DEFAULT_BASE_URL, DEFAULT_START_PATH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Refresh every season, replacing stored seasons and schedules.
    Full,
    /// Limit schedules and boxscores to one date and append schedules.
    Daily,
}

/// Harvest seasons, schedules and boxscores from Basketball Reference.
#[derive(Debug, Parser)]
#[command(name = "hoops", version, about)]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = Mode::Full)]
    pub mode: Mode,

    /// YYYY-MM-DD date to keep (defaults to today, UTC, in daily mode).
    #[arg(long, value_parser = parse_date)]
    pub target_date: Option<NaiveDate>,

    /// Walk at most this many seasons.
    #[arg(long, default_value_t = 10)]
    pub max_units: usize,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, default_value = DEFAULT_START_PATH)]
    pub start_path: String,

    /// Write JSON-lines files here instead of the database.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, default_value = "./hoops.log")]
    pub log_file: PathBuf,

    /// Mirror log output to the terminal.
    #[arg(long)]
    pub log_to_console: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Date used to filter schedules, if any.
    pub fn resolved_target_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        match (self.target_date, self.mode) {
            (Some(date), _) => Some(date),
            (None, Mode::Daily) => Some(today),
            (None, Mode::Full) => None,
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|err| format!("invalid date '{raw}' (expected YYYY-MM-DD): {err}"))
}
