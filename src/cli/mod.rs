//! Command-line parsing for the `wear` binary.
//!
//! Argument parsing stays here; the workflow itself lives in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{
    DEFAULT_SEED, DEFAULT_SYNTHETIC_END, DEFAULT_SYNTHETIC_START, DEFAULT_WINDOW_END, DEFAULT_WINDOW_START,
};
use crate::domain::DeviceKind;

pub mod prompt;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "wear", version, about = "Wearable data from Fitbit and Whoop (real or synthetic)")]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the data types a device serves.
    Types(TypesArgs),
    /// Fetch one data type over a date window.
    Get(GetArgs),
}

#[derive(Debug, Args, Clone)]
pub struct TypesArgs {
    /// Only list this device (all devices otherwise).
    #[arg(short, long, value_enum)]
    pub device: Option<DeviceKind>,
}

#[derive(Debug, Args, Clone)]
pub struct GetArgs {
    /// Data type name, e.g. `steps`, `sleep`, `cycles`.
    #[arg(value_name = "TYPE")]
    pub data_type: String,

    #[arg(short, long, value_enum, default_value_t = DeviceKind::FitbitSense)]
    pub device: DeviceKind,

    /// First day of the window (YYYY-MM-DD).
    #[arg(long, default_value = DEFAULT_WINDOW_START)]
    pub start: String,

    /// Last day of the window, inclusive (YYYY-MM-DD).
    #[arg(long, default_value = DEFAULT_WINDOW_END)]
    pub end: String,

    /// Seed for synthetic data.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// First day of the generated synthetic range.
    #[arg(long, default_value = DEFAULT_SYNTHETIC_START)]
    pub synthetic_start: String,

    /// Last day of the generated synthetic range.
    #[arg(long, default_value = DEFAULT_SYNTHETIC_END)]
    pub synthetic_end: String,

    /// Log in to the vendor and fetch real data.
    #[arg(long)]
    pub real: bool,

    /// Show Whoop sleep and heart-rate times at this UTC offset (`UTC`, `+05:30`, `-0700`).
    #[arg(long, value_name = "OFFSET", allow_hyphen_values = true)]
    pub timezone: Option<String>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Print at most N records (exports are never truncated).
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Also write the records to a `.csv` or `.json` file.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Summary,
}
