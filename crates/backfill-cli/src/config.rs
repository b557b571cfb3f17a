//! Command-line arguments and run configuration.

use std::path::PathBuf;
use std::time::Duration;

use backfill_core::config::{DEFAULT_CHUNK_SIZE, DEFAULT_HINT_INTERVAL};
use backfill_core::{EngineConfig, Selection};
use clap::Parser;

use crate::formatter::OutputFormat;

/// Default plan file.
pub const DEFAULT_PLAN_PATH: &str = "backfill.json";

/// Default cursor database directory.
pub const DEFAULT_DATA_PATH: &str = "./.backfill";

/// What the invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Show progress and consistency per destination.
    Stat,
    /// Rewind the selected units, then migrate them.
    Reset,
    /// Migrate the selected units.
    Run,
}

/// Resolved configuration of one invocation.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Plan file path.
    pub plan_path: PathBuf,

    /// Cursor database directory.
    pub data_path: PathBuf,

    /// Invocation mode.
    pub mode: Mode,

    /// Selected units; `None` when nothing was named and `--force` was not given.
    pub selection: Option<Selection>,

    /// Row cap per unit run.
    pub limit: Option<u64>,

    /// Engine settings.
    pub engine: EngineConfig,

    /// Output format for reports.
    pub format: OutputFormat,
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "backfill")]
#[command(version, about = "Migrate legacy data (continuously)", long_about = None)]
pub struct Args {
    /// Units to migrate or reset; `all` selects every unit.
    pub units: Vec<String>,

    /// Plan file describing the source, destination and units.
    #[arg(short, long, default_value = DEFAULT_PLAN_PATH)]
    pub plan: PathBuf,

    /// Directory of the cursor database.
    #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// Reset migration progress of the selected units before migrating.
    #[arg(long)]
    pub reset: bool,

    /// Work on every unit without asking.
    #[arg(long)]
    pub force: bool,

    /// Show statistics and exit.
    #[arg(long, conflicts_with = "reset")]
    pub stat: bool,

    /// Migrate at most this many rows per unit (0 = unlimited).
    #[arg(long)]
    pub limit: Option<u64>,

    /// Rows fetched per source query.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Minimum milliseconds between progress hint refreshes.
    #[arg(long, default_value_t = DEFAULT_HINT_INTERVAL.as_millis() as u64)]
    pub hint_interval_ms: u64,

    /// Print reports as JSON.
    #[arg(long)]
    pub output_json: bool,
}

impl Args {
    /// Convert command-line arguments to a run configuration.
    pub fn into_config(self) -> CliConfig {
        let mode = if self.stat {
            Mode::Stat
        } else if self.reset {
            Mode::Reset
        } else {
            Mode::Run
        };

        let selection = if self.force {
            Some(Selection::All)
        } else if self.units.is_empty() {
            None
        } else {
            Some(Selection::parse(self.units))
        };

        let engine = EngineConfig::new()
            .with_chunk_size(self.chunk_size)
            .with_hint_interval(Duration::from_millis(self.hint_interval_ms));

        let format = if self.output_json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        };

        CliConfig {
            plan_path: self.plan,
            data_path: self.data_path,
            mode,
            selection,
            limit: self.limit.filter(|&n| n > 0),
            engine,
            format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliConfig {
        Args::try_parse_from(std::iter::once("backfill").chain(args.iter().copied()))
            .unwrap()
            .into_config()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.plan_path, PathBuf::from(DEFAULT_PLAN_PATH));
        assert_eq!(config.data_path, PathBuf::from(DEFAULT_DATA_PATH));
        assert_eq!(config.mode, Mode::Run);
        assert_eq!(config.selection, None);
        assert_eq!(config.limit, None);
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.format, OutputFormat::Table);
    }

    #[test]
    fn test_force_selects_everything() {
        let config = parse(&["--force", "--reset", "migrate_users"]);
        assert_eq!(config.mode, Mode::Reset);
        assert_eq!(config.selection, Some(Selection::All));
    }

    #[test]
    fn test_named_units_and_options() {
        let config = parse(&[
            "migrate_users",
            "migrate_orders",
            "--limit",
            "500",
            "--chunk-size",
            "50",
            "--hint-interval-ms",
            "250",
            "--output-json",
            "-p",
            "plans/legacy.json",
        ]);

        assert_eq!(
            config.selection,
            Some(Selection::Only(vec![
                "migrate_users".to_string(),
                "migrate_orders".to_string()
            ]))
        );
        assert_eq!(config.limit, Some(500));
        assert_eq!(config.engine.chunk_size, 50);
        assert_eq!(config.engine.hint_interval, Duration::from_millis(250));
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.plan_path, PathBuf::from("plans/legacy.json"));
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        assert_eq!(parse(&["all", "--limit", "0"]).limit, None);
        assert_eq!(parse(&["all"]).selection, Some(Selection::All));
    }

    #[test]
    fn test_stat_conflicts_with_reset() {
        assert!(Args::try_parse_from(["backfill", "--stat", "--reset"]).is_err());
        assert_eq!(parse(&["--stat"]).mode, Mode::Stat);
    }
}
