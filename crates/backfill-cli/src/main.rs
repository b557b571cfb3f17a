//! backfill: migrate legacy data continuously.
//!
//! Runs the units of a plan file against a legacy SQLite database and a
//! destination SQLite database, resuming from cursors kept in a local sled
//! database.

mod config;
mod error;
mod formatter;
mod plan;
mod reporter;

use std::process::ExitCode;
use std::rc::Rc;
use std::sync::Arc;

use backfill_core::{CursorStore, Orchestrator, RunOptions, SledCursorStore};
use backfill_sqlite::SqliteDestination;
use clap::Parser;
use rusqlite::{Connection, OpenFlags};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Args, CliConfig, Mode};
use error::{Error, Result};
use formatter::{OutputFormat, RunSummary};
use plan::PlanFile;
use reporter::TerminalReporter;

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backfill=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Args::parse().into_config();

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: CliConfig) -> Result<()> {
    let plan = PlanFile::load(&config.plan_path)?;

    tracing::debug!(
        plan = %config.plan_path.display(),
        source = %plan.source.display(),
        destination = %plan.destination.display(),
        data_path = %config.data_path.display(),
        "configuration loaded"
    );

    let source = Rc::new(Connection::open_with_flags(
        &plan.source,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?);
    let target = Rc::new(Connection::open(&plan.destination)?);

    let db = sled::open(&config.data_path)?;
    let store = Arc::new(SledCursorStore::open(&db)?);

    let units = plan.build_units(&source, &target, store.clone(), &config.engine)?;
    let mut orchestrator = Orchestrator::new(units)?;

    if config.mode == Mode::Stat {
        let rows = orchestrator.stat(&SqliteDestination::new(target))?;
        match config.format {
            OutputFormat::Table => println!("{}", formatter::format_stat_table(&rows)),
            OutputFormat::Json => println!("{}", formatter::format_stat_json(&rows)?),
        }
        return Ok(());
    }

    let selection = config
        .selection
        .ok_or_else(|| Error::NoSelection(plan.names().join(", ")))?;
    let reporter = TerminalReporter::new(config.format == OutputFormat::Json);

    let rewound = if config.mode == Mode::Reset {
        orchestrator.reset(&selection, &reporter)?
    } else {
        Vec::new()
    };

    let options = RunOptions {
        limit: config.limit,
    };
    let reports = orchestrator.run(&selection, &options, &reporter)?;
    store.flush()?;

    match config.format {
        OutputFormat::Table => println!("Done"),
        OutputFormat::Json => println!(
            "{}",
            formatter::format_run_json(&RunSummary {
                rewound: &rewound,
                units: &reports,
            })?
        ),
    }

    Ok(())
}
