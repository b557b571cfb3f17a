//! Dependency-ordered orchestration of migration units.
//!
//! The orchestrator owns every unit of a plan. The dependency graph is
//! validated when it is built, so no unit runs unless every dependency
//! exists and the graph is acyclic. Three modes act on a selection:
//!
//! - **reset**: rewind the selected units' cursors
//! - **run**: migrate the selected units, dependencies first
//! - **stat**: read-only progress and consistency per destination

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::progress::{NullSink, ProgressSink};
use crate::stats::{aggregate, Destination, RunStats, StatRow, UnitReport, UnitSample};
use crate::unit::MigrationUnit;

/// Which units to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every unit.
    All,
    /// Units with these names.
    Only(Vec<String>),
}

impl Selection {
    /// Build a selection from names. `all` or `everything`, in any case,
    /// selects every unit.
    pub fn parse<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names
            .iter()
            .any(|name| name.eq_ignore_ascii_case("all") || name.eq_ignore_ascii_case("everything"))
        {
            Selection::All
        } else {
            Selection::Only(names)
        }
    }

    /// Check whether a unit name is selected.
    pub fn includes(&self, name: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(names) => names.iter().any(|n| n == name),
        }
    }
}

/// Options of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum rows each unit run dequeues.
    pub limit: Option<u64>,
}

impl RunOptions {
    /// Create options without a row cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap each unit run at `limit` rows.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// User-facing reporting surface.
pub trait Reporter {
    /// A unit is about to run over `total` rows; returns its progress sink.
    fn begin(&self, title: &str, total: u64) -> Box<dyn ProgressSink>;

    /// A unit's cursor was rewound.
    fn rewound(&self, title: &str);

    /// A unit run finished.
    fn finished(&self, title: &str, stats: &RunStats);
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn begin(&self, _title: &str, _total: u64) -> Box<dyn ProgressSink> {
        Box::new(NullSink)
    }

    fn rewound(&self, _title: &str) {}

    fn finished(&self, _title: &str, _stats: &RunStats) {}
}

/// Validated set of migration units.
pub struct Orchestrator {
    units: Vec<MigrationUnit>,
    index: HashMap<String, usize>,
}

impl Orchestrator {
    /// Validate the units and their dependency graph.
    pub fn new(units: Vec<MigrationUnit>) -> Result<Self> {
        let mut index = HashMap::with_capacity(units.len());
        for (i, unit) in units.iter().enumerate() {
            if index.insert(unit.name().to_string(), i).is_some() {
                return Err(Error::Config(format!(
                    "duplicate migration unit name: {}",
                    unit.name()
                )));
            }
        }

        for unit in &units {
            if let Some(missing) = unit.dependencies().iter().find(|dep| !index.contains_key(*dep)) {
                return Err(Error::UnknownUnit(missing.clone()));
            }
        }

        check_acyclic(&units)?;

        Ok(Self { units, index })
    }

    /// Unit names in declared order.
    pub fn names(&self) -> Vec<&str> {
        self.units.iter().map(MigrationUnit::name).collect()
    }

    /// Units in declared order.
    pub fn units(&self) -> &[MigrationUnit] {
        &self.units
    }

    /// Look up a unit by name.
    pub fn unit(&self, name: &str) -> Option<&MigrationUnit> {
        self.index.get(name).map(|&i| &self.units[i])
    }

    /// Indices of selected units in declared order.
    pub fn select(&self, selection: &Selection) -> Result<Vec<usize>> {
        if let Selection::Only(names) = selection {
            if let Some(unknown) = names.iter().find(|name| !self.index.contains_key(*name)) {
                return Err(Error::UnknownUnit(unknown.clone()));
            }
        }

        Ok(self
            .units
            .iter()
            .enumerate()
            .filter(|(_, unit)| selection.includes(unit.name()))
            .map(|(i, _)| i)
            .collect())
    }

    /// Rewind the cursors of selected units. Dependencies are left alone.
    pub fn reset(&mut self, selection: &Selection, reporter: &dyn Reporter) -> Result<Vec<String>> {
        let selected = self.select(selection)?;
        let mut rewound = Vec::with_capacity(selected.len());

        for i in selected {
            let unit = &self.units[i];
            reporter.rewound(&unit.title().replace("Migrate", "Rewind"));
            unit.cursor().rewind()?;
            info!(unit = %unit.name(), "cursor rewound");
            rewound.push(unit.name().to_string());
        }

        Ok(rewound)
    }

    /// Migrate selected units, each after its dependencies.
    ///
    /// A unit runs at most once per call, and only while it has rows left.
    pub fn run(&mut self, selection: &Selection, options: &RunOptions, reporter: &dyn Reporter) -> Result<Vec<UnitReport>> {
        let selected = self.select(selection)?;
        let mut migrated = HashSet::new();
        let mut reports = Vec::new();

        for i in selected {
            self.migrate(i, options, reporter, &mut migrated, &mut reports)?;
        }

        Ok(reports)
    }

    fn migrate(
        &mut self,
        i: usize,
        options: &RunOptions,
        reporter: &dyn Reporter,
        migrated: &mut HashSet<String>,
        reports: &mut Vec<UnitReport>,
    ) -> Result<()> {
        let dependencies: Vec<usize> = self.units[i]
            .dependencies()
            .iter()
            .filter_map(|dep| self.index.get(dep).copied())
            .collect();
        for dep in dependencies {
            self.migrate(dep, options, reporter, migrated, reports)?;
        }

        let unit = &mut self.units[i];
        if migrated.contains(unit.name()) {
            return Ok(());
        }
        if unit.left_count()? == 0 {
            debug!(unit = %unit.name(), "nothing left to migrate");
            return Ok(());
        }

        let title = unit.title();
        let mut sink = reporter.begin(&title, unit.total()?);
        let sink: &mut dyn ProgressSink = sink.as_mut();
        let stats = unit.run(options.limit, Some(sink))?;
        reporter.finished(&title, &stats);

        migrated.insert(unit.name().to_string());
        reports.push(UnitReport {
            name: unit.name().to_string(),
            title,
            stats,
        });
        Ok(())
    }

    /// Per-destination progress and consistency, without side effects.
    pub fn stat(&self, destination: &dyn Destination) -> Result<Vec<StatRow>> {
        let mut samples = Vec::with_capacity(self.units.len());

        for unit in &self.units {
            let (source_rows, progress) = if unit.cursor().is_disabled() {
                (unit.total()?, 0.0)
            } else {
                let skip = unit.skip_count()?;
                let source_rows = skip + unit.left_count()?;
                let progress = if source_rows == 0 {
                    0.0
                } else {
                    skip as f64 / source_rows as f64
                };
                (source_rows, progress)
            };

            samples.push(UnitSample {
                destination: unit.destination().to_string(),
                source_rows,
                progress,
            });
        }

        aggregate(&samples, destination)
    }
}

/// Reject dependency cycles by repeatedly removing units whose
/// dependencies are all resolved. Whatever is left is a cycle or depends
/// on one.
fn check_acyclic(units: &[MigrationUnit]) -> Result<()> {
    let mut resolved: HashSet<&str> = HashSet::with_capacity(units.len());
    let mut remaining: Vec<&MigrationUnit> = units.iter().collect();

    loop {
        let before = remaining.len();
        remaining.retain(|unit| {
            let ready = unit
                .dependencies()
                .iter()
                .all(|dep| resolved.contains(dep.as_str()));
            if ready {
                resolved.insert(unit.name());
            }
            !ready
        });
        if remaining.len() == before {
            break;
        }
    }

    if remaining.is_empty() {
        return Ok(());
    }

    let mut involved: Vec<String> = remaining.iter().map(|unit| unit.name().to_string()).collect();
    involved.sort();
    Err(Error::CyclicDependency { involved })
}
