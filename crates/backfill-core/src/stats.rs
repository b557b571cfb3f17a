//! Run statistics and cross-unit consistency reporting.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// Outcome counters of one unit run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Rows whose migrate step produced a write.
    pub succeed: u64,
    /// Rows whose migrate step was a legitimate no-op.
    pub skipped: u64,
    /// Rows whose migrate step failed.
    pub failed: u64,
    /// Wall-clock duration of the run.
    #[serde(rename = "duration_seconds", serialize_with = "serialize_seconds")]
    pub duration: Duration,
}

impl RunStats {
    /// Rows dequeued by the run.
    pub fn processed(&self) -> u64 {
        self.succeed + self.skipped + self.failed
    }
}

fn serialize_seconds<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Stats of one unit within an orchestrated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    /// Unit name.
    pub name: String,
    /// Unit title.
    pub title: String,
    /// Counters of the run.
    #[serde(flatten)]
    pub stats: RunStats,
}

/// Per-unit inspect sample fed to [`aggregate`].
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSample {
    /// Destination the unit writes to.
    pub destination: String,
    /// Rows in the unit's source set.
    pub source_rows: u64,
    /// Fraction of the source set behind the cursor.
    pub progress: f64,
}

/// Aggregated inspect row for one destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatRow {
    /// Destination identifier.
    pub destination: String,
    /// Sum of source rows over units writing to the destination.
    pub source_rows: u64,
    /// Rows currently in the destination.
    pub target_rows: u64,
    /// Highest progress among units writing to the destination.
    pub progress: f64,
    /// `target_rows / source_rows`, absent when there are no source rows.
    pub consistency: Option<f64>,
}

/// Row counter for destinations.
pub trait Destination {
    /// Count the rows currently stored in `destination`.
    fn count_rows(&self, destination: &str) -> Result<u64>;
}

impl Destination for HashMap<String, u64> {
    fn count_rows(&self, destination: &str) -> Result<u64> {
        self.get(destination)
            .copied()
            .ok_or_else(|| Error::Query(format!("unknown destination {}", destination)))
    }
}

/// Aggregate per-unit samples by destination, sorted by destination.
///
/// Each destination is counted once. Consistency is computed from the
/// aggregated source sum, not averaged over units.
pub fn aggregate(samples: &[UnitSample], destination: &dyn Destination) -> Result<Vec<StatRow>> {
    let mut grouped: BTreeMap<&str, (u64, f64)> = BTreeMap::new();
    for sample in samples {
        let entry = grouped.entry(sample.destination.as_str()).or_insert((0, 0.0));
        entry.0 += sample.source_rows;
        entry.1 = entry.1.max(sample.progress);
    }

    grouped
        .into_iter()
        .map(|(name, (source_rows, progress))| {
            let target_rows = destination.count_rows(name)?;
            let consistency = if source_rows == 0 {
                None
            } else {
                Some(target_rows as f64 / source_rows as f64)
            };
            Ok(StatRow {
                destination: name.to_string(),
                source_rows,
                target_rows,
                progress,
                consistency,
            })
        })
        .collect()
}
