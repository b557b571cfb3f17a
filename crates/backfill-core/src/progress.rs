//! Progress reporting and throughput/ETA estimation.
//!
//! [`ProgressSink`] is the surface a run loop drives: it is started with the
//! unit's total, advanced past already-migrated rows, advanced once per
//! dequeued row and given a human-readable hint from time to time.
//!
//! [`Estimator`] produces those hints. It is scoped to a single run and
//! throttled by wall clock, so recomputation happens at most once per
//! configured interval regardless of how fast rows are processed.

use std::time::{Duration, Instant};

/// Receiver of progress updates for one unit run.
pub trait ProgressSink {
    /// Begin tracking a run over `total` rows.
    fn start(&mut self, total: u64);

    /// Move the position forward by `n` rows.
    fn advance(&mut self, n: u64);

    /// Replace the hint text shown alongside the position.
    fn hint(&mut self, text: &str);

    /// Mark the run as finished.
    fn finish(&mut self);
}

/// Sink that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn start(&mut self, _total: u64) {}
    fn advance(&mut self, _n: u64) {}
    fn hint(&mut self, _text: &str) {}
    fn finish(&mut self) {}
}

/// A computed progress summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressHint {
    /// Fraction of the total done, in `[0, 1]`.
    pub percentage: f64,
    /// Rows per second processed by this run, when measurable.
    pub throughput: Option<f64>,
    /// Estimated time remaining, when throughput is known and positive.
    pub eta: Option<Duration>,
    /// Compact display text, e.g. `42% | 1,204/sec | 3 minutes 20 seconds`.
    pub text: String,
}

impl ProgressHint {
    /// Compute a hint.
    ///
    /// `position` counts rows done including those skipped before the run
    /// started; `processed` counts only rows dequeued by this run, which is
    /// what throughput is measured on.
    pub fn compute(elapsed: Duration, position: u64, processed: u64, total: u64) -> Self {
        let percentage = if total == 0 {
            1.0
        } else {
            (position as f64 / total as f64).clamp(0.0, 1.0)
        };

        let secs = elapsed.as_secs_f64();
        let throughput = if elapsed < Duration::from_millis(1) || processed == 0 {
            None
        } else {
            Some(processed as f64 / secs)
        };

        let eta = throughput
            .filter(|speed| *speed > 0.0)
            .and_then(|speed| {
                let remaining = total.saturating_sub(position) as f64;
                Duration::try_from_secs_f64(remaining / speed).ok()
            });

        let percent = if total == 0 {
            100
        } else {
            (position.min(total) as u128 * 100 / total as u128) as u64
        };

        let mut parts = vec![format!("{}%", percent)];
        if let Some(speed) = throughput {
            parts.push(format!("{}/sec", format_count(speed.round() as u64)));
        }
        if let Some(eta) = eta {
            parts.push(humanize_duration(eta));
        }

        Self {
            percentage,
            throughput,
            eta,
            text: parts.join(" | "),
        }
    }
}

/// Rate-limited hint producer for one run.
#[derive(Debug, Clone)]
pub struct Estimator {
    started: Instant,
    interval: Duration,
    last_emit: Option<Instant>,
}

impl Estimator {
    /// Create an estimator whose run started at `started`.
    pub fn starting_at(started: Instant, interval: Duration) -> Self {
        Self {
            started,
            interval,
            last_emit: None,
        }
    }

    /// Produce a hint if at least one interval has passed since the last one.
    ///
    /// The first call always produces a hint.
    pub fn tick(&mut self, now: Instant, position: u64, processed: u64, total: u64) -> Option<ProgressHint> {
        if let Some(last) = self.last_emit {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }

        self.last_emit = Some(now);
        let elapsed = now.saturating_duration_since(self.started);
        Some(ProgressHint::compute(elapsed, position, processed, total))
    }
}

/// Format an integer with thousands separators: `1204` becomes `1,204`.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Render a duration using its two largest non-zero units.
///
/// `200s` renders as `3 minutes 20 seconds`, `90000s` as `1 day 1 hour`.
/// Sub-second durations render in milliseconds.
pub fn humanize_duration(duration: Duration) -> String {
    const UNITS: [(u64, &str); 4] = [(86_400, "day"), (3_600, "hour"), (60, "minute"), (1, "second")];

    let mut secs = duration.as_secs();
    if secs == 0 {
        let millis = duration.subsec_millis();
        return if millis == 0 {
            "0 seconds".to_string()
        } else {
            plural(millis as u64, "millisecond")
        };
    }

    let mut parts = Vec::new();
    for (size, unit) in UNITS {
        let n = secs / size;
        secs %= size;
        if n > 0 {
            parts.push(plural(n, unit));
        }
        if parts.len() == 2 {
            break;
        }
    }
    parts.join(" ")
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1204), "1,204");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn test_humanize_duration() {
        assert_eq!(humanize_duration(Duration::ZERO), "0 seconds");
        assert_eq!(humanize_duration(Duration::from_millis(250)), "250 milliseconds");
        assert_eq!(humanize_duration(Duration::from_secs(1)), "1 second");
        assert_eq!(humanize_duration(Duration::from_secs(200)), "3 minutes 20 seconds");
        assert_eq!(humanize_duration(Duration::from_secs(3_600)), "1 hour");
        assert_eq!(humanize_duration(Duration::from_secs(90_061)), "1 day 1 hour");
    }

    #[test]
    fn test_hint_text() {
        let hint = ProgressHint::compute(Duration::from_secs(10), 420, 400, 1000);
        assert_eq!(hint.percentage, 0.42);
        assert_eq!(hint.throughput, Some(40.0));
        assert_eq!(hint.eta, Some(Duration::from_millis(14_500)));
        assert_eq!(hint.text, "42% | 40/sec | 14 seconds");
    }

    #[test]
    fn test_hint_omits_undefined_terms() {
        let hint = ProgressHint::compute(Duration::ZERO, 0, 0, 10);
        assert_eq!(hint.throughput, None);
        assert_eq!(hint.eta, None);
        assert_eq!(hint.text, "0%");

        let hint = ProgressHint::compute(Duration::from_secs(5), 10, 0, 10);
        assert_eq!(hint.text, "100%");
    }

    #[test]
    fn test_empty_total_is_complete() {
        let hint = ProgressHint::compute(Duration::from_secs(1), 0, 0, 0);
        assert_eq!(hint.percentage, 1.0);
    }

    #[test]
    fn test_estimator_throttles() {
        let start = Instant::now();
        let mut estimator = Estimator::starting_at(start, Duration::from_secs(1));

        assert!(estimator.tick(start, 0, 0, 100).is_some());
        assert!(estimator.tick(start + Duration::from_millis(500), 5, 5, 100).is_none());
        assert!(estimator.tick(start + Duration::from_millis(999), 9, 9, 100).is_none());

        let hint = estimator
            .tick(start + Duration::from_secs(1), 10, 10, 100)
            .expect("interval elapsed");
        assert_eq!(hint.throughput, Some(10.0));
        assert_eq!(hint.eta, Some(Duration::from_secs(9)));

        assert!(estimator.tick(start + Duration::from_millis(1500), 15, 15, 100).is_none());
    }
}
