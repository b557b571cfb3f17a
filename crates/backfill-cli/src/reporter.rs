//! Terminal reporting: progress bars and per-unit summaries.

use std::io::IsTerminal;
use std::time::Duration;

use backfill_core::progress::humanize_duration;
use backfill_core::{ProgressSink, Reporter, RunStats};
use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "{prefix} [{bar:40.cyan/blue}] {pos}/{len} | {msg}";

/// Reporter drawing indicatif bars on stderr and summaries on stdout.
///
/// With `quiet` set, summaries go to stderr so stdout stays reserved for
/// machine-readable output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalReporter {
    quiet: bool,
}

impl TerminalReporter {
    /// Create a reporter.
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn line(&self, text: &str) {
        if self.quiet {
            eprintln!("{}", text);
        } else {
            println!("{}", text);
        }
    }
}

/// Summary lines for a finished unit: outcome counts that are non-zero,
/// then the duration.
pub fn summary_lines(stats: &RunStats) -> Vec<String> {
    let mut lines = Vec::with_capacity(4);
    if stats.succeed > 0 {
        lines.push(format!("{} migrated", stats.succeed));
    }
    if stats.skipped > 0 {
        lines.push(format!("{} skipped", stats.skipped));
    }
    if stats.failed > 0 {
        lines.push(format!("{} failed", stats.failed));
    }
    lines.push(format!("In {}", humanize_duration(stats.duration)));
    lines
}

impl Reporter for TerminalReporter {
    fn begin(&self, title: &str, total: u64) -> Box<dyn ProgressSink> {
        Box::new(BarSink::new(title, total))
    }

    fn rewound(&self, title: &str) {
        self.line(title);
    }

    fn finished(&self, title: &str, stats: &RunStats) {
        self.line(title);
        for line in summary_lines(stats) {
            self.line(&format!("  {}", line));
        }
        self.line("");
    }
}

/// Progress sink backed by an indicatif bar, hidden when stderr is not a
/// terminal.
pub struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    fn new(title: &str, total: u64) -> Self {
        if !std::io::stderr().is_terminal() {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix(title.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

impl ProgressSink for BarSink {
    fn start(&mut self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn advance(&mut self, n: u64) {
        self.bar.inc(n);
    }

    fn hint(&mut self, text: &str) {
        self.bar.set_message(text.to_string());
    }

    fn finish(&mut self) {
        self.bar.finish_and_clear();
    }
}
